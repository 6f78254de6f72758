// FICHIER : src-core/src/morphing/features/landmarks.rs

/// Nombre de points du détecteur (disposition iBUG 68 points).
pub const LANDMARK_COUNT: usize = 68;
/// Longueur du tableau plat attendu : [x0, y0, x1, y1, ...].
pub const FLAT_LANDMARK_LEN: usize = LANDMARK_COUNT * 2;

// Régions de la disposition 68 points
pub const JAW: std::ops::RangeInclusive<usize> = 0..=16;
pub const BROWS: std::ops::RangeInclusive<usize> = 17..=26;
pub const NOSE: std::ops::RangeInclusive<usize> = 27..=35;
pub const LEFT_EYE: std::ops::RangeInclusive<usize> = 36..=41;
pub const RIGHT_EYE: std::ops::RangeInclusive<usize> = 42..=47;
pub const EYES: std::ops::RangeInclusive<usize> = 36..=47;
pub const MOUTH: std::ops::RangeInclusive<usize> = 48..=67;

/// Paires symétriques (gauche, droite) utilisées pour la mesure de symétrie.
pub const MIRROR_PAIRS: [(usize, usize); 26] = [
    (0, 16), (1, 15), (2, 14), (3, 13), (4, 12), (5, 11), (6, 10), (7, 9),
    (17, 26), (18, 25), (19, 24), (20, 23), (21, 22),
    (36, 45), (37, 44), (38, 43), (39, 42), (40, 47), (41, 46),
    (31, 35), (32, 34),
    (48, 54), (49, 53), (50, 52), (59, 55), (58, 56),
];

/// Points servant à estimer la ligne médiane du visage.
pub const MIDLINE_POINTS: [usize; 6] = [27, 30, 33, 51, 57, 8];

#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct Point2 {
    pub x: f32,
    pub y: f32,
}

impl Point2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point2) -> f32 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Visage canonique (forme moyenne 68 points, coordonnées unitaires, y vers le bas).
pub const CANONICAL_FACE: [[f32; 2]; LANDMARK_COUNT] = [
    [0.0792, 0.3392], [0.0829, 0.4570],
    [0.0968, 0.5756], [0.1221, 0.6919],
    [0.1687, 0.8003], [0.2398, 0.8957],
    [0.3257, 0.9771], [0.4223, 1.0433],
    [0.5318, 1.0608], [0.6413, 1.0398],
    [0.7381, 0.9723], [0.8244, 0.8896],
    [0.8948, 0.7925], [0.9394, 0.6815],
    [0.9611, 0.5622], [0.9706, 0.4418],
    [0.9712, 0.3221], [0.1638, 0.2492],
    [0.2178, 0.2043], [0.2913, 0.1924],
    [0.3675, 0.2036], [0.4393, 0.2331],
    [0.5864, 0.2281], [0.6602, 0.1959],
    [0.7375, 0.1824], [0.8132, 0.1928],
    [0.8708, 0.2353], [0.5153, 0.3186],
    [0.5162, 0.3962], [0.5171, 0.4738],
    [0.5182, 0.5532], [0.4337, 0.6041],
    [0.4755, 0.6208], [0.5207, 0.6343],
    [0.5659, 0.6188], [0.6071, 0.6016],
    [0.2524, 0.3311], [0.2987, 0.3026],
    [0.3557, 0.3030], [0.4037, 0.3387],
    [0.3525, 0.3500], [0.2968, 0.3505],
    [0.6313, 0.3341], [0.6791, 0.2965],
    [0.7360, 0.2947], [0.7829, 0.3213],
    [0.7403, 0.3418], [0.6850, 0.3437],
    [0.3532, 0.7462], [0.4146, 0.7191],
    [0.4777, 0.7068], [0.5227, 0.7171],
    [0.5698, 0.7054], [0.6352, 0.7157],
    [0.6995, 0.7394], [0.6394, 0.8052],
    [0.5764, 0.8354], [0.5254, 0.8417],
    [0.4764, 0.8375], [0.4138, 0.8100],
    [0.3801, 0.7500], [0.4780, 0.7451],
    [0.5234, 0.7489], [0.5711, 0.7433],
    [0.6724, 0.7442], [0.5725, 0.7766],
    [0.5240, 0.7834], [0.4776, 0.7785],];

/// Jeu de 68 landmarks validé.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkSet {
    points: Vec<Point2>,
}

impl LandmarkSet {
    /// Construit depuis un tableau plat. `None` si le tableau est trop court ou
    /// contient des valeurs non finies.
    pub fn from_flat(flat: &[f32]) -> Option<Self> {
        if flat.len() < FLAT_LANDMARK_LEN {
            return None;
        }
        let points: Vec<Point2> = flat[..FLAT_LANDMARK_LEN]
            .chunks_exact(2)
            .map(|xy| Point2::new(xy[0], xy[1]))
            .collect();
        if points.iter().any(|p| !p.x.is_finite() || !p.y.is_finite()) {
            return None;
        }
        Some(Self { points })
    }

    pub fn from_points(points: &[Point2]) -> Option<Self> {
        if points.len() < LANDMARK_COUNT {
            return None;
        }
        Some(Self {
            points: points[..LANDMARK_COUNT].to_vec(),
        })
    }

    pub fn canonical() -> Self {
        Self {
            points: CANONICAL_FACE
                .iter()
                .map(|&[x, y]| Point2::new(x, y))
                .collect(),
        }
    }

    pub fn to_flat(&self) -> Vec<f32> {
        self.points.iter().flat_map(|p| [p.x, p.y]).collect()
    }

    pub fn points(&self) -> &[Point2] {
        &self.points
    }

    pub fn points_mut(&mut self) -> &mut [Point2] {
        &mut self.points
    }

    pub fn point(&self, index: usize) -> Point2 {
        self.points.get(index).copied().unwrap_or_default()
    }

    pub fn y(&self, index: usize) -> f32 {
        self.point(index).y
    }

    pub fn distance(&self, a: usize, b: usize) -> f32 {
        self.point(a).distance(&self.point(b))
    }

    pub fn centroid(&self, indices: impl IntoIterator<Item = usize>) -> Point2 {
        let mut sum = Point2::default();
        let mut count = 0usize;
        for i in indices {
            let p = self.point(i);
            sum.x += p.x;
            sum.y += p.y;
            count += 1;
        }
        if count == 0 {
            return sum;
        }
        Point2::new(sum.x / count as f32, sum.y / count as f32)
    }

    pub fn mean_y(&self, indices: impl IntoIterator<Item = usize>) -> f32 {
        self.centroid(indices).y
    }

    /// Angle (degrés) au sommet `b` formé par `a-b-c`. 0 si dégénéré.
    pub fn angle_at(&self, a: usize, b: usize, c: usize) -> f32 {
        let (pa, pb, pc) = (self.point(a), self.point(b), self.point(c));
        let (ax, ay) = (pa.x - pb.x, pa.y - pb.y);
        let (cx, cy) = (pc.x - pb.x, pc.y - pb.y);
        let norm = ax.hypot(ay) * cx.hypot(cy);
        if norm < 1e-6 {
            return 0.0;
        }
        ((ax * cx + ay * cy) / norm).clamp(-1.0, 1.0).acos().to_degrees()
    }

    /// Distance signée du point `p` à la droite `a -> b` (négative au-dessus
    /// pour une corde orientée de gauche à droite, y vers le bas).
    pub fn signed_distance_to_line(&self, p: usize, a: usize, b: usize) -> f32 {
        let (pp, pa, pb) = (self.point(p), self.point(a), self.point(b));
        let (dx, dy) = (pb.x - pa.x, pb.y - pa.y);
        let len = dx.hypot(dy);
        if len < 1e-6 {
            return 0.0;
        }
        (dx * (pp.y - pa.y) - dy * (pp.x - pa.x)) / len
    }

    /// Aire du polygone (formule du lacet).
    pub fn polygon_area(&self, indices: std::ops::RangeInclusive<usize>) -> f32 {
        let pts: Vec<Point2> = indices.map(|i| self.point(i)).collect();
        if pts.len() < 3 {
            return 0.0;
        }
        let twice: f32 = pts
            .iter()
            .zip(pts.iter().cycle().skip(1))
            .map(|(p, q)| p.x * q.y - q.x * p.y)
            .sum();
        twice.abs() * 0.5
    }

    /// Remet la ligne des yeux à l'horizontale (rotation autour du milieu des
    /// yeux). Les mesures deviennent indépendantes du roulis de la tête.
    pub fn level_eyes(&self) -> Self {
        let left = self.centroid(LEFT_EYE);
        let right = self.centroid(RIGHT_EYE);
        let angle = (right.y - left.y).atan2(right.x - left.x);
        if angle.abs() < 1e-6 {
            return self.clone();
        }
        let mid = Point2::new((left.x + right.x) * 0.5, (left.y + right.y) * 0.5);
        let (sin, cos) = (-angle).sin_cos();
        let points = self
            .points
            .iter()
            .map(|p| {
                let (dx, dy) = (p.x - mid.x, p.y - mid.y);
                Point2::new(mid.x + dx * cos - dy * sin, mid.y + dx * sin + dy * cos)
            })
            .collect();
        Self { points }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flat_rejects_short_input() {
        assert!(LandmarkSet::from_flat(&[0.0; FLAT_LANDMARK_LEN - 1]).is_none());
        assert!(LandmarkSet::from_flat(&[]).is_none());
    }

    #[test]
    fn test_from_flat_rejects_non_finite() {
        let mut flat = LandmarkSet::canonical().to_flat();
        flat[10] = f32::INFINITY;
        assert!(LandmarkSet::from_flat(&flat).is_none());
    }

    #[test]
    fn test_flat_roundtrip_ignores_trailing_values() {
        let mut flat = LandmarkSet::canonical().to_flat();
        flat.extend_from_slice(&[9.0, 9.0]);
        let set = LandmarkSet::from_flat(&flat).unwrap();
        assert_eq!(set.points().len(), LANDMARK_COUNT);
        assert_eq!(set, LandmarkSet::canonical());
    }

    #[test]
    fn test_level_eyes_removes_roll() {
        let face = LandmarkSet::canonical();
        let mid = face.centroid(EYES);
        let (sin, cos) = 0.3f32.sin_cos();
        let mut rolled = face.clone();
        for p in rolled.points_mut() {
            let (dx, dy) = (p.x - mid.x, p.y - mid.y);
            *p = Point2::new(mid.x + dx * cos - dy * sin, mid.y + dx * sin + dy * cos);
        }

        let leveled = rolled.level_eyes();
        let left = leveled.centroid(LEFT_EYE);
        let right = leveled.centroid(RIGHT_EYE);
        assert!((left.y - right.y).abs() < 1e-4);
        // Les distances sont conservées par la rotation
        assert!((leveled.distance(0, 16) - face.distance(0, 16)).abs() < 1e-4);
    }

    #[test]
    fn test_geometry_helpers() {
        let face = LandmarkSet::canonical();
        let chin_angle = face.angle_at(6, 8, 10);
        assert!(chin_angle > 100.0 && chin_angle < 160.0);
        assert!(face.polygon_area(LEFT_EYE) > 0.0);
        // Le sommet du sourcil est au-dessus de sa corde
        assert!(face.signed_distance_to_line(19, 17, 21) < 0.0);
    }
}
