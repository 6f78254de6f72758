// FICHIER : src-core/src/morphing/features/extractor.rs

use crate::utils::prelude::*;

use super::calibration::FeatureCalibration;
use super::landmarks::{
    LandmarkSet, BROWS, EYES, LEFT_EYE, MIDLINE_POINTS, MIRROR_PAIRS, RIGHT_EYE,
};
use super::set::{Feature, FeatureSet};

const DEGENERATE_EPSILON: f32 = 1e-6;

/// Convertit un tableau de landmarks en `FeatureSet` normalisé.
///
/// Fonction pure : aucune mutation, aucune erreur. Une entrée inexploitable
/// (trop courte, non finie, visage dégénéré) donne l'ensemble par défaut.
#[derive(Clone, Debug, Default)]
pub struct FeatureExtractor {
    calibration: FeatureCalibration,
}

impl FeatureExtractor {
    pub fn new(calibration: FeatureCalibration) -> Self {
        Self { calibration }
    }

    pub fn calibration(&self) -> &FeatureCalibration {
        &self.calibration
    }

    /// Extraction depuis le tableau plat `[x0, y0, x1, y1, ...]`.
    pub fn extract(&self, flat: &[f32]) -> FeatureSet {
        match LandmarkSet::from_flat(flat) {
            Some(landmarks) => self.extract_landmarks(&landmarks),
            None => {
                warn!(len = flat.len(), "Landmarks inexploitables, ensemble vide");
                FeatureSet::default()
            }
        }
    }

    pub fn extract_landmarks(&self, landmarks: &LandmarkSet) -> FeatureSet {
        let Some(raw) = raw_measurements(landmarks) else {
            warn!("Visage dégénéré (largeur ou hauteur nulle), ensemble vide");
            return FeatureSet::default();
        };

        let mut set = FeatureSet::default();
        for (feature, value) in raw {
            if let Some(norm) = self.calibration.entry(feature) {
                let confidence = if value.is_finite() { norm.confidence } else { 0.0 };
                set.set(feature, norm.apply(value), confidence);
            }
        }
        set
    }
}

/// Mesures brutes (ratios, angles en degrés) avant normalisation.
/// `None` si la largeur ou la hauteur du visage est nulle.
pub fn raw_measurements(landmarks: &LandmarkSet) -> Option<Vec<(Feature, f32)>> {
    let lm = landmarks.level_eyes();
    let d = |a: usize, b: usize| lm.distance(a, b);
    let y = |i: usize| lm.y(i);

    let brow_y = lm.mean_y(BROWS);
    let eye_y = lm.mean_y(EYES);
    let fw = d(0, 16);
    let fh = (y(8) - brow_y).abs();
    if fw < DEGENERATE_EPSILON || fh < DEGENERATE_EPSILON {
        return None;
    }

    let mut out = Vec::with_capacity(Feature::ALL.len());

    // Proportions
    out.push((Feature::UpperFaceWidth, d(0, 16) / fh));
    out.push((Feature::MidFaceWidth, d(2, 14) / fh));
    out.push((Feature::LowerFaceWidth, d(4, 12) / fh));
    out.push((Feature::FaceRatio, fh / fw));
    out.push((Feature::UpperThird, (y(27) - brow_y) / fh));
    out.push((Feature::MiddleThird, (y(33) - y(27)) / fh));
    out.push((Feature::LowerThird, (y(8) - y(33)) / fh));
    out.push((Feature::FaceTaper, d(4, 12) / fw));

    // Mâchoire
    out.push((Feature::JawWidth, d(5, 11) / fw));
    out.push((Feature::JawTaper, d(6, 10) / d(2, 14)));
    out.push((
        Feature::JawAngle,
        (lm.angle_at(2, 4, 6) + lm.angle_at(14, 12, 10)) / 2.0,
    ));
    let jaw_dev: f32 = [5, 6, 7]
        .iter()
        .map(|&p| lm.signed_distance_to_line(p, 4, 8).abs())
        .chain(
            [11, 10, 9]
                .iter()
                .map(|&p| lm.signed_distance_to_line(p, 12, 8).abs()),
        )
        .sum();
    out.push((Feature::JawCurvature, jaw_dev / 6.0 / fw));
    out.push((Feature::JawHeight, (y(8) - (y(4) + y(12)) / 2.0) / fh));

    // Menton
    out.push((Feature::ChinWidth, d(7, 9) / fw));
    out.push((Feature::ChinHeight, (y(8) - y(57)) / fh));
    out.push((Feature::ChinPointedness, 180.0 - lm.angle_at(6, 8, 10)));

    // Joues
    out.push((Feature::CheekWidth, d(1, 15) / fw));
    out.push((Feature::CheekboneHeight, ((y(1) + y(15)) / 2.0 - y(27)) / fh));
    out.push((Feature::CheekFullness, d(3, 13) / d(1, 15)));

    // Front (estimé : le détecteur ne voit pas la racine des cheveux)
    out.push((Feature::ForeheadWidth, d(17, 26) / fw));
    out.push((Feature::ForeheadHeight, ((y(0) + y(16)) / 2.0 - brow_y) / fh));

    // Nez
    out.push((Feature::NoseLength, d(27, 33) / fh));
    out.push((Feature::NoseWidth, d(31, 35) / fw));
    out.push((Feature::NoseTipWidth, d(32, 34) / d(31, 35)));
    out.push((Feature::NoseTipPosition, (y(30) - y(27)) / (y(33) - y(27))));

    // Yeux
    out.push((Feature::EyeWidth, (d(36, 39) + d(42, 45)) / 2.0 / fw));
    let open_l = ((d(37, 41) + d(38, 40)) / 2.0) / d(36, 39);
    let open_r = ((d(43, 47) + d(44, 46)) / 2.0) / d(42, 45);
    out.push((Feature::EyeOpenness, (open_l + open_r) / 2.0));
    out.push((Feature::EyeDistance, d(39, 42) / fw));
    let tilt = |outer: usize, inner: usize| {
        let (o, i) = (lm.point(outer), lm.point(inner));
        (i.y - o.y).atan2((i.x - o.x).abs()).to_degrees()
    };
    out.push((Feature::EyeTilt, (tilt(36, 39) + tilt(45, 42)) / 2.0));
    out.push((Feature::EyeVerticalPosition, (y(8) - eye_y) / fh));
    let eye_area = (lm.polygon_area(LEFT_EYE) + lm.polygon_area(RIGHT_EYE)) / 2.0;
    out.push((Feature::EyeSize, eye_area / (fw * fw)));

    // Bouche
    let upper_lip = d(51, 62) / fh;
    let lower_lip = d(66, 57) / fh;
    out.push((Feature::MouthWidth, d(48, 54) / fw));
    out.push((Feature::UpperLipThickness, upper_lip));
    out.push((Feature::LowerLipThickness, lower_lip));
    out.push((
        Feature::MouthCornerTilt,
        ((y(51) + y(57)) / 2.0 - (y(48) + y(54)) / 2.0) / d(48, 54),
    ));
    out.push((
        Feature::MouthPosition,
        ((y(62) + y(66)) / 2.0 - y(33)) / (y(8) - y(33)),
    ));
    out.push((Feature::LipRatio, upper_lip / (upper_lip + lower_lip)));

    // Sourcils
    out.push((Feature::EyebrowHeight, (eye_y - brow_y) / fh));
    out.push((Feature::EyebrowLength, (d(17, 21) + d(22, 26)) / 2.0 / fw));
    let arch = |points: [usize; 3], a: usize, b: usize| {
        points
            .iter()
            .map(|&p| -lm.signed_distance_to_line(p, a, b))
            .fold(0.0f32, f32::max)
    };
    out.push((
        Feature::EyebrowArch,
        (arch([18, 19, 20], 17, 21) + arch([23, 24, 25], 22, 26)) / 2.0 / fw,
    ));
    out.push((
        Feature::EyebrowTilt,
        ((y(21) - y(17)) + (y(22) - y(26))) / 2.0 / fh,
    ));
    out.push((Feature::EyebrowGap, d(21, 22) / fw));

    // Symétrie
    let mid_x = lm.centroid(MIDLINE_POINTS).x;
    let asymmetry: f32 = MIRROR_PAIRS
        .iter()
        .map(|&(l, r)| {
            let (pl, pr) = (lm.point(l), lm.point(r));
            ((mid_x - pl.x) - (pr.x - mid_x)).abs() + (pl.y - pr.y).abs()
        })
        .sum::<f32>()
        / MIRROR_PAIRS.len() as f32
        / fw;
    out.push((Feature::Symmetry, 1.0 - asymmetry));

    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphing::features::landmarks::{Point2, FLAT_LANDMARK_LEN};

    fn transformed(angle: f32, scale: f32, dx: f32, dy: f32) -> Vec<f32> {
        let face = LandmarkSet::canonical();
        let (sin, cos) = angle.sin_cos();
        let points: Vec<Point2> = face
            .points()
            .iter()
            .map(|p| {
                Point2::new(
                    (p.x * cos - p.y * sin) * scale + dx,
                    (p.x * sin + p.y * cos) * scale + dy,
                )
            })
            .collect();
        LandmarkSet::from_points(&points).unwrap().to_flat()
    }

    #[test]
    fn test_canonical_face_is_centered() {
        let set = FeatureExtractor::default().extract(&LandmarkSet::canonical().to_flat());
        for feature in Feature::ALL {
            let v = set.value(feature);
            if feature == Feature::Symmetry {
                assert!((v - 0.915).abs() < 0.02, "{:?} = {}", feature, v);
            } else {
                assert!((v - 0.5).abs() < 0.03, "{:?} = {}", feature, v);
            }
        }
        assert_eq!(set.confidence(Feature::ForeheadHeight), 0.6);
        assert_eq!(set.confidence(Feature::ForeheadWidth), 0.8);
        assert_eq!(set.confidence(Feature::NoseWidth), 1.0);
    }

    #[test]
    fn test_short_input_fails_soft() {
        let extractor = FeatureExtractor::default();
        assert_eq!(extractor.extract(&[]), FeatureSet::default());
        assert_eq!(
            extractor.extract(&vec![0.5; FLAT_LANDMARK_LEN - 2]),
            FeatureSet::default()
        );
    }

    #[test]
    fn test_degenerate_face_fails_soft() {
        let flat = vec![0.3; FLAT_LANDMARK_LEN];
        assert_eq!(FeatureExtractor::default().extract(&flat), FeatureSet::default());
    }

    #[test]
    fn test_similarity_invariance() {
        let extractor = FeatureExtractor::default();
        let reference = extractor.extract(&LandmarkSet::canonical().to_flat());
        let moved = extractor.extract(&transformed(0.2, 3.0, 120.0, -40.0));
        for feature in Feature::ALL {
            assert!(
                (reference.value(feature) - moved.value(feature)).abs() < 1e-2,
                "{:?}",
                feature
            );
        }
    }

    #[test]
    fn test_values_in_unit_interval() {
        let mut flat = LandmarkSet::canonical().to_flat();
        // Mâchoire très élargie
        for i in 0..=16 {
            flat[i * 2] = (flat[i * 2] - 0.5) * 1.8 + 0.5;
        }
        let set = FeatureExtractor::default().extract(&flat);
        assert!(set.values().iter().all(|v| (0.0..=1.0).contains(v)));
        assert!(set.value(Feature::FaceRatio) < 0.5);
    }
}
