// FICHIER : src-core/src/morphing/types.rs

use crate::utils::prelude::*;

/// Nombre de morphs du modèle d'apparence.
pub const MORPH_COUNT: usize = 62;

/// Fraction de l'envergure native ajoutée de chaque côté pour obtenir la
/// plage étendue exploitable par la recherche.
pub const DEFAULT_EXTENSION_FRACTION: f32 = 0.5;

/// Vecteur complet des morphs (62 valeurs, ordre du moteur).
pub type ParameterVector = Vec<f32>;

/// Intervalle fermé [min, max] d'un morph.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MorphRange {
    pub min: f32,
    pub max: f32,
}

impl MorphRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    pub fn contains(&self, value: f32) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn clamp(&self, value: f32) -> f32 {
        if value.is_nan() {
            return self.min + self.span() * 0.5;
        }
        value.clamp(self.min, self.max)
    }

    /// Élargit l'intervalle de `fraction` × envergure de chaque côté.
    pub fn extended(&self, fraction: f32) -> Self {
        let margin = self.span() * fraction;
        Self::new(self.min - margin, self.max + margin)
    }

    /// Intersection de deux intervalles. Si elle est vide, on retombe sur le
    /// point de `other` le plus proche de `self` (intervalle dégénéré).
    pub fn intersect(&self, other: &MorphRange) -> Self {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        if min <= max {
            Self::new(min, max)
        } else {
            let pinned = other.clamp((self.min + self.max) * 0.5);
            Self::new(pinned, pinned)
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MorphDefinition {
    pub index: usize,
    pub name: String,
    pub range: MorphRange,
    pub default: f32,
}

/// Table statique des morphs : noms, plages natives et valeurs par défaut.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MorphTable {
    pub morphs: Vec<MorphDefinition>,
    pub extension_fraction: f32,
}

// (nom, signé) : les sliders signés vont de -1 à 1, les autres de 0 à 1.
const BUILTIN_MORPHS: [(&str, bool); MORPH_COUNT] = [
    // Visage 0-11
    ("face_width", false),
    ("face_depth", false),
    ("face_center_height", false),
    ("face_ratio", false),
    ("face_weight", false),
    ("face_sharpness", false),
    ("face_asymmetry", true),
    ("temple_width", false),
    ("cheekbone_height", false),
    ("cheekbone_width", false),
    ("cheekbone_depth", false),
    ("cheeks", false),
    // Front 12-14
    ("forehead_height", false),
    ("forehead_width", false),
    ("forehead_slope", false),
    // Mâchoire 15-19
    ("jaw_width", false),
    ("jaw_height", false),
    ("jaw_line", false),
    ("jaw_angle", true),
    ("jaw_curve", false),
    // Menton 20-23
    ("chin_forward", false),
    ("chin_width", false),
    ("chin_height", false),
    ("chin_shape", false),
    // Oreilles 24-26
    ("ear_size", false),
    ("ear_shape", false),
    ("ear_angle", true),
    // Yeux 27-37
    ("eye_position", false),
    ("eye_width", false),
    ("eye_height", false),
    ("eye_depth", false),
    ("eye_size", false),
    ("eye_outer_corner", true),
    ("eye_inner_corner", true),
    ("eye_to_eye_distance", false),
    ("eye_socket_size", false),
    ("eyelid_height", false),
    ("eye_shape", false),
    // Sourcils 38-42
    ("eyebrow_height", false),
    ("eyebrow_depth", false),
    ("eyebrow_curve", false),
    ("eyebrow_inner_height", true),
    ("eyebrow_outer_height", true),
    // Nez 43-51
    ("nose_length", false),
    ("nose_width", false),
    ("nose_bridge", false),
    ("nose_tip_height", false),
    ("nose_size", false),
    ("nostril_height", false),
    ("nostril_scale", false),
    ("nose_bump", false),
    ("nose_angle", true),
    // Bouche 52-59
    ("mouth_width", false),
    ("mouth_position", false),
    ("lips_frown", true),
    ("lip_thickness_upper", false),
    ("lip_thickness_lower", false),
    ("lips_forward", false),
    ("lip_shape_bottom", false),
    ("mouth_depth", false),
    // Détails fins 60-61
    ("face_definition", false),
    ("neck_slope", false),
];

impl Default for MorphTable {
    fn default() -> Self {
        let morphs = BUILTIN_MORPHS
            .iter()
            .enumerate()
            .map(|(index, &(name, signed))| {
                let (range, default) = if signed {
                    (MorphRange::new(-1.0, 1.0), 0.0)
                } else {
                    (MorphRange::new(0.0, 1.0), 0.5)
                };
                MorphDefinition {
                    index,
                    name: name.to_string(),
                    range,
                    default,
                }
            })
            .collect();

        Self {
            morphs,
            extension_fraction: DEFAULT_EXTENSION_FRACTION,
        }
    }
}

impl MorphTable {
    pub fn len(&self) -> usize {
        self.morphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.morphs.is_empty()
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.morphs.get(index).map(|m| m.name.as_str())
    }

    pub fn native_range(&self, index: usize) -> Option<MorphRange> {
        self.morphs.get(index).map(|m| m.range)
    }

    pub fn extended_range(&self, index: usize) -> Option<MorphRange> {
        self.native_range(index)
            .map(|r| r.extended(self.extension_fraction))
    }

    pub fn extended_ranges(&self) -> Vec<MorphRange> {
        self.morphs
            .iter()
            .map(|m| m.range.extended(self.extension_fraction))
            .collect()
    }

    /// Vecteur de départ « visage neutre ».
    pub fn defaults(&self) -> ParameterVector {
        self.morphs.iter().map(|m| m.default).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.morphs.is_empty() {
            return Err(AppError::config("table des morphs vide"));
        }
        if !(0.0..=4.0).contains(&self.extension_fraction) {
            return Err(AppError::config(format!(
                "fraction d'extension hors bornes : {}",
                self.extension_fraction
            )));
        }
        for (position, morph) in self.morphs.iter().enumerate() {
            if morph.index != position {
                return Err(AppError::config(format!(
                    "morph '{}' déclaré à l'index {} mais placé en position {}",
                    morph.name, morph.index, position
                )));
            }
            if !(morph.range.min < morph.range.max) {
                return Err(AppError::config(format!(
                    "plage native invalide pour '{}' : [{}, {}]",
                    morph.name, morph.range.min, morph.range.max
                )));
            }
            if !morph.range.contains(morph.default) {
                return Err(AppError::config(format!(
                    "valeur par défaut de '{}' hors plage native",
                    morph.name
                )));
            }
        }
        Ok(())
    }
}

/// Réinjecte les coordonnées locales (dimensions actives) dans une copie du
/// vecteur de base. Aucune transformation n'est appliquée aux valeurs.
pub fn build_full_morph_array(base: &[f32], active: &[usize], local: &[f32]) -> ParameterVector {
    let mut full = base.to_vec();
    for (&index, &value) in active.iter().zip(local.iter()) {
        if let Some(slot) = full.get_mut(index) {
            *slot = value;
        }
    }
    full
}

/// Extrait les coordonnées locales des dimensions actives.
pub fn extract_active(full: &[f32], active: &[usize]) -> Vec<f32> {
    active
        .iter()
        .map(|&index| full.get(index).copied().unwrap_or(0.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_shape() {
        let table = MorphTable::default();
        assert_eq!(table.len(), MORPH_COUNT);
        assert!(table.validate().is_ok());
        assert_eq!(table.name(0), Some("face_width"));
        assert_eq!(table.name(61), Some("neck_slope"));
        assert_eq!(table.native_range(6), Some(MorphRange::new(-1.0, 1.0)));
    }

    #[test]
    fn test_extended_range_adds_half_span() {
        let table = MorphTable::default();
        assert_eq!(table.extended_range(0), Some(MorphRange::new(-0.5, 1.5)));
        assert_eq!(table.extended_range(18), Some(MorphRange::new(-2.0, 2.0)));
        assert_eq!(table.extended_range(MORPH_COUNT), None);
    }

    #[test]
    fn test_intersect_disjoint_pins_value() {
        let a = MorphRange::new(3.0, 4.0);
        let b = MorphRange::new(0.0, 1.0);
        let r = a.intersect(&b);
        assert_eq!(r, MorphRange::new(1.0, 1.0));
    }

    #[test]
    fn test_clamp_nan_goes_to_center() {
        let r = MorphRange::new(0.0, 1.0);
        assert_eq!(r.clamp(f32::NAN), 0.5);
        assert_eq!(r.clamp(2.0), 1.0);
    }

    #[test]
    fn test_build_full_then_extract_roundtrip() {
        let base = MorphTable::default().defaults();
        let active = vec![43, 44, 45, 51];
        let local = vec![0.123_456_7, -0.75, 1.33, 0.0];

        let full = build_full_morph_array(&base, &active, &local);
        assert_eq!(extract_active(&full, &active), local);

        // Les index non actifs restent intacts
        assert_eq!(full[0], base[0]);
        assert_eq!(full[61], base[61]);
    }

    #[test]
    fn test_validate_rejects_bad_default() {
        let mut table = MorphTable::default();
        table.morphs[3].default = 7.0;
        assert!(table.validate().is_err());
    }
}
