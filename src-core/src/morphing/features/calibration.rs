// FICHIER : src-core/src/morphing/features/calibration.rs

use crate::utils::prelude::*;

use super::set::{Feature, FEATURE_COUNT};

/// Normalisation linéaire d'une mesure brute : `clamp((raw - offset) * scale, 0, 1)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureNormalization {
    pub feature: Feature,
    pub offset: f32,
    pub scale: f32,
    /// Confiance attachée à la mesure (1.0 = observation directe).
    #[serde(default = "full_confidence")]
    pub confidence: f32,
}

fn full_confidence() -> f32 {
    1.0
}

impl FeatureNormalization {
    pub fn apply(&self, raw: f32) -> f32 {
        if !raw.is_finite() {
            return 0.0;
        }
        ((raw - self.offset) * self.scale).clamp(0.0, 1.0)
    }
}

/// Table de calibration des mesures.
///
/// Les constantes sont choisies pour que le visage canonique tombe au centre
/// de [0, 1] ; elles se recalibrent sans toucher à l'extraction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureCalibration {
    entries: Vec<FeatureNormalization>,
}

impl Default for FeatureCalibration {
    fn default() -> Self {
        let table: [(Feature, f32, f32, f32); FEATURE_COUNT] = [
            (Feature::UpperFaceWidth, 0.7355, 1.587, 1.0),
            (Feature::MidFaceWidth, 0.7123, 1.637, 1.0),
            (Feature::LowerFaceWidth, 0.5985, 1.949, 1.0),
            (Feature::FaceRatio, 0.6664, 1.751, 1.0),
            (Feature::UpperThird, 0.0879, 13.158, 1.0),
            (Feature::MiddleThird, 0.2603, 4.484, 1.0),
            (Feature::LowerThird, 0.3519, 3.322, 1.0),
            (Feature::FaceTaper, 0.5699, 2.049, 1.0),
            (Feature::JawWidth, 0.4588, 2.545, 1.0),
            (Feature::JawTaper, 0.3341, 3.497, 1.0),
            (Feature::JawAngle, 135.5629, 0.025, 1.0),
            (Feature::JawCurvature, 0.0356, 32.258, 1.0),
            (Feature::JawHeight, 0.2178, 5.348, 1.0),
            (Feature::ChinWidth, 0.172, 6.803, 1.0),
            (Feature::ChinHeight, 0.1806, 6.452, 1.0),
            (Feature::ChinPointedness, 15.3214, 0.017, 1.0),
            (Feature::CheekWidth, 0.6966, 1.675, 1.0),
            (Feature::CheekboneHeight, 0.1077, 10.753, 1.0),
            (Feature::CheekFullness, 0.6446, 1.812, 1.0),
            (Feature::ForeheadWidth, 0.5546, 2.101, 0.8),
            (Feature::ForeheadHeight, 0.0983, 11.905, 0.6),
            (Feature::NoseLength, 0.2603, 4.484, 1.0),
            (Feature::NoseWidth, 0.1359, 8.547, 1.0),
            (Feature::NoseTipWidth, 0.3649, 3.195, 1.0),
            (Feature::NoseTipPosition, 0.543, 2.5, 1.0),
            (Feature::EyeWidth, 0.1192, 9.804, 1.0),
            (Feature::EyeOpenness, 0.2187, 5.319, 1.0),
            (Feature::EyeDistance, 0.1787, 6.536, 1.0),
            (Feature::EyeTilt, -6.1491, 0.05, 1.0),
            (Feature::EyeVerticalPosition, 0.6063, 1.927, 1.0),
            (Feature::EyeSize, 0.0022, 125.0, 1.0),
            (Feature::MouthWidth, 0.2717, 4.292, 1.0),
            (Feature::UpperLipThickness, 0.0265, 45.455, 1.0),
            (Feature::LowerLipThickness, 0.0482, 24.39, 1.0),
            (Feature::MouthCornerTilt, -0.0445, 3.333, 1.0),
            (Feature::MouthPosition, 0.2166, 5.405, 1.0),
            (Feature::LipRatio, 0.1529, 2.5, 1.0),
            (Feature::EyebrowHeight, 0.0937, 12.346, 1.0),
            (Feature::EyebrowLength, 0.2201, 5.319, 1.0),
            (Feature::EyebrowArch, 0.0389, 30.303, 1.0),
            (Feature::EyebrowTilt, -0.0738, 8.333, 1.0),
            (Feature::EyebrowGap, 0.1155, 10.101, 1.0),
            (Feature::Symmetry, 0.85, 6.5, 1.0),
        ];
        Self {
            entries: table
                .iter()
                .map(|&(feature, offset, scale, confidence)| FeatureNormalization {
                    feature,
                    offset,
                    scale,
                    confidence,
                })
                .collect(),
        }
    }
}

impl FeatureCalibration {
    pub fn entry(&self, feature: Feature) -> Option<&FeatureNormalization> {
        self.entries.iter().find(|e| e.feature == feature)
    }

    /// Remplace (ou ajoute) l'entrée d'une mesure.
    pub fn set(&mut self, entry: FeatureNormalization) {
        match self.entries.iter_mut().find(|e| e.feature == entry.feature) {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }

    pub fn entries(&self) -> &[FeatureNormalization] {
        &self.entries
    }

    /// Vérifie que chaque mesure a une entrée finie, d'échelle non nulle.
    pub fn validate(&self) -> Result<()> {
        for feature in Feature::ALL {
            let entry = self
                .entry(feature)
                .ok_or_else(|| AppError::config(format!("normalisation manquante pour {:?}", feature)))?;
            if !entry.offset.is_finite() || !entry.scale.is_finite() || entry.scale == 0.0 {
                return Err(AppError::config(format!(
                    "normalisation invalide pour {:?} (offset={}, scale={})",
                    feature, entry.offset, entry.scale
                )));
            }
            if !(0.0..=1.0).contains(&entry.confidence) {
                return Err(AppError::config(format!(
                    "confiance hors de [0,1] pour {:?}",
                    feature
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_complete() {
        let table = FeatureCalibration::default();
        assert_eq!(table.entries().len(), FEATURE_COUNT);
        assert!(table.validate().is_ok());
        assert_eq!(table.entry(Feature::ForeheadHeight).map(|e| e.confidence), Some(0.6));
    }

    #[test]
    fn test_apply_clamps() {
        let n = FeatureNormalization {
            feature: Feature::NoseWidth,
            offset: 0.1,
            scale: 10.0,
            confidence: 1.0,
        };
        assert_eq!(n.apply(0.0), 0.0);
        assert!((n.apply(0.15) - 0.5).abs() < 1e-5);
        assert_eq!(n.apply(1.0), 1.0);
        assert_eq!(n.apply(f32::NAN), 0.0);
    }

    #[test]
    fn test_override_and_zero_scale_rejected() {
        let mut table = FeatureCalibration::default();
        table.set(FeatureNormalization {
            feature: Feature::EyeSize,
            offset: 0.0,
            scale: 0.0,
            confidence: 1.0,
        });
        assert!(matches!(table.validate(), Err(AppError::Config(_))));
    }
}
