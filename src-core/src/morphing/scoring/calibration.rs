// FICHIER : src-core/src/morphing/scoring/calibration.rs

use crate::morphing::features::Feature;
use crate::morphing::phases::MainPhase;
use crate::utils::prelude::*;

pub const DEFAULT_EXPECTED_RANGE: f32 = 0.25;
pub const ANGLE_EXPECTED_RANGE: f32 = 0.30;
pub const WIDTH_EXPECTED_RANGE: f32 = 0.20;

/// Constantes de comparaison d'une mesure.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementCalibration {
    pub feature: Feature,
    /// Écart considéré comme « une unité » de différence.
    pub expected_range: f32,
    /// Biais systématique de la source de mesure, retiré de la cible.
    #[serde(default)]
    pub bias: f32,
}

/// Poids de chaque MainPhase dans le score total.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MainPhaseWeights {
    pub foundation: f32,
    pub structure: f32,
    pub major_features: f32,
    pub fine_details: f32,
}

impl Default for MainPhaseWeights {
    fn default() -> Self {
        Self {
            foundation: 0.35,
            structure: 0.25,
            major_features: 0.30,
            fine_details: 0.10,
        }
    }
}

impl MainPhaseWeights {
    pub fn weight(&self, phase: MainPhase) -> f32 {
        match phase {
            MainPhase::Foundation => self.foundation,
            MainPhase::Structure => self.structure,
            MainPhase::MajorFeatures => self.major_features,
            MainPhase::FineDetails => self.fine_details,
        }
    }

    pub fn sum(&self) -> f32 {
        MainPhase::ORDER.iter().map(|&p| self.weight(p)).sum()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateThreshold {
    pub low: f32,
    pub high: f32,
}

/// Seuils des portes souples : Foundation conditionne tout ce qui suit,
/// Structure conditionne MajorFeatures et FineDetails.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GateTable {
    pub foundation: GateThreshold,
    pub structure: GateThreshold,
    pub floor: f32,
}

impl Default for GateTable {
    fn default() -> Self {
        Self {
            foundation: GateThreshold { low: 0.35, high: 0.75 },
            structure: GateThreshold { low: 0.30, high: 0.70 },
            floor: 0.25,
        }
    }
}

/// Pénalité souple sur la teinte de peau.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SkinTonePolicy {
    pub enabled: bool,
    pub tolerance: f32,
    pub falloff: f32,
    pub minimum: f32,
}

impl Default for SkinTonePolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            tolerance: 0.05,
            falloff: 0.30,
            minimum: 0.70,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringCalibration {
    pub default_expected_range: f32,
    pub measurements: Vec<MeasurementCalibration>,
    pub weights: MainPhaseWeights,
    pub gates: GateTable,
    pub skin_tone: SkinTonePolicy,
}

impl Default for ScoringCalibration {
    fn default() -> Self {
        let mut measurements: Vec<MeasurementCalibration> = Feature::ALL
            .iter()
            .map(|&feature| MeasurementCalibration {
                feature,
                expected_range: default_expected_range(feature),
                bias: 0.0,
            })
            .collect();

        // Écarts constatés entre le détecteur et le rendu
        for (feature, bias) in [
            (Feature::ForeheadHeight, 0.04),
            (Feature::EyeOpenness, 0.03),
            (Feature::JawAngle, 0.02),
            (Feature::EyebrowArch, 0.02),
            (Feature::UpperLipThickness, -0.02),
        ] {
            if let Some(m) = measurements.iter_mut().find(|m| m.feature == feature) {
                m.bias = bias;
            }
        }

        Self {
            default_expected_range: DEFAULT_EXPECTED_RANGE,
            measurements,
            weights: MainPhaseWeights::default(),
            gates: GateTable::default(),
            skin_tone: SkinTonePolicy::default(),
        }
    }
}

fn default_expected_range(feature: Feature) -> f32 {
    use Feature::*;
    match feature {
        JawAngle | ChinPointedness | EyeTilt => ANGLE_EXPECTED_RANGE,
        UpperFaceWidth | MidFaceWidth | LowerFaceWidth | JawWidth | ChinWidth | CheekWidth
        | ForeheadWidth | NoseWidth | EyeWidth | MouthWidth => WIDTH_EXPECTED_RANGE,
        _ => DEFAULT_EXPECTED_RANGE,
    }
}

impl ScoringCalibration {
    /// Variante sans correction de biais : `score(a, a) == 1`.
    pub fn unbiased() -> Self {
        let mut calibration = Self::default();
        for m in &mut calibration.measurements {
            m.bias = 0.0;
        }
        calibration
    }

    pub fn expected_range(&self, feature: Feature) -> f32 {
        self.measurement(feature)
            .map(|m| m.expected_range)
            .unwrap_or(self.default_expected_range)
    }

    pub fn bias(&self, feature: Feature) -> f32 {
        self.measurement(feature).map(|m| m.bias).unwrap_or(0.0)
    }

    fn measurement(&self, feature: Feature) -> Option<&MeasurementCalibration> {
        self.measurements.iter().find(|m| m.feature == feature)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.default_expected_range > 0.0) {
            return Err(AppError::config("default_expected_range doit être > 0"));
        }
        for m in &self.measurements {
            if !(m.expected_range > 0.0) || !m.bias.is_finite() {
                return Err(AppError::config(format!(
                    "calibration invalide pour {:?} (range={}, bias={})",
                    m.feature, m.expected_range, m.bias
                )));
            }
        }

        let w = &self.weights;
        if MainPhase::ORDER.iter().any(|&p| !(w.weight(p) >= 0.0)) || w.sum() <= 0.0 {
            return Err(AppError::config("poids de MainPhase invalides"));
        }

        let g = &self.gates;
        for (name, t) in [("foundation", g.foundation), ("structure", g.structure)] {
            if !(t.low < t.high) || t.low < 0.0 || t.high > 1.0 {
                return Err(AppError::config(format!(
                    "porte {} invalide (low={}, high={})",
                    name, t.low, t.high
                )));
            }
        }
        if !(g.floor > 0.0 && g.floor <= 1.0) {
            return Err(AppError::config("le plancher des portes doit être dans ]0, 1]"));
        }

        let s = &self.skin_tone;
        if s.tolerance < 0.0 || s.falloff < 0.0 || !(0.0..=1.0).contains(&s.minimum) {
            return Err(AppError::config("politique de teinte de peau invalide"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let c = ScoringCalibration::default();
        assert!(c.validate().is_ok());
        assert_eq!(c.expected_range(Feature::JawAngle), ANGLE_EXPECTED_RANGE);
        assert_eq!(c.expected_range(Feature::NoseWidth), WIDTH_EXPECTED_RANGE);
        assert_eq!(c.expected_range(Feature::LipRatio), DEFAULT_EXPECTED_RANGE);
        assert!((c.weights.sum() - 1.0).abs() < 1e-6);
        assert!(c.bias(Feature::ForeheadHeight) > 0.0);
    }

    #[test]
    fn test_unbiased_clears_biases() {
        let c = ScoringCalibration::unbiased();
        assert!(Feature::ALL.iter().all(|&f| c.bias(f) == 0.0));
    }

    #[test]
    fn test_zero_floor_rejected() {
        let mut c = ScoringCalibration::default();
        c.gates.floor = 0.0;
        assert!(matches!(c.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_inverted_gate_rejected() {
        let mut c = ScoringCalibration::default();
        c.gates.structure = GateThreshold { low: 0.8, high: 0.2 };
        assert!(c.validate().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let c: ScoringCalibration =
            serde_json::from_str(r#"{"gates":{"foundation":{"low":0.2,"high":0.6},"structure":{"low":0.3,"high":0.7},"floor":0.4}}"#)
                .unwrap();
        assert_eq!(c.gates.floor, 0.4);
        assert_eq!(c.measurements.len(), Feature::ALL.len());
    }
}
