// FICHIER : src-core/src/morphing/features/set.rs

use crate::utils::prelude::*;

/// Mesures nommées dérivées des landmarks, toutes normalisées dans [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    // Proportions du visage
    UpperFaceWidth,
    MidFaceWidth,
    LowerFaceWidth,
    FaceRatio,
    UpperThird,
    MiddleThird,
    LowerThird,
    FaceTaper,
    // Mâchoire
    JawWidth,
    JawTaper,
    JawAngle,
    JawCurvature,
    JawHeight,
    // Menton
    ChinWidth,
    ChinHeight,
    ChinPointedness,
    // Joues
    CheekWidth,
    CheekboneHeight,
    CheekFullness,
    // Front
    ForeheadWidth,
    ForeheadHeight,
    // Nez
    NoseLength,
    NoseWidth,
    NoseTipWidth,
    NoseTipPosition,
    // Yeux
    EyeWidth,
    EyeOpenness,
    EyeDistance,
    EyeTilt,
    EyeVerticalPosition,
    EyeSize,
    // Bouche
    MouthWidth,
    UpperLipThickness,
    LowerLipThickness,
    MouthCornerTilt,
    MouthPosition,
    LipRatio,
    // Sourcils
    EyebrowHeight,
    EyebrowLength,
    EyebrowArch,
    EyebrowTilt,
    EyebrowGap,
    // Détails
    Symmetry,
}

pub const FEATURE_COUNT: usize = 43;

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::UpperFaceWidth,
        Feature::MidFaceWidth,
        Feature::LowerFaceWidth,
        Feature::FaceRatio,
        Feature::UpperThird,
        Feature::MiddleThird,
        Feature::LowerThird,
        Feature::FaceTaper,
        Feature::JawWidth,
        Feature::JawTaper,
        Feature::JawAngle,
        Feature::JawCurvature,
        Feature::JawHeight,
        Feature::ChinWidth,
        Feature::ChinHeight,
        Feature::ChinPointedness,
        Feature::CheekWidth,
        Feature::CheekboneHeight,
        Feature::CheekFullness,
        Feature::ForeheadWidth,
        Feature::ForeheadHeight,
        Feature::NoseLength,
        Feature::NoseWidth,
        Feature::NoseTipWidth,
        Feature::NoseTipPosition,
        Feature::EyeWidth,
        Feature::EyeOpenness,
        Feature::EyeDistance,
        Feature::EyeTilt,
        Feature::EyeVerticalPosition,
        Feature::EyeSize,
        Feature::MouthWidth,
        Feature::UpperLipThickness,
        Feature::LowerLipThickness,
        Feature::MouthCornerTilt,
        Feature::MouthPosition,
        Feature::LipRatio,
        Feature::EyebrowHeight,
        Feature::EyebrowLength,
        Feature::EyebrowArch,
        Feature::EyebrowTilt,
        Feature::EyebrowGap,
        Feature::Symmetry,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Ensemble de mesures d'un visage, immuable une fois produit.
///
/// Chaque valeur porte un poids de confiance : 0 signifie « mesure absente ».
/// L'ensemble par défaut (extraction impossible) est entièrement nul.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    values: Vec<f32>,
    confidence: Vec<f32>,
}

impl Default for FeatureSet {
    fn default() -> Self {
        Self {
            values: vec![0.0; FEATURE_COUNT],
            confidence: vec![0.0; FEATURE_COUNT],
        }
    }
}

impl FeatureSet {
    /// Construit un ensemble complet ; les valeurs sont ramenées dans [0, 1].
    pub fn from_values(values: &[f32]) -> Self {
        let mut set = Self::default();
        for (&feature, &value) in Feature::ALL.iter().zip(values.iter()) {
            set.set(feature, value, 1.0);
        }
        set
    }

    pub fn set(&mut self, feature: Feature, value: f32, confidence: f32) {
        let i = feature.index();
        if let (Some(v), Some(c)) = (self.values.get_mut(i), self.confidence.get_mut(i)) {
            *v = clamp_unit(value);
            *c = confidence.clamp(0.0, 1.0);
        }
    }

    pub fn value(&self, feature: Feature) -> f32 {
        self.values.get(feature.index()).copied().unwrap_or(0.0)
    }

    pub fn confidence(&self, feature: Feature) -> f32 {
        self.confidence.get(feature.index()).copied().unwrap_or(0.0)
    }

    /// (valeur, confiance) si la mesure est exploitable. Un ensemble de taille
    /// incohérente (désérialisé depuis une source externe) renvoie `None`
    /// au lieu de paniquer.
    pub fn measurement(&self, feature: Feature) -> Option<(f32, f32)> {
        let i = feature.index();
        let value = *self.values.get(i)?;
        let confidence = *self.confidence.get(i)?;
        if confidence > 0.0 && value.is_finite() {
            Some((clamp_unit(value), confidence))
        } else {
            None
        }
    }

    pub fn is_empty(&self) -> bool {
        Feature::ALL.iter().all(|&f| self.measurement(f).is_none())
    }

    pub fn is_well_formed(&self) -> bool {
        self.values.len() == FEATURE_COUNT && self.confidence.len() == FEATURE_COUNT
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    /// Vue nommée (ordre des mesures), utile pour l'affichage et les rapports.
    pub fn named(&self) -> Vec<(Feature, f32)> {
        Feature::ALL.iter().map(|&f| (f, self.value(f))).collect()
    }
}

fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
