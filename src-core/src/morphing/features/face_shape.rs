// FICHIER : src-core/src/morphing/features/face_shape.rs

use crate::utils::prelude::*;

use super::set::{Feature, FeatureSet};

/// Archétypes de forme de visage. L'ordre de déclaration tranche les égalités.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceShape {
    Oval,
    Round,
    Square,
    Oblong,
    Heart,
    Diamond,
    Triangle,
}

impl std::fmt::Display for FaceShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(self, f)
    }
}

/// Mesures consultées par le classifieur, dans l'ordre des profils.
pub const SHAPE_FEATURES: [Feature; 5] = [
    Feature::FaceRatio,
    Feature::JawTaper,
    Feature::JawCurvature,
    Feature::ChinPointedness,
    Feature::CheekWidth,
];

/// Valeurs idéales (normalisées) et poids d'un archétype.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShapeProfile {
    pub shape: FaceShape,
    pub ideal: [f32; 5],
    pub weights: [f32; 5],
}

impl ShapeProfile {
    const fn new(shape: FaceShape, ideal: [f32; 5], weights: [f32; 5]) -> Self {
        Self {
            shape,
            ideal,
            weights,
        }
    }

    /// Σ w·(1 - |v - idéal|) / Σ w
    pub fn similarity(&self, features: &FeatureSet) -> f32 {
        let mut num = 0.0;
        let mut den = 0.0;
        for ((feature, ideal), weight) in SHAPE_FEATURES
            .iter()
            .zip(self.ideal.iter())
            .zip(self.weights.iter())
        {
            num += weight * (1.0 - (features.value(*feature) - ideal).abs());
            den += weight;
        }
        if den <= 0.0 {
            0.0
        } else {
            num / den
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceShapeMatch {
    pub shape: FaceShape,
    pub similarity: f32,
    pub scores: Vec<(FaceShape, f32)>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FaceShapeClassifier {
    profiles: Vec<ShapeProfile>,
}

impl Default for FaceShapeClassifier {
    fn default() -> Self {
        use FaceShape::*;
        Self {
            profiles: vec![
                ShapeProfile::new(Oval, [0.60, 0.50, 0.55, 0.50, 0.50], [1.0, 0.8, 0.8, 0.6, 0.6]),
                ShapeProfile::new(Round, [0.30, 0.70, 0.70, 0.30, 0.65], [1.2, 0.8, 1.0, 0.6, 0.6]),
                ShapeProfile::new(Square, [0.35, 0.75, 0.25, 0.25, 0.50], [0.8, 1.0, 1.2, 0.8, 0.4]),
                ShapeProfile::new(Oblong, [0.85, 0.55, 0.40, 0.45, 0.40], [1.4, 0.6, 0.6, 0.4, 0.6]),
                ShapeProfile::new(Heart, [0.55, 0.25, 0.50, 0.80, 0.60], [0.6, 1.2, 0.4, 1.0, 0.8]),
                ShapeProfile::new(Diamond, [0.60, 0.35, 0.50, 0.70, 0.80], [0.6, 0.8, 0.4, 0.8, 1.2]),
                ShapeProfile::new(Triangle, [0.45, 0.85, 0.40, 0.35, 0.30], [0.6, 1.2, 0.6, 0.6, 1.0]),
            ],
        }
    }
}

impl FaceShapeClassifier {
    pub fn with_profiles(profiles: Vec<ShapeProfile>) -> Self {
        Self { profiles }
    }

    /// Archétype de similarité maximale ; `None` si la table est vide.
    pub fn classify(&self, features: &FeatureSet) -> Option<FaceShapeMatch> {
        let scores: Vec<(FaceShape, f32)> = self
            .profiles
            .iter()
            .map(|p| (p.shape, p.similarity(features)))
            .collect();

        let mut best: Option<(FaceShape, f32)> = None;
        for &(shape, score) in &scores {
            // Inégalité stricte : le premier archétype l'emporte en cas d'égalité
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((shape, score));
            }
        }

        best.map(|(shape, similarity)| FaceShapeMatch {
            shape,
            similarity,
            scores,
        })
    }
}
