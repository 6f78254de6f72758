// FICHIER : src-core/src/morphing/features/mod.rs

//! Extraction des mesures faciales : landmarks 68 points → `FeatureSet` dans [0, 1].

pub mod calibration;
pub mod extractor;
pub mod face_shape;
pub mod landmarks;
pub mod set;

pub use calibration::{FeatureCalibration, FeatureNormalization};
pub use extractor::FeatureExtractor;
pub use face_shape::{FaceShape, FaceShapeClassifier, FaceShapeMatch};
pub use landmarks::{LandmarkSet, Point2, CANONICAL_FACE, FLAT_LANDMARK_LEN, LANDMARK_COUNT};
pub use set::{Feature, FeatureSet, FEATURE_COUNT};
