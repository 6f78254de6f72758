// FICHIER : src-core/src/morphing/evaluators/mod.rs

pub mod synthetic;

pub use synthetic::SyntheticEvaluator;
