// FICHIER : src-core/src/morphing/optimizers/mod.rs

pub mod cma_es;

pub use cma_es::{CmaEsOptimizer, CmaEsSettings, FitnessOutcome};
