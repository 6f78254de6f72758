// FICHIER : src-core/src/morphing/mod.rs

//! Moteur d'optimisation hiérarchique des morphs.
//!
//! Ordre des dépendances : `features` → `scoring` → `lock` → `controller`
//! → `optimizers`, orchestrés par `session`.

pub mod config;
pub mod controller;
pub mod dto;
pub mod evaluators;
pub mod features;
pub mod groups;
pub mod lock;
pub mod optimizers;
pub mod phases;
pub mod scoring;
pub mod session;
pub mod traits;
pub mod types;

pub use config::EngineConfig;
pub use controller::{ControllerDecision, HierarchicalPhaseController, PhaseEvent, PhaseSchedule};
pub use dto::{SessionOutcome, SessionReport, SubPhaseSnapshot};
pub use evaluators::SyntheticEvaluator;
pub use features::{FeatureExtractor, FeatureSet};
pub use groups::MorphGroups;
pub use lock::{LockPolicy, MorphLockManager};
pub use optimizers::{CmaEsOptimizer, CmaEsSettings};
pub use phases::{MainPhase, OptPhase, SubPhase};
pub use scoring::{HierarchicalScore, HierarchicalScorer};
pub use session::{run_batch, BatchJob, OptimizationSession, SessionSettings};
pub use traits::{Evaluation, MorphEvaluator};
pub use types::{MorphTable, ParameterVector, MORPH_COUNT};
