// FICHIER : src-core/src/morphing/scoring/mod.rs

pub mod calibration;
pub mod gates;
pub mod hierarchical;

pub use calibration::{
    GateTable, GateThreshold, MainPhaseWeights, MeasurementCalibration, ScoringCalibration,
    SkinTonePolicy,
};
pub use gates::{match_falloff, smoothstep, soft_gate};
pub use hierarchical::{HierarchicalScore, HierarchicalScorer, NEUTRAL_SCORE};
