// FICHIER : src-core/src/morphing/dto.rs

use chrono::{DateTime, Utc};

use crate::morphing::lock::MorphLock;
use crate::morphing::phases::{MainPhase, SubPhase};
use crate::morphing::scoring::HierarchicalScore;
use crate::morphing::types::ParameterVector;
use crate::utils::prelude::*;

// --- Progression ---

/// Photographie prise à la clôture d'une SubPhase.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct SubPhaseSnapshot {
    pub sub_phase: SubPhase,
    pub main_phase: MainPhase,
    pub best_score: f32,
    pub best_vector: Option<ParameterVector>,
    pub locked: bool,
    pub iterations: usize,
    pub locks: Vec<MorphLock>, // Table complète après clôture
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Toutes les SubPhases ont été parcourues.
    Completed,
    /// Plafond global d'évaluations atteint : meilleur vecteur connu.
    Aborted,
    /// L'évaluateur a échoué : meilleur vecteur connu.
    Failed,
}

// --- Sortie ---

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionReport {
    pub session_id: Uuid,
    pub evaluator: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: SessionOutcome,
    pub error: Option<String>,

    pub final_vector: ParameterVector,
    pub final_score: Option<HierarchicalScore>,
    pub sub_phases: Vec<SubPhaseSnapshot>,
    pub total_evaluations: usize,
}

impl SessionReport {
    pub fn total(&self) -> f32 {
        self.final_score.as_ref().map_or(0.0, |s| s.total)
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }

    pub fn locked_sub_phases(&self) -> usize {
        self.sub_phases.iter().filter(|s| s.locked).count()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_serializes_outcome_in_snake_case() {
        let now = Utc::now();
        let report = SessionReport {
            session_id: Uuid::new_v4(),
            evaluator: "synthetic".to_string(),
            started_at: now,
            finished_at: now,
            outcome: SessionOutcome::Aborted,
            error: None,
            final_vector: vec![0.5; 3],
            final_score: None,
            sub_phases: vec![SubPhaseSnapshot {
                sub_phase: SubPhase::Jaw,
                main_phase: MainPhase::Structure,
                best_score: 0.8,
                best_vector: None,
                locked: true,
                iterations: 12,
                locks: vec![],
            }],
            total_evaluations: 12,
        };

        let value: Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();
        assert_eq!(value["outcome"], json!("aborted"));
        assert_eq!(value["total_evaluations"], json!(12));
        assert_eq!(report.total(), 0.0);
        assert_eq!(report.locked_sub_phases(), 1);
        assert_eq!(report.duration_ms(), 0);
    }
}
