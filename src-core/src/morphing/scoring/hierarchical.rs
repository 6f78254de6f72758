// FICHIER : src-core/src/morphing/scoring/hierarchical.rs

use std::collections::BTreeMap;

use crate::morphing::features::{Feature, FeatureSet};
use crate::morphing::groups::MorphGroups;
use crate::morphing::phases::{MainPhase, SubPhase};
use crate::utils::prelude::*;

use super::calibration::ScoringCalibration;
use super::gates::{linear_penalty, match_falloff, soft_gate};

/// Score neutre d'un groupe sans aucune mesure exploitable.
pub const NEUTRAL_SCORE: f32 = 0.5;

/// Résultat complet d'une évaluation. Recalculé à chaque appel, jamais persisté.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HierarchicalScore {
    pub sub_phases: BTreeMap<SubPhase, f32>,
    pub main_phases: BTreeMap<MainPhase, f32>,
    pub foundation_gate: f32,
    pub structure_gate: f32,
    pub skin_tone_multiplier: Option<f32>,
    pub total: f32,
}

impl HierarchicalScore {
    pub fn sub_phase(&self, sub_phase: SubPhase) -> f32 {
        self.sub_phases
            .get(&sub_phase)
            .copied()
            .unwrap_or(NEUTRAL_SCORE)
    }

    pub fn main_phase(&self, main_phase: MainPhase) -> f32 {
        self.main_phases
            .get(&main_phase)
            .copied()
            .unwrap_or(NEUTRAL_SCORE)
    }
}

/// Compare deux `FeatureSet` (cible, courant) groupe par groupe.
///
/// Pur : dépend uniquement de ses entrées et des tables injectées.
#[derive(Clone, Debug)]
pub struct HierarchicalScorer {
    measurements: BTreeMap<SubPhase, Vec<Feature>>,
    calibration: ScoringCalibration,
}

impl HierarchicalScorer {
    pub fn new(groups: &MorphGroups, calibration: ScoringCalibration) -> Self {
        let measurements = SubPhase::ALL
            .iter()
            .map(|&s| (s, groups.measurements(s).to_vec()))
            .collect();
        Self {
            measurements,
            calibration,
        }
    }

    pub fn calibration(&self) -> &ScoringCalibration {
        &self.calibration
    }

    pub fn score(&self, target: &FeatureSet, current: &FeatureSet) -> HierarchicalScore {
        self.score_with_skin_tone(target, current, None)
    }

    /// `skin_tone` : (teinte cible, teinte courante), si les deux sont connues.
    pub fn score_with_skin_tone(
        &self,
        target: &FeatureSet,
        current: &FeatureSet,
        skin_tone: Option<(f32, f32)>,
    ) -> HierarchicalScore {
        let sub_phases: BTreeMap<SubPhase, f32> = SubPhase::ALL
            .iter()
            .map(|&s| (s, self.sub_phase_score(s, target, current)))
            .collect();

        let main_phases: BTreeMap<MainPhase, f32> = MainPhase::ORDER
            .iter()
            .map(|&m| {
                let scores: Vec<f32> = m
                    .sub_phases()
                    .iter()
                    .map(|s| sub_phases.get(s).copied().unwrap_or(NEUTRAL_SCORE))
                    .collect();
                (m, mean_min_blend(&scores))
            })
            .collect();

        let main = |m: MainPhase| main_phases.get(&m).copied().unwrap_or(NEUTRAL_SCORE);
        let gates = &self.calibration.gates;
        let foundation_gate = soft_gate(
            main(MainPhase::Foundation),
            gates.foundation.low,
            gates.foundation.high,
            gates.floor,
        );
        let structure_gate = soft_gate(
            main(MainPhase::Structure),
            gates.structure.low,
            gates.structure.high,
            gates.floor,
        );

        let weights = &self.calibration.weights;
        let weighted = main(MainPhase::Foundation) * weights.foundation
            + main(MainPhase::Structure) * weights.structure * foundation_gate
            + main(MainPhase::MajorFeatures)
                * weights.major_features
                * foundation_gate
                * structure_gate
            + main(MainPhase::FineDetails) * weights.fine_details * foundation_gate * structure_gate;
        let weight_sum = weights.sum();
        let mut total = if weight_sum > 0.0 {
            weighted / weight_sum
        } else {
            0.0
        };

        let skin_tone_multiplier = self.skin_tone_multiplier(skin_tone);
        if let Some(multiplier) = skin_tone_multiplier {
            total *= multiplier;
        }

        HierarchicalScore {
            sub_phases,
            main_phases,
            foundation_gate,
            structure_gate,
            skin_tone_multiplier,
            total: if total.is_finite() { total.clamp(0.0, 1.0) } else { 0.0 },
        }
    }

    /// Score d'un seul groupe : `0.5·moyenne pondérée + 0.5·minimum`.
    pub fn sub_phase_score(&self, sub_phase: SubPhase, target: &FeatureSet, current: &FeatureSet) -> f32 {
        let Some(features) = self.measurements.get(&sub_phase) else {
            return NEUTRAL_SCORE;
        };

        let mut weighted_sum = 0.0;
        let mut weight_total = 0.0;
        let mut worst = 1.0f32;
        let mut count = 0usize;

        for &feature in features {
            let (Some((t, t_conf)), Some((c, c_conf))) =
                (target.measurement(feature), current.measurement(feature))
            else {
                continue;
            };
            let t = (t - self.calibration.bias(feature)).clamp(0.0, 1.0);
            let normalized = (t - c).abs() / self.calibration.expected_range(feature);
            let m = match_falloff(normalized);
            let w = t_conf * c_conf;

            weighted_sum += m * w;
            weight_total += w;
            worst = worst.min(m);
            count += 1;
        }

        if count == 0 || weight_total <= 0.0 {
            return NEUTRAL_SCORE;
        }
        0.5 * (weighted_sum / weight_total) + 0.5 * worst
    }

    fn skin_tone_multiplier(&self, skin_tone: Option<(f32, f32)>) -> Option<f32> {
        let policy = &self.calibration.skin_tone;
        if !policy.enabled {
            return None;
        }
        let (target, current) = skin_tone?;
        Some(linear_penalty(
            target - current,
            policy.tolerance,
            policy.falloff,
            policy.minimum,
        ))
    }
}

/// `0.5·moyenne + 0.5·minimum` ; neutre si vide.
fn mean_min_blend(scores: &[f32]) -> f32 {
    if scores.is_empty() {
        return NEUTRAL_SCORE;
    }
    let mean = scores.iter().sum::<f32>() / scores.len() as f32;
    let min = scores.iter().copied().fold(f32::INFINITY, f32::min);
    0.5 * mean + 0.5 * min
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphing::features::FEATURE_COUNT;

    fn scorer() -> HierarchicalScorer {
        HierarchicalScorer::new(&MorphGroups::default(), ScoringCalibration::unbiased())
    }

    fn neutral() -> FeatureSet {
        FeatureSet::from_values(&[0.5; FEATURE_COUNT])
    }

    fn shifted(features: &[Feature], delta: f32) -> FeatureSet {
        let mut set = neutral();
        for &f in features {
            set.set(f, 0.5 + delta, 1.0);
        }
        set
    }

    #[test]
    fn test_identity_scores_one() {
        let score = scorer().score(&neutral(), &neutral());
        assert!((score.total - 1.0).abs() < 1e-6);
        assert!(score.sub_phases.values().all(|&s| (s - 1.0).abs() < 1e-6));
        assert_eq!(score.foundation_gate, 1.0);
        assert_eq!(score.skin_tone_multiplier, None);
    }

    #[test]
    fn test_bias_correction_applies_to_target() {
        let biased = HierarchicalScorer::new(&MorphGroups::default(), ScoringCalibration::default());
        let score = biased.score(&neutral(), &neutral());
        assert!(score.sub_phase(SubPhase::Forehead) < 1.0);
        assert_eq!(score.sub_phase(SubPhase::Nose), 1.0);
    }

    #[test]
    fn test_empty_sets_are_neutral() {
        let score = scorer().score(&FeatureSet::default(), &neutral());
        assert!(score.sub_phases.values().all(|&s| s == NEUTRAL_SCORE));
        assert!(score.total > 0.0 && score.total < 1.0);
    }

    #[test]
    fn test_min_term_exposes_single_bad_measurement() {
        let s = scorer();
        let one_bad = shifted(&[Feature::NoseWidth], 0.4);
        let score = s.sub_phase_score(SubPhase::Nose, &neutral(), &one_bad);
        // Moyenne 0.75, minimum 0 → 0.375
        assert!((score - 0.375).abs() < 1e-5);
    }

    #[test]
    fn test_zero_confidence_measurements_are_skipped() {
        let s = scorer();
        let mut current = shifted(&[Feature::NoseWidth], 0.4);
        current.set(Feature::NoseWidth, 0.9, 0.0);
        assert_eq!(s.sub_phase_score(SubPhase::Nose, &neutral(), &current), 1.0);
    }

    #[test]
    fn test_wrong_foundation_gates_details() {
        let s = scorer();
        let foundation: Vec<Feature> = [SubPhase::FaceWidth, SubPhase::FaceHeight, SubPhase::FaceShape]
            .iter()
            .flat_map(|&p| MorphGroups::default().measurements(p).to_vec())
            .collect();
        let eyes = MorphGroups::default().measurements(SubPhase::Eyes).to_vec();

        let wrong_shape = s.score(&neutral(), &shifted(&foundation, 0.45));
        let wrong_eyes = s.score(&neutral(), &shifted(&eyes, 0.45));

        assert!(wrong_shape.total < wrong_eyes.total);
        assert_eq!(wrong_shape.foundation_gate, s.calibration().gates.floor);
        // Une porte basse atténue sans jamais annuler
        assert!(wrong_shape.total > 0.0);
    }

    #[test]
    fn test_skin_tone_penalty() {
        let s = scorer();
        let close = s.score_with_skin_tone(&neutral(), &neutral(), Some((0.40, 0.42)));
        let far = s.score_with_skin_tone(&neutral(), &neutral(), Some((0.10, 0.90)));
        assert_eq!(close.skin_tone_multiplier, Some(1.0));
        assert!((far.total - 0.70).abs() < 1e-5);
    }

    #[test]
    fn test_total_stays_in_unit_interval() {
        let s = scorer();
        for delta in [-0.5, -0.2, 0.0, 0.2, 0.5] {
            let current = FeatureSet::from_values(&[0.5 + delta; FEATURE_COUNT]);
            let score = s.score(&neutral(), &current);
            assert!((0.0..=1.0).contains(&score.total));
        }
    }
}
