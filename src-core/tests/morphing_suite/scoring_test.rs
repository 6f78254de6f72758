// FICHIER : src-core/tests/morphing_suite/scoring_test.rs

use morphfit::morphing::features::{FeatureSet, FEATURE_COUNT};
use morphfit::morphing::groups::MorphGroups;
use morphfit::morphing::phases::SubPhase;
use morphfit::morphing::scoring::{soft_gate, HierarchicalScorer, ScoringCalibration};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn random_set(rng: &mut StdRng) -> FeatureSet {
    let values: Vec<f32> = (0..FEATURE_COUNT).map(|_| rng.random::<f32>()).collect();
    FeatureSet::from_values(&values)
}

#[test]
fn test_identity_scores_one_without_bias() {
    let scorer = HierarchicalScorer::new(&MorphGroups::default(), ScoringCalibration::unbiased());
    let mut rng = StdRng::seed_from_u64(17);
    for _ in 0..50 {
        let a = random_set(&mut rng);
        let score = scorer.score(&a, &a);
        assert!((score.total - 1.0).abs() < 1e-5, "total = {}", score.total);
    }
}

#[test]
fn test_every_level_stays_in_unit_interval() {
    let scorer = HierarchicalScorer::new(&MorphGroups::default(), ScoringCalibration::default());
    let mut rng = StdRng::seed_from_u64(3);
    let extremes = [
        FeatureSet::from_values(&[0.0; FEATURE_COUNT]),
        FeatureSet::from_values(&[1.0; FEATURE_COUNT]),
        FeatureSet::from_values(&[f32::NAN; FEATURE_COUNT]),
        FeatureSet::default(),
    ];

    let mut sets: Vec<FeatureSet> = (0..20).map(|_| random_set(&mut rng)).collect();
    sets.extend(extremes);
    for target in &sets {
        for current in &sets {
            let score = scorer.score(target, current);
            assert!((0.0..=1.0).contains(&score.total));
            for s in SubPhase::ALL {
                assert!((0.0..=1.0).contains(&score.sub_phase(s)));
            }
        }
    }
}

#[test]
fn test_empty_measurements_are_neutral() {
    let scorer = HierarchicalScorer::new(&MorphGroups::default(), ScoringCalibration::unbiased());
    let score = scorer.score(&FeatureSet::default(), &FeatureSet::default());
    for s in SubPhase::ALL {
        assert_eq!(score.sub_phase(s), 0.5);
    }
}

#[test]
fn test_soft_gate_is_monotonic_and_continuous() {
    let (low, high, floor) = (0.35, 0.75, 0.25);
    assert!((soft_gate(low, low, high, floor) - floor).abs() < 1e-6);
    assert!((soft_gate(high, low, high, floor) - 1.0).abs() < 1e-6);

    let mut previous = soft_gate(0.0, low, high, floor);
    for i in 1..=1000 {
        let x = i as f32 / 1000.0;
        let g = soft_gate(x, low, high, floor);
        assert!(g + 1e-6 >= previous);
        assert!(g - previous < 0.01, "saut en {}", x);
        previous = g;
    }
}
