// FICHIER : src-core/tests/morphing_suite/pipeline_test.rs

use morphfit::morphing::config::EngineConfig;
use morphfit::morphing::dto::SessionOutcome;
use morphfit::morphing::evaluators::SyntheticEvaluator;
use morphfit::morphing::features::{FaceShape, FaceShapeClassifier, FeatureExtractor, LandmarkSet};
use morphfit::morphing::scoring::ScoringCalibration;
use morphfit::morphing::session::{run_batch, BatchJob, OptimizationSession};
use morphfit::morphing::traits::MorphEvaluator;
use morphfit::morphing::types::MorphTable;
use morphfit::utils::prelude::*;
use rand::rngs::StdRng;
use rand::SeedableRng;

fn fast_config() -> EngineConfig {
    let mut config = EngineConfig::default();
    config.scoring = ScoringCalibration::unbiased();
    config.schedule.exploration.iteration_budget = 24;
    config.schedule.refinement.iteration_budget = 24;
    config.schedule.plateau_escape.iteration_budget = 16;
    config.schedule.lock_in.iteration_budget = 8;
    config
}

#[test]
fn test_flat_landmarks_to_features_and_shape() {
    let flat = LandmarkSet::canonical().to_flat();
    let features = FeatureExtractor::default().extract(&flat);
    assert!(!features.is_empty());

    let shape = FaceShapeClassifier::default().classify(&features).unwrap();
    assert_eq!(shape.shape, FaceShape::Oval);

    // Tableau tronqué : ensemble neutre, pas d'erreur
    assert!(FeatureExtractor::default().extract(&flat[..40]).is_empty());
}

#[test]
fn test_synthetic_session_end_to_end() {
    let evaluator = SyntheticEvaluator::default();
    let (_, target) = evaluator
        .random_target(&mut StdRng::seed_from_u64(99), 0.25)
        .unwrap();

    let config = Arc::new(fast_config());
    let mut session = OptimizationSession::new(
        Arc::clone(&config),
        target,
        MorphTable::default().defaults(),
        evaluator,
        StdRng::seed_from_u64(99),
    )
    .unwrap();
    let report = session.run();

    assert_eq!(report.outcome, SessionOutcome::Completed);
    assert_eq!(report.sub_phases.len(), 12);
    assert!(report.total() > 0.0 && report.total() <= 1.0);
    assert_eq!(report.total_evaluations, session.controller().total_evaluations());

    // Chaque SubPhase verrouillée laisse des verrous dans son instantané
    for snapshot in report.sub_phases.iter().filter(|s| s.locked) {
        assert!(!snapshot.locks.is_empty());
        assert!(snapshot.best_vector.is_some());
    }

    // Le rapport est sérialisable et relisible
    let json = report.to_json_pretty().unwrap();
    let value: Value = serde_json::from_str(&json).unwrap();
    assert_eq!(value["outcome"], json!("completed"));
    assert_eq!(value["final_vector"].as_array().map(Vec::len), Some(62));
}

#[test]
fn test_session_reaches_a_self_generated_target() {
    // Cible = visage par défaut : le point de départ est déjà optimal
    let mut evaluator = SyntheticEvaluator::default();
    let target = evaluator
        .evaluate(&MorphTable::default().defaults())
        .unwrap()
        .features;

    let mut session = OptimizationSession::new(
        Arc::new(fast_config()),
        target,
        MorphTable::default().defaults(),
        evaluator,
        StdRng::seed_from_u64(1),
    )
    .unwrap();
    let report = session.run();
    assert!((report.total() - 1.0).abs() < 1e-5);
}

#[test]
fn test_parallel_batch_is_reproducible() {
    let evaluator = SyntheticEvaluator::default();
    let jobs: Vec<BatchJob> = (10..14)
        .map(|seed| {
            let (_, target) = evaluator
                .random_target(&mut StdRng::seed_from_u64(seed), 0.2)
                .unwrap();
            BatchJob {
                target,
                base: MorphTable::default().defaults(),
                seed,
            }
        })
        .collect();

    let config = Arc::new(fast_config());
    let first = run_batch(Arc::clone(&config), jobs.clone(), |_| SyntheticEvaluator::default());
    let second = run_batch(config, jobs, |_| SyntheticEvaluator::default());

    assert_eq!(first.len(), 4);
    for (a, b) in first.iter().zip(second.iter()) {
        let (a, b) = (a.as_ref().unwrap(), b.as_ref().unwrap());
        assert_eq!(a.final_vector, b.final_vector);
        assert_eq!(a.total_evaluations, b.total_evaluations);
    }
}
