// FICHIER : src-core/tests/morphing_suite/config_test.rs

use std::io::Write;

use morphfit::morphing::config::EngineConfig;
use morphfit::morphing::groups::MorphGroups;
use morphfit::utils::prelude::*;

#[test]
fn test_default_tables_pass_startup_checks() {
    let config = EngineConfig::default();
    assert!(config.validate().is_ok());
    assert!(MorphGroups::default().validate(config.morphs.len()).is_ok());
}

#[test]
fn test_file_override_keeps_other_sections() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let json = json!({
        "schedule": { "max_total_evaluations": 1200 },
        "locks": { "max_deviation_fraction": 0.2 }
    });
    write!(file, "{}", json).unwrap();

    let config = EngineConfig::from_json_file(file.path()).unwrap();
    assert_eq!(config.schedule.max_total_evaluations, 1200);
    assert_eq!(config.locks.max_deviation_fraction, 0.2);
    assert_eq!(config.cma_es, EngineConfig::default().cma_es);
}

#[test]
fn test_index_in_three_groups_is_rejected() {
    let mut value: Value = serde_json::from_str(&EngineConfig::default().to_json_pretty().unwrap()).unwrap();
    // Index 0 ajouté à toutes les SubPhases
    if let Some(groups) = value["groups"].as_array_mut() {
        for group in groups {
            if let Some(indices) = group["indices"].as_array_mut() {
                if !indices.contains(&json!(0)) {
                    indices.push(json!(0));
                }
            }
        }
    }
    let err = EngineConfig::from_json_str(&value.to_string()).unwrap_err();
    assert!(matches!(err, AppError::Config(_)));
}
