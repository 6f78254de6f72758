use std::path::PathBuf;

use clap::Args;
use morphfit::morphing::evaluators::SyntheticEvaluator;
use morphfit::morphing::features::FeatureExtractor;
use morphfit::morphing::session::{run_batch, BatchJob};
use morphfit::{user_error, user_info, user_success, utils::prelude::*};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{load_engine_config, write_json};

/// Lance plusieurs sessions synthétiques indépendantes (une graine chacune)
#[derive(Args, Clone, Debug)]
pub struct BatchArgs {
    /// Nombre de sessions
    #[arg(short = 'n', long, default_value = "4")]
    pub count: u64,

    /// Première graine ; les suivantes sont consécutives
    #[arg(short, long)]
    pub seed: Option<u64>,

    #[arg(long, default_value = "0.3")]
    pub spread: f32,

    /// Tables du moteur (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Rapports agrégés (JSON)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn handle(args: BatchArgs) -> Result<()> {
    let config = Arc::new(load_engine_config(args.config.as_deref())?);
    let first_seed = args.seed.unwrap_or(AppConfig::get().default_seed);
    let template = SyntheticEvaluator::new(
        config.morphs.clone(),
        FeatureExtractor::new(config.features.clone()),
    );

    let jobs = (0..args.count)
        .map(|i| {
            let seed = first_seed.wrapping_add(i);
            let mut rng = StdRng::seed_from_u64(seed);
            let (_, target) = template.random_target(&mut rng, args.spread)?;
            Ok(BatchJob {
                target,
                base: config.morphs.defaults(),
                seed: seed.wrapping_add(1),
            })
        })
        .collect::<Result<Vec<_>>>()?;

    user_info!("BATCH_START", "{} sessions en parallèle", jobs.len());
    let results = run_batch(Arc::clone(&config), jobs, |_| template.clone());

    let mut reports = Vec::with_capacity(results.len());
    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(report) => {
                user_info!(
                    "BATCH_SESSION",
                    "#{} {:?} total {:.3} ({} évaluations)",
                    i,
                    report.outcome,
                    report.total(),
                    report.total_evaluations
                );
                reports.push(report);
            }
            Err(e) => user_error!("BATCH_SESSION_FAIL", "#{} : {}", i, e),
        }
    }

    if !reports.is_empty() {
        let mean = reports.iter().map(|r| r.total()).sum::<f32>() / reports.len() as f32;
        user_success!("BATCH_DONE", "{} sessions, total moyen {:.3}", reports.len(), mean);
    }
    if let Some(path) = &args.output {
        write_json(path, &reports)?;
        user_success!("REPORT_WRITTEN", "Rapports écrits dans {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_writes_one_report_per_session() {
        let dir = tempfile::tempdir().unwrap();
        let engine = dir.path().join("engine.json");
        std::fs::write(&engine, r#"{ "schedule": { "max_total_evaluations": 20 } }"#).unwrap();
        let output = dir.path().join("batch.json");

        let args = BatchArgs {
            count: 3,
            seed: Some(7),
            spread: 0.2,
            config: Some(engine),
            output: Some(output.clone()),
        };
        assert!(handle(args).is_ok());

        let reports: Value = serde_json::from_str(&std::fs::read_to_string(output).unwrap()).unwrap();
        let reports = reports.as_array().unwrap();
        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r["outcome"] == json!("aborted")));
    }
}
