use std::path::PathBuf;

use clap::Args;
use morphfit::morphing::evaluators::SyntheticEvaluator;
use morphfit::morphing::features::FeatureExtractor;
use morphfit::morphing::phases::SubPhase;
use morphfit::morphing::session::OptimizationSession;
use morphfit::{user_info, user_success, utils::prelude::*};
use rand::rngs::StdRng;
use rand::SeedableRng;

use super::{load_engine_config, read_landmarks, write_json};

/// Optimise les 62 morphs vers une cible avec l'évaluateur synthétique
#[derive(Args, Clone, Debug)]
pub struct RunArgs {
    /// Fichier JSON de landmarks cible (sinon : cible synthétique tirée de la graine)
    #[arg(short, long)]
    pub target: Option<PathBuf>,

    /// Graine des tirages (défaut : MORPHFIT_SEED)
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Dispersion de la cible synthétique, en fraction de l'envergure des morphs
    #[arg(long, default_value = "0.3")]
    pub spread: f32,

    /// Tables du moteur (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Rapport de session (JSON)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

pub fn handle(args: RunArgs) -> Result<()> {
    let config = Arc::new(load_engine_config(args.config.as_deref())?);
    let seed = args.seed.unwrap_or(AppConfig::get().default_seed);
    let evaluator = SyntheticEvaluator::new(
        config.morphs.clone(),
        FeatureExtractor::new(config.features.clone()),
    );

    let target = match &args.target {
        Some(path) => {
            user_info!("TARGET_FILE", "Cible : {}", path.display());
            evaluator.extractor().extract_landmarks(&read_landmarks(path)?)
        }
        None => {
            user_info!(
                "TARGET_SYNTHETIC",
                "Cible synthétique (graine {}, dispersion {})",
                seed,
                args.spread
            );
            let mut rng = StdRng::seed_from_u64(seed);
            evaluator.random_target(&mut rng, args.spread)?.1
        }
    };

    let mut session = OptimizationSession::new(
        Arc::clone(&config),
        target,
        config.morphs.defaults(),
        evaluator,
        StdRng::seed_from_u64(seed.wrapping_add(1)),
    )?;
    let report = session.run();

    for snapshot in &report.sub_phases {
        user_info!(
            "SUB_PHASE",
            "{:<12} {:>6.3} {:>4} it. {}",
            snapshot.sub_phase.to_string(),
            snapshot.best_score,
            snapshot.iterations,
            if snapshot.locked { "🔒" } else { "⏭️" }
        );
    }
    if let Some(score) = &report.final_score {
        for sub_phase in SubPhase::ALL {
            tracing::debug!(%sub_phase, score = score.sub_phase(sub_phase), "Score final");
        }
    }

    user_success!(
        "RUN_DONE",
        "{:?} : total {:.3} en {} évaluations",
        report.outcome,
        report.total(),
        report.total_evaluations
    );

    if let Some(path) = &args.output {
        write_json(path, &report)?;
        user_success!("REPORT_WRITTEN", "Rapport écrit dans {}", path.display());
    }
    Ok(())
}
