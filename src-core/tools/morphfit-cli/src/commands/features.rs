use std::path::PathBuf;

use clap::Args;
use morphfit::morphing::features::{FaceShapeClassifier, FeatureExtractor};
use morphfit::{user_info, user_success, utils::prelude::*};

use super::{load_engine_config, read_landmarks};

/// Mesures normalisées et archétype de visage d'un fichier de landmarks
#[derive(Args, Clone, Debug)]
pub struct FeaturesArgs {
    /// Fichier JSON (tableau plat ou liste de paires [x, y])
    pub landmarks: PathBuf,

    /// Tables du moteur (calibration des mesures)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Sortie JSON brute
    #[arg(long)]
    pub json: bool,
}

pub fn handle(args: FeaturesArgs) -> Result<()> {
    let config = load_engine_config(args.config.as_deref())?;
    let landmarks = read_landmarks(&args.landmarks)?;
    let features = FeatureExtractor::new(config.features).extract_landmarks(&landmarks);
    let shape = FaceShapeClassifier::default().classify(&features);

    if args.json {
        let out = json!({
            "features": features
                .named()
                .into_iter()
                .map(|(f, v)| (format!("{:?}", f), json!(v)))
                .collect::<serde_json::Map<String, Value>>(),
            "shape": shape,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    for (feature, value) in features.named() {
        user_info!("FEATURE", "{:<22} {:.3}", format!("{:?}", feature), value);
    }
    match shape {
        Some(m) => user_success!("FACE_SHAPE", "{:?} (similarité {:.3})", m.shape, m.similarity),
        None => user_info!("FACE_SHAPE", "Archétype indéterminé"),
    }
    Ok(())
}
