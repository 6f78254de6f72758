use std::path::PathBuf;

use clap::{Args, Subcommand};
use morphfit::morphing::config::EngineConfig;
use morphfit::{user_success, utils::prelude::*};

use super::write_json;

#[derive(Args, Clone, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Clone, Debug)]
pub enum ConfigCommands {
    /// Exporte les tables par défaut (stdout ou fichier)
    Dump {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Vérifie un fichier de tables (contrôles de démarrage)
    Validate { path: PathBuf },
}

pub fn handle(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Dump { output } => {
            let config = EngineConfig::default();
            match output {
                Some(path) => {
                    write_json(&path, &config)?;
                    user_success!("CONFIG_DUMP", "Tables écrites dans {}", path.display());
                }
                None => println!("{}", config.to_json_pretty()?),
            }
        }
        ConfigCommands::Validate { path } => {
            let config = EngineConfig::from_json_file(&path)?;
            user_success!(
                "CONFIG_VALID",
                "{} : {} morphs, {} évaluations max",
                path.display(),
                config.morphs.len(),
                config.schedule.max_total_evaluations
            );
        }
    }
    Ok(())
}
