use clap::{Parser, Subcommand};

mod commands;

use morphfit::{
    user_error, user_info,
    utils::{context, prelude::*},
};

#[derive(Parser)]
#[command(name = "morphfit-cli")]
#[command(about = "Pilotage du moteur d'optimisation hiérarchique des morphs", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Optimise vers une cible (fichier de landmarks ou cible synthétique)
    Run(commands::run::RunArgs),

    /// Sessions synthétiques indépendantes en parallèle
    Batch(commands::batch::BatchArgs),

    /// Mesures et archétype de visage d'un fichier de landmarks
    Features(commands::features::FeaturesArgs),

    /// Tables du moteur : export des valeurs par défaut ou validation
    Config(commands::config::ConfigArgs),
}

fn main() -> Result<()> {
    // 1. Configuration d'exécution (variables MORPHFIT_*)
    if let Err(e) = AppConfig::init() {
        eprintln!("❌ CRITICAL ERROR: Impossible d'initialiser la configuration.");
        eprintln!("   Détails : {}", e);
        std::process::exit(1);
    }

    // 2. Logs console + fichier JSON
    context::init_logging();

    let cli = Cli::parse();
    user_info!("CLI_START", "morphfit-cli v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = execute_command(cli.command) {
        user_error!("CMD_FAIL", "{}", e);
        std::process::exit(1);
    }

    tracing::debug!("Fin de l'exécution du CLI");
    Ok(())
}

fn execute_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Run(args) => commands::run::handle(args),
        Commands::Batch(args) => commands::batch::handle(args),
        Commands::Features(args) => commands::features::handle(args),
        Commands::Config(args) => commands::config::handle(args),
    }
}
