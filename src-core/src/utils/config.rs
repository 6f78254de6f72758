// FICHIER : src-core/src/utils/config.rs

use crate::utils::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;

/// Singleton global pour la configuration d'exécution (logs, environnement).
/// Les tables du moteur ne passent JAMAIS par ici : elles sont injectées
/// explicitement via `morphing::config::EngineConfig`.
static CONFIG: OnceLock<AppConfig> = OnceLock::new();

pub const ENV_MODE_VAR: &str = "MORPHFIT_ENV_MODE";
pub const LOG_LEVEL_VAR: &str = "MORPHFIT_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "MORPHFIT_LOG_DIR";
pub const ENGINE_CONFIG_VAR: &str = "MORPHFIT_ENGINE_CONFIG";
pub const SEED_VAR: &str = "MORPHFIT_SEED";

pub const DEFAULT_SEED: u64 = 42;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    pub env_mode: String,
    pub log_level: String,
    pub log_dir: PathBuf,
    /// Fichier JSON optionnel surchargeant les tables par défaut du moteur.
    pub engine_config: Option<PathBuf>,
    pub default_seed: u64,
}

impl AppConfig {
    pub fn init() -> Result<()> {
        if CONFIG.get().is_some() {
            return Ok(());
        }

        let config = Self::from_env()?;
        if CONFIG.set(config).is_err() {
            tracing::debug!("AppConfig déjà initialisée par un autre thread");
        }
        Ok(())
    }

    /// Retourne la configuration active. Sans `init()` préalable, on retombe
    /// sur la configuration bac à sable (tests, usage embarqué).
    pub fn get() -> &'static AppConfig {
        CONFIG.get_or_init(Self::sandbox)
    }

    pub fn from_env() -> Result<Self> {
        let env_mode = match env::var(ENV_MODE_VAR) {
            Ok(mode) => mode,
            Err(_) if cfg!(debug_assertions) => "development".to_string(),
            Err(_) => "production".to_string(),
        };

        let log_level = env::var(LOG_LEVEL_VAR).unwrap_or_else(|_| {
            if env_mode == "production" {
                "warn".to_string()
            } else {
                "info".to_string()
            }
        });

        let log_dir = env::var(LOG_DIR_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_log_dir());

        let engine_config = env::var(ENGINE_CONFIG_VAR).ok().map(PathBuf::from);

        let default_seed = match env::var(SEED_VAR) {
            Ok(raw) => raw.trim().parse::<u64>().map_err(|e| {
                AppError::Config(format!("{SEED_VAR} invalide ('{raw}') : {e}"))
            })?,
            Err(_) => DEFAULT_SEED,
        };

        Ok(Self {
            env_mode,
            log_level,
            log_dir,
            engine_config,
            default_seed,
        })
    }

    fn sandbox() -> Self {
        Self {
            env_mode: "test".to_string(),
            log_level: "debug".to_string(),
            log_dir: env::temp_dir().join("morphfit").join("logs"),
            engine_config: None,
            default_seed: DEFAULT_SEED,
        }
    }

    fn default_log_dir() -> PathBuf {
        env::temp_dir().join("morphfit").join("logs")
    }

    pub fn is_test(&self) -> bool {
        self.env_mode == "test"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_vars() {
        for var in [ENV_MODE_VAR, LOG_LEVEL_VAR, LOG_DIR_VAR, ENGINE_CONFIG_VAR, SEED_VAR] {
            env::remove_var(var);
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        clear_vars();
        let config = AppConfig::from_env().expect("config par défaut");
        assert_eq!(config.default_seed, DEFAULT_SEED);
        assert!(config.engine_config.is_none());
        assert!(config.log_dir.ends_with("logs"));
    }

    #[test]
    #[serial]
    fn test_from_env_overrides() {
        clear_vars();
        env::set_var(ENV_MODE_VAR, "production");
        env::set_var(SEED_VAR, "1234");
        env::set_var(ENGINE_CONFIG_VAR, "/tmp/engine.json");

        let config = AppConfig::from_env().unwrap();
        assert_eq!(config.env_mode, "production");
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.default_seed, 1234);
        assert_eq!(config.engine_config, Some(PathBuf::from("/tmp/engine.json")));
        clear_vars();
    }

    #[test]
    #[serial]
    fn test_invalid_seed_is_config_error() {
        clear_vars();
        env::set_var(SEED_VAR, "pas-un-nombre");
        let err = AppConfig::from_env().unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        clear_vars();
    }

    #[test]
    fn test_get_falls_back_to_sandbox() {
        // Ne doit jamais paniquer, même sans init()
        let config = AppConfig::get();
        assert!(!config.log_level.is_empty());
    }
}
