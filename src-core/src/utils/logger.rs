// FICHIER : src-core/src/utils/logger.rs

use crate::utils::config::AppConfig;
use std::path::Path;
use std::sync::Once;
use tracing_appender::rolling;
use tracing_subscriber::{
    filter::filter_fn, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

pub const LOG_FILE_PREFIX: &str = "morphfit.log";

static INIT: Once = Once::new();

/// Filtre console : `RUST_LOG` prioritaire, sinon le niveau de `AppConfig`.
fn console_filter(config: &AppConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()))
}

/// Le journal JSON n'est ouvert que si son dossier est utilisable.
fn file_writer(log_dir: &Path) -> Option<rolling::RollingFileAppender> {
    match std::fs::create_dir_all(log_dir) {
        Ok(()) => Some(rolling::daily(log_dir, LOG_FILE_PREFIX)),
        Err(e) => {
            eprintln!(
                "⚠️ [Logger] Dossier de logs {} inutilisable ({}), console seule.",
                log_dir.display(),
                e
            );
            None
        }
    }
}

/// Console compacte + fichier JSON quotidien (une ligne par événement,
/// y compris chaque évaluation au niveau `debug`). Idempotent.
pub fn init_logging() {
    INIT.call_once(|| {
        let config = AppConfig::get();
        let log_dir = config.log_dir.clone();

        // =========================================================================
        // LAYER 1 : FICHIER (JSON, pour rejouer/analyser les sessions)
        // =========================================================================
        let file_layer = file_writer(&log_dir).map(|writer| {
            fmt::layer()
                .json()
                .with_writer(writer)
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
        });

        // =========================================================================
        // LAYER 2 : CONSOLE (Pour l'Humain)
        // =========================================================================
        // Les macros user_* affichent déjà leur message : pas de doublon console
        let anti_double_filter = filter_fn(|metadata| {
            !metadata.fields().iter().any(|f| f.name() == "event")
        });

        let console_layer = fmt::layer()
            .compact()
            .with_target(false)
            .with_filter(console_filter(config))
            .with_filter(anti_double_filter);

        let registry = tracing_subscriber::registry()
            .with(file_layer)
            .with(console_layer);

        if registry.try_init().is_err() {
            tracing::warn!("⚠️ [Logger] Tentative de ré-initialisation ignorée (Global subscriber déjà actif).");
            return;
        }

        tracing::info!(
            env_mode = %config.env_mode,
            level = %config.log_level,
            "🚀 Logger initialisé. Logs disponibles dans : {:?}",
            log_dir
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_logger_init_idempotency() {
        init_logging();
        init_logging();
        tracing::debug!("logger opérationnel");
    }

    #[test]
    fn test_file_writer_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("sessions").join("logs");
        assert!(file_writer(&nested).is_some());
        assert!(nested.is_dir());
    }

    #[test]
    fn test_file_writer_rejects_a_file_path() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(file_writer(&file.path().join("logs")).is_none());
    }
}
