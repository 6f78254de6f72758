// FICHIER : src-core/src/utils/error.rs

use serde::Serialize;
use std::io;

// --- RE-EXPORTS ANYHOW (Pour la flexibilité du CLI) ---
pub use anyhow::{anyhow, Context};
// On renomme le Result de anyhow pour ne pas qu'il écrase le nôtre
pub use anyhow::Result as AnyResult;

/// Type de résultat standard du moteur MorphFit.
pub type Result<T> = std::result::Result<T, AppError>;

/// Enumération centrale des erreurs du moteur.
///
/// Les erreurs de forme d'entrée et les instabilités numériques sont
/// récupérées localement par le moteur : seules les erreurs de configuration,
/// d'évaluation externe et d'E/S remontent jusqu'ici.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Erreur de configuration : {0}")]
    Config(String),

    #[error("Entrée invalide : {0}")]
    InvalidInput(String),

    #[error("Erreur d'évaluation externe : {0}")]
    Evaluation(String),

    #[error("Introuvable : {0}")]
    NotFound(String),

    #[error("Erreur d'entrée/sortie : {0}")]
    Io(#[from] io::Error),

    #[error("Erreur de sérialisation : {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Erreur Système : {0}")]
    System(#[from] anyhow::Error),
}

impl AppError {
    /// Raccourci pour les erreurs de configuration détectées au démarrage.
    pub fn config(msg: impl Into<String>) -> Self {
        AppError::Config(msg.into())
    }
}

// Les rapports de session embarquent l'erreur sous forme de chaîne simple.
impl Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        serializer.serialize_str(self.to_string().as_ref())
    }
}

// Permet de faire : return Err("Mon erreur".into());
impl From<String> for AppError {
    fn from(s: String) -> Self {
        AppError::System(anyhow::anyhow!(s))
    }
}

impl From<&str> for AppError {
    fn from(s: &str) -> Self {
        AppError::System(anyhow::anyhow!(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display_formatting() {
        let err = AppError::Config("SubPhase sans index actif".to_string());
        assert_eq!(
            err.to_string(),
            "Erreur de configuration : SubPhase sans index actif"
        );

        let err_eval = AppError::Evaluation("rendu indisponible".to_string());
        assert_eq!(
            err_eval.to_string(),
            "Erreur d'évaluation externe : rendu indisponible"
        );
    }

    #[test]
    fn test_app_error_serialization() {
        let err = AppError::InvalidInput("62 valeurs attendues".to_string());
        let json = serde_json::to_string(&err).expect("Devrait être sérialisable");
        assert_eq!(json, "\"Entrée invalide : 62 valeurs attendues\"");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "cible absente");
        let app_err: AppError = io_err.into();

        match app_err {
            AppError::Io(e) => assert!(e.to_string().contains("cible absente")),
            _ => panic!("Devrait être converti en AppError::Io"),
        }
    }

    #[test]
    fn test_from_string_helpers() {
        let err_string: AppError = String::from("Erreur string").into();
        match err_string {
            AppError::System(e) => assert_eq!(e.to_string(), "Erreur string"),
            _ => panic!("String devrait devenir AppError::System"),
        }

        let err_str: AppError = "Erreur str".into();
        match err_str {
            AppError::System(e) => assert_eq!(e.to_string(), "Erreur str"),
            _ => panic!("&str devrait devenir AppError::System"),
        }
    }

    #[test]
    fn test_from_serde_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("{ invalid json }").unwrap_err();
        let app_err: AppError = serde_err.into();

        match app_err {
            AppError::Serialization(e) => assert!(e.is_syntax()),
            _ => panic!("Devrait être converti en AppError::Serialization"),
        }
    }
}
