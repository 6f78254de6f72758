// FICHIER : src-core/src/morphing/config.rs

use std::fs;
use std::path::Path;

use crate::morphing::controller::PhaseSchedule;
use crate::morphing::features::FeatureCalibration;
use crate::morphing::groups::MorphGroups;
use crate::morphing::lock::LockPolicy;
use crate::morphing::optimizers::CmaEsSettings;
use crate::morphing::scoring::ScoringCalibration;
use crate::morphing::session::SessionSettings;
use crate::morphing::types::MorphTable;
use crate::utils::prelude::*;

/// Agrégat immuable de toutes les tables du moteur.
///
/// Construit une fois au démarrage puis partagé (`Arc`) entre scorer,
/// contrôleur, optimiseur et session. Chaque section absente d'un fichier
/// JSON reprend sa valeur par défaut.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub morphs: MorphTable,
    pub groups: MorphGroups,
    pub features: FeatureCalibration,
    pub scoring: ScoringCalibration,
    pub schedule: PhaseSchedule,
    pub cma_es: CmaEsSettings,
    pub locks: LockPolicy,
    pub session: SessionSettings,
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::Config(format!("lecture de {} impossible : {}", path.display(), e))
        })?;
        let config = Self::from_json_str(&raw)?;
        info!(path = %path.display(), "Configuration moteur chargée");
        Ok(config)
    }

    /// Configuration désignée par `AppConfig` (fichier), sinon tables par défaut.
    pub fn load() -> Result<Self> {
        match &AppConfig::get().engine_config {
            Some(path) => Self::from_json_file(path),
            None => {
                let config = Self::default();
                config.validate()?;
                Ok(config)
            }
        }
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Contrôles de cohérence, échec immédiat au démarrage.
    pub fn validate(&self) -> Result<()> {
        self.morphs.validate()?;
        self.groups.validate(self.morphs.len())?;
        self.features.validate()?;
        self.scoring.validate()?;
        self.schedule.validate()?;
        self.cma_es.validate()?;
        self.locks.validate()?;
        self.session.validate()?;

        if self.locks.min_acceptable_score >= self.schedule.lock_in_threshold {
            return Err(AppError::config(format!(
                "min_acceptable_score ({}) doit rester sous lock_in_threshold ({})",
                self.locks.min_acceptable_score, self.schedule.lock_in_threshold
            )));
        }
        Ok(())
    }
}
