// FICHIER : src-core/src/utils/mod.rs

// =========================================================================
//  MORPHFIT UTILS - Foundation Layer
// =========================================================================

pub mod config;
pub mod error;
pub mod logger;
pub mod macros;

/// **Core Foundation** : Types de base et Erreurs.
pub mod core {
    pub use super::error::{AppError, Result};
    pub use chrono::{DateTime, Utc};
    pub use uuid::Uuid;
}

/// **Data Abstraction** : Sérialisation des rapports et des tables.
pub mod data {
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{json, Value};
    pub use std::collections::{BTreeMap, HashMap, HashSet};
}

/// **Application Context** : Accès global Config/Log.
pub mod context {
    pub use super::config::AppConfig;
    pub use super::logger::init_logging;
}

/// **Le Prélude** : À utiliser via `use crate::utils::prelude::*;`
pub mod prelude {
    pub use super::context::AppConfig;
    pub use super::core::{AppError, Result, Utc, Uuid};
    pub use super::data::{json, Deserialize, Serialize, Value};
    pub use std::sync::Arc;
    pub use tracing::{debug, error, info, instrument, warn};
}

pub use config::AppConfig;
pub use error::{AppError, Result};
pub use logger::init_logging;

