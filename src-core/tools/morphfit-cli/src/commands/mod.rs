// Une sous-commande par fichier ; les helpers partagés (chargement des
// tables, lecture des landmarks, écriture des rapports) vivent ici.

pub mod batch;
pub mod config;
pub mod features;
pub mod run;

use std::fs;
use std::path::Path;

use morphfit::morphing::config::EngineConfig;
use morphfit::morphing::features::{LandmarkSet, Point2};
use morphfit::utils::error::Context;
use morphfit::utils::prelude::*;

/// Fichier de landmarks : tableau plat `[x0, y0, ...]` ou liste de paires.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum LandmarkFile {
    Flat(Vec<f32>),
    Points(Vec<[f32; 2]>),
}

/// Tables du moteur : fichier explicite, sinon `MORPHFIT_ENGINE_CONFIG`,
/// sinon valeurs par défaut.
pub fn load_engine_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::from_json_file(path),
        None => EngineConfig::load(),
    }
}

pub fn read_landmarks(path: &Path) -> Result<LandmarkSet> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("lecture des landmarks {}", path.display()))?;
    let file: LandmarkFile = serde_json::from_str(&raw)?;

    let landmarks = match file {
        LandmarkFile::Flat(flat) => LandmarkSet::from_flat(&flat),
        LandmarkFile::Points(points) => {
            let points: Vec<Point2> = points.iter().map(|&[x, y]| Point2::new(x, y)).collect();
            LandmarkSet::from_points(&points)
        }
    };
    landmarks.ok_or_else(|| {
        AppError::InvalidInput(format!(
            "{} : 68 points finis attendus",
            path.display()
        ))
    })
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("écriture de {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_read_landmarks_accepts_both_layouts() {
        let canonical = LandmarkSet::canonical();

        let mut flat = tempfile::NamedTempFile::new().unwrap();
        write!(flat, "{}", serde_json::to_string(&canonical.to_flat()).unwrap()).unwrap();
        assert_eq!(read_landmarks(flat.path()).unwrap(), canonical);

        let pairs: Vec<[f32; 2]> = canonical.points().iter().map(|p| [p.x, p.y]).collect();
        let mut points = tempfile::NamedTempFile::new().unwrap();
        write!(points, "{}", serde_json::to_string(&pairs).unwrap()).unwrap();
        assert_eq!(read_landmarks(points.path()).unwrap(), canonical);
    }

    #[test]
    fn test_read_landmarks_rejects_short_arrays() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "[0.1, 0.2, 0.3]").unwrap();
        assert!(matches!(
            read_landmarks(file.path()),
            Err(AppError::InvalidInput(_))
        ));
        assert!(read_landmarks(Path::new("/nonexistent/landmarks.json")).is_err());
    }
}
