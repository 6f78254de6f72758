// FICHIER : src-core/src/morphing/traits.rs

use crate::morphing::features::FeatureSet;
use crate::utils::prelude::*;

/// Ce que renvoie l'évaluateur externe pour un vecteur de morphs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub features: FeatureSet,
    /// Teinte de peau mesurée, si l'évaluateur la fournit.
    #[serde(default)]
    pub skin_tone: Option<f32>,
}

impl Evaluation {
    pub fn new(features: FeatureSet) -> Self {
        Self {
            features,
            skin_tone: None,
        }
    }
}

/// Le trait MorphEvaluator fait le lien avec le moteur de rendu.
///
/// Appliquer les morphs, rendre, détecter les landmarks puis extraire les
/// mesures : tout cela est hors du cœur. Le moteur attend seulement les
/// mesures du vecteur exact qu'il a proposé. Une erreur interrompt la
/// session et remonte à l'appelant.
pub trait MorphEvaluator {
    fn evaluate(&mut self, morphs: &[f32]) -> Result<Evaluation>;

    /// Nom affiché dans les logs et rapports.
    fn name(&self) -> &str {
        "external"
    }
}

/// Toute fermeture `FnMut(&[f32]) -> Result<Evaluation>` est un évaluateur.
impl<F> MorphEvaluator for F
where
    F: FnMut(&[f32]) -> Result<Evaluation>,
{
    fn evaluate(&mut self, morphs: &[f32]) -> Result<Evaluation> {
        self(morphs)
    }
}
