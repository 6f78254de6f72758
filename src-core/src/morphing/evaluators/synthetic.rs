// FICHIER : src-core/src/morphing/evaluators/synthetic.rs

//! Rendu synthétique déterministe : déforme le visage canonique selon les
//! morphs puis mesure le résultat. Sert de banc d'essai au moteur (CLI, tests)
//! en l'absence du moteur de rendu réel.

use rand::prelude::*;

use crate::morphing::features::landmarks::{BROWS, LEFT_EYE, MIDLINE_POINTS, RIGHT_EYE};
use crate::morphing::features::{FeatureExtractor, FeatureSet, LandmarkSet};
use crate::morphing::traits::{Evaluation, MorphEvaluator};
use crate::morphing::types::{MorphTable, ParameterVector};
use crate::utils::prelude::*;

/// Sous-ensemble de landmarks touché par un effet.
#[derive(Clone, Copy, Debug)]
enum Points {
    Span(usize, usize),
    List(&'static [usize]),
}

impl Points {
    fn indices(self) -> Vec<usize> {
        match self {
            Points::Span(a, b) => (a..=b).collect(),
            Points::List(list) => list.to_vec(),
        }
    }
}

/// Déformation élémentaire, proportionnelle à `valeur - défaut`.
#[derive(Clone, Copy, Debug)]
enum Effect {
    /// Écartement horizontal autour de la ligne médiane.
    SpreadX(Points, f32),
    /// Écartement horizontal autour du centre de chaque œil.
    SpreadEyesX(f32),
    /// Écartement vertical autour du centre de chaque œil.
    SpreadEyesY(f32),
    /// Étirement vertical depuis la ligne des sourcils.
    SpreadYFromBrows(Points, f32),
    ShiftX(Points, f32),
    ShiftY(Points, f32),
}

use Effect::*;
use Points::{List, Span};

/// Effets frontaux par index de morph. Les morphs absents (profondeurs,
/// oreilles, cou) ne modifient pas les landmarks de face.
const EFFECTS: &[(usize, &[Effect])] = &[
    (0, &[SpreadX(Span(0, 16), 0.30)]),
    (2, &[ShiftY(Span(27, 47), 0.06)]),
    (3, &[SpreadYFromBrows(Span(0, 16), 0.25), SpreadYFromBrows(Span(27, 67), 0.25)]),
    (4, &[SpreadX(Span(2, 14), 0.15)]),
    (5, &[SpreadX(Span(5, 11), -0.25)]),
    (6, &[ShiftX(Span(9, 16), 0.05)]),
    (7, &[SpreadX(List(&[0, 1, 15, 16, 17, 26]), 0.2)]),
    (8, &[ShiftY(List(&[1, 2, 14, 15]), -0.08)]),
    (9, &[SpreadX(List(&[1, 2, 14, 15]), 0.2)]),
    (11, &[SpreadX(List(&[3, 4, 12, 13]), 0.2)]),
    (12, &[ShiftY(List(&[0, 16]), 0.08), ShiftY(Span(17, 26), -0.04)]),
    (13, &[SpreadX(List(&[17, 18, 25, 26]), 0.25)]),
    (15, &[SpreadX(Span(4, 12), 0.25)]),
    (16, &[ShiftY(List(&[4, 5, 11, 12]), -0.08)]),
    (17, &[SpreadX(List(&[5, 6, 10, 11]), 0.2)]),
    (18, &[ShiftY(List(&[3, 4, 12, 13]), 0.06)]),
    (19, &[SpreadX(List(&[6, 10]), 0.25)]),
    (21, &[SpreadX(List(&[7, 9]), 0.35)]),
    (22, &[ShiftY(List(&[7, 8, 9]), 0.08)]),
    (23, &[ShiftY(List(&[8]), 0.06)]),
    (27, &[ShiftY(Span(36, 47), 0.06)]),
    (28, &[SpreadEyesX(0.3)]),
    (29, &[SpreadEyesY(0.4)]),
    (31, &[SpreadEyesX(0.2), SpreadEyesY(0.2)]),
    (32, &[ShiftY(List(&[36, 45]), -0.03)]),
    (33, &[ShiftY(List(&[39, 42]), -0.03)]),
    (34, &[SpreadX(Span(36, 47), 0.25)]),
    (35, &[SpreadEyesY(0.15)]),
    (36, &[ShiftY(List(&[37, 38, 43, 44]), 0.02)]),
    (37, &[ShiftY(List(&[40, 41, 46, 47]), 0.02)]),
    (38, &[ShiftY(Span(17, 26), -0.06)]),
    (40, &[ShiftY(List(&[18, 19, 20, 23, 24, 25]), -0.03)]),
    (41, &[ShiftY(List(&[21, 22]), -0.04)]),
    (42, &[ShiftY(List(&[17, 26]), -0.04)]),
    (43, &[ShiftY(Span(30, 35), 0.07)]),
    (44, &[SpreadX(Span(31, 35), 0.35)]),
    (46, &[ShiftY(List(&[30]), -0.06)]),
    (47, &[SpreadX(Span(31, 35), 0.15), ShiftY(Span(31, 35), 0.03)]),
    (48, &[ShiftY(List(&[31, 35]), -0.03)]),
    (49, &[SpreadX(List(&[31, 35]), 0.2)]),
    (51, &[ShiftY(List(&[32, 33, 34]), 0.03)]),
    (52, &[SpreadX(Span(48, 67), 0.35)]),
    (53, &[ShiftY(Span(48, 67), 0.06)]),
    (54, &[ShiftY(List(&[48, 54, 60, 64]), 0.04)]),
    (55, &[ShiftY(Span(49, 53), -0.04)]),
    (56, &[ShiftY(Span(55, 59), 0.05)]),
    (58, &[SpreadX(List(&[55, 56, 58, 59]), 0.2)]),
    (60, &[ShiftY(List(&[6, 10]), -0.03)]),
];

/// Évaluateur synthétique : morphs → landmarks déformés → `FeatureSet`.
#[derive(Clone, Debug)]
pub struct SyntheticEvaluator {
    table: MorphTable,
    extractor: FeatureExtractor,
    template: LandmarkSet,
    midline_x: f32,
    brow_y: f32,
    skin_tone: Option<f32>,
    evaluations: usize,
}

impl SyntheticEvaluator {
    pub fn new(table: MorphTable, extractor: FeatureExtractor) -> Self {
        let template = LandmarkSet::canonical();
        let midline_x = template.centroid(MIDLINE_POINTS).x;
        let brow_y = template.mean_y(BROWS);
        Self {
            table,
            extractor,
            template,
            midline_x,
            brow_y,
            skin_tone: None,
            evaluations: 0,
        }
    }

    /// Teinte constante renvoyée avec chaque évaluation.
    pub fn with_skin_tone(mut self, tone: f32) -> Self {
        self.skin_tone = Some(tone);
        self
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    /// Landmarks du visage déformé par `morphs`.
    pub fn render(&self, morphs: &[f32]) -> Result<LandmarkSet> {
        if morphs.len() != self.table.len() {
            return Err(AppError::Evaluation(format!(
                "vecteur de {} morphs, {} attendus",
                morphs.len(),
                self.table.len()
            )));
        }

        let mut face = self.template.clone();
        for &(index, effects) in EFFECTS {
            let (Some(&value), Some(morph)) = (morphs.get(index), self.table.morphs.get(index)) else {
                continue;
            };
            let delta = value - morph.default;
            if delta == 0.0 || !delta.is_finite() {
                continue;
            }
            for &effect in effects {
                self.apply(&mut face, effect, delta);
            }
        }
        Ok(face)
    }

    /// Cible synthétique : morphs tirés autour des valeurs par défaut
    /// (± `spread` × envergure native), puis mesurés.
    pub fn random_target<R: Rng>(&self, rng: &mut R, spread: f32) -> Result<(ParameterVector, FeatureSet)> {
        let morphs: ParameterVector = self
            .table
            .morphs
            .iter()
            .map(|m| {
                let offset = rng.random_range(-1.0f32..=1.0) * spread * m.range.span();
                m.range.clamp(m.default + offset)
            })
            .collect();
        let features = self.extractor.extract_landmarks(&self.render(&morphs)?);
        Ok((morphs, features))
    }

    fn apply(&self, face: &mut LandmarkSet, effect: Effect, delta: f32) {
        match effect {
            SpreadX(points, gain) => {
                let factor = 1.0 + gain * delta;
                for i in points.indices() {
                    if let Some(p) = face.points_mut().get_mut(i) {
                        p.x = self.midline_x + (p.x - self.midline_x) * factor;
                    }
                }
            }
            SpreadYFromBrows(points, gain) => {
                let factor = 1.0 + gain * delta;
                for i in points.indices() {
                    if let Some(p) = face.points_mut().get_mut(i) {
                        p.y = self.brow_y + (p.y - self.brow_y) * factor;
                    }
                }
            }
            SpreadEyesX(gain) | SpreadEyesY(gain) => {
                let factor = 1.0 + gain * delta;
                let horizontal = matches!(effect, SpreadEyesX(_));
                for eye in [LEFT_EYE, RIGHT_EYE] {
                    let center = face.centroid(eye.clone());
                    for i in eye {
                        if let Some(p) = face.points_mut().get_mut(i) {
                            if horizontal {
                                p.x = center.x + (p.x - center.x) * factor;
                            } else {
                                p.y = center.y + (p.y - center.y) * factor;
                            }
                        }
                    }
                }
            }
            ShiftX(points, gain) => {
                for i in points.indices() {
                    if let Some(p) = face.points_mut().get_mut(i) {
                        p.x += gain * delta;
                    }
                }
            }
            ShiftY(points, gain) => {
                for i in points.indices() {
                    if let Some(p) = face.points_mut().get_mut(i) {
                        p.y += gain * delta;
                    }
                }
            }
        }
    }
}

impl Default for SyntheticEvaluator {
    fn default() -> Self {
        Self::new(MorphTable::default(), FeatureExtractor::default())
    }
}

impl MorphEvaluator for SyntheticEvaluator {
    fn evaluate(&mut self, morphs: &[f32]) -> Result<Evaluation> {
        let face = self.render(morphs)?;
        self.evaluations += 1;
        Ok(Evaluation {
            features: self.extractor.extract_landmarks(&face),
            skin_tone: self.skin_tone,
        })
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
