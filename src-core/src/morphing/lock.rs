// FICHIER : src-core/src/morphing/lock.rs

use std::collections::BTreeMap;

use crate::morphing::types::{MorphRange, MorphTable};
use crate::utils::prelude::*;

/// Règle de calcul de la tolérance accordée à un morph verrouillé.
///
/// Plus le score obtenu est bon, plus la tolérance est serrée :
/// `span × lerp(max_fraction, min_fraction, t)` avec
/// `t = (score - min_acceptable) / (1 - min_acceptable)` borné à [0, 1].
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LockPolicy {
    pub max_deviation_fraction: f32,
    pub min_deviation_fraction: f32,
    pub min_acceptable_score: f32,
}

impl Default for LockPolicy {
    fn default() -> Self {
        Self {
            max_deviation_fraction: 0.15,
            min_deviation_fraction: 0.04,
            min_acceptable_score: 0.50,
        }
    }
}

impl LockPolicy {
    pub fn deviation(&self, span: f32, score: f32) -> f32 {
        let width = 1.0 - self.min_acceptable_score;
        let t = if width > 0.0 && score.is_finite() {
            ((score - self.min_acceptable_score) / width).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let fraction =
            self.max_deviation_fraction + (self.min_deviation_fraction - self.max_deviation_fraction) * t;
        span.abs() * fraction
    }

    pub fn validate(&self) -> Result<()> {
        let ok = self.min_deviation_fraction >= 0.0
            && self.min_deviation_fraction <= self.max_deviation_fraction
            && self.max_deviation_fraction <= 1.0
            && (0.0..1.0).contains(&self.min_acceptable_score);
        if !ok {
            return Err(AppError::config(format!("politique de verrouillage invalide : {:?}", self)));
        }
        Ok(())
    }
}

/// Verrou posé sur un morph à la fin de sa SubPhase.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MorphLock {
    pub index: usize,
    pub value: f32,
    pub deviation: f32,
    pub range: MorphRange,
}

/// Table des verrous. Écrivain unique (le contrôleur), lecteurs multiples.
#[derive(Clone, Debug)]
pub struct MorphLockManager {
    extended: Vec<MorphRange>,
    spans: Vec<f32>,
    locks: BTreeMap<usize, MorphLock>,
    policy: LockPolicy,
}

impl MorphLockManager {
    pub fn new(table: &MorphTable, policy: LockPolicy) -> Self {
        Self {
            extended: table.extended_ranges(),
            spans: table.morphs.iter().map(|m| m.range.span()).collect(),
            locks: BTreeMap::new(),
            policy,
        }
    }

    pub fn policy(&self) -> &LockPolicy {
        &self.policy
    }

    pub fn len(&self) -> usize {
        self.extended.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extended.is_empty()
    }

    /// Verrouille `index` autour de `value`. Re-verrouiller écrase le verrou
    /// précédent. Sans tolérance explicite, la tolérance maximale est appliquée.
    pub fn lock(&mut self, index: usize, value: f32, deviation: Option<f32>) -> Result<()> {
        let extended = *self.extended.get(index).ok_or_else(|| {
            AppError::InvalidInput(format!(
                "verrou demandé sur l'index {} (vecteur de {} morphs)",
                index,
                self.extended.len()
            ))
        })?;
        if !value.is_finite() {
            return Err(AppError::InvalidInput(format!(
                "valeur non finie pour le verrou de l'index {}",
                index
            )));
        }

        let span = self.spans.get(index).copied().unwrap_or(0.0);
        let deviation = deviation.unwrap_or(span * self.policy.max_deviation_fraction);
        if !deviation.is_finite() || deviation < 0.0 {
            return Err(AppError::InvalidInput(format!(
                "tolérance invalide ({}) pour l'index {}",
                deviation, index
            )));
        }

        let value = extended.clamp(value);
        let range = MorphRange::new(value - deviation, value + deviation).intersect(&extended);
        let lock = MorphLock {
            index,
            value,
            deviation,
            range,
        };
        if let Some(previous) = self.locks.insert(index, lock) {
            debug!(index, old = previous.value, new = value, "Verrou remplacé");
        } else {
            debug!(index, value, deviation, "🔒 Morph verrouillé");
        }
        Ok(())
    }

    /// Verrouille avec la tolérance dérivée du score de la SubPhase.
    pub fn lock_with_score(&mut self, index: usize, value: f32, score: f32) -> Result<()> {
        let span = self.spans.get(index).copied().unwrap_or(0.0);
        let deviation = self.policy.deviation(span, score);
        self.lock(index, value, Some(deviation))
    }

    pub fn is_locked(&self, index: usize) -> bool {
        self.locks.contains_key(&index)
    }

    pub fn get(&self, index: usize) -> Option<&MorphLock> {
        self.locks.get(&index)
    }

    /// Valeur ramenée dans l'intervalle du verrou ; inchangée si non verrouillé.
    pub fn clamp_if_locked(&self, index: usize, value: f32) -> f32 {
        match self.locks.get(&index) {
            Some(lock) => lock.range.clamp(value),
            None => value,
        }
    }

    /// Intervalle autorisé : celui du verrou, sinon la plage native étendue.
    pub fn allowed_range(&self, index: usize) -> Option<MorphRange> {
        match self.locks.get(&index) {
            Some(lock) => Some(lock.range),
            None => self.extended.get(index).copied(),
        }
    }

    /// Bornes autorisées pour une liste d'index (sous-espace d'un optimiseur).
    pub fn bounds_for(&self, indices: &[usize]) -> Vec<MorphRange> {
        indices
            .iter()
            .map(|&i| {
                self.allowed_range(i)
                    .unwrap_or(MorphRange::new(f32::MIN, f32::MAX))
            })
            .collect()
    }

    /// Index dont la valeur proposée sort de l'intervalle autorisé.
    pub fn check_violations(&self, proposal: &[f32]) -> Vec<usize> {
        proposal
            .iter()
            .enumerate()
            .filter(|&(i, &v)| match self.allowed_range(i) {
                Some(range) => !range.contains(v),
                None => false,
            })
            .map(|(i, _)| i)
            .collect()
    }

    /// Ramène toute la proposition dans les intervalles autorisés.
    /// Renvoie les index modifiés.
    pub fn clamp_vector(&self, proposal: &mut [f32]) -> Vec<usize> {
        let mut clamped = Vec::new();
        for (i, v) in proposal.iter_mut().enumerate() {
            if let Some(range) = self.allowed_range(i) {
                if !range.contains(*v) {
                    *v = range.clamp(*v);
                    clamped.push(i);
                }
            }
        }
        clamped
    }

    pub fn snapshot(&self) -> Vec<MorphLock> {
        self.locks.values().copied().collect()
    }

    pub fn locked_count(&self) -> usize {
        self.locks.len()
    }

    pub fn clear_all(&mut self) {
        if !self.locks.is_empty() {
            info!(count = self.locks.len(), "🔓 Tous les verrous sont levés");
        }
        self.locks.clear();
    }
}
