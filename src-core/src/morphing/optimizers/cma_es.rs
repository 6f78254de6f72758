// FICHIER : src-core/src/morphing/optimizers/cma_es.rs

//! CMA-ES à covariance diagonale, restreint au sous-espace actif d'une SubPhase.
//!
//! L'état interne est en `f64` (coordonnées locales, une par index actif) ;
//! les vecteurs échangés avec l'extérieur sont des `ParameterVector` complets.

use rand::prelude::*;
use rand_distr::StandardNormal;

use crate::morphing::types::{build_full_morph_array, extract_active, MorphRange, ParameterVector};
use crate::utils::prelude::*;

/// Constantes numériques de l'optimiseur.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CmaEsSettings {
    /// Plancher de population : l'élitisme occupe un slot.
    pub min_population: usize,
    pub max_population: usize,
    pub sigma_min: f64,
    pub sigma_max: f64,
    pub diag_min: f64,
    pub diag_max: f64,
}

impl Default for CmaEsSettings {
    fn default() -> Self {
        Self {
            min_population: 8,
            max_population: 16,
            sigma_min: 1e-4,
            sigma_max: 1.0,
            diag_min: 1e-8,
            diag_max: 1e4,
        }
    }
}

impl CmaEsSettings {
    /// `λ = clamp(5 + ⌊3·ln(n)⌋, min, max)`
    pub fn population_size(&self, dimension: usize) -> usize {
        let n = dimension.max(1) as f64;
        let lambda = 5 + (3.0 * n.ln()).floor() as usize;
        lambda.clamp(self.min_population, self.max_population.max(self.min_population))
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_population < 2 || self.max_population < self.min_population {
            return Err(AppError::config(format!(
                "population CMA-ES invalide ({}..={})",
                self.min_population, self.max_population
            )));
        }
        if !(self.sigma_min > 0.0 && self.sigma_min < self.sigma_max) {
            return Err(AppError::config("bornes de sigma invalides"));
        }
        if !(self.diag_min > 0.0 && self.diag_min < self.diag_max) {
            return Err(AppError::config("bornes de covariance invalides"));
        }
        Ok(())
    }
}

/// Résultat d'un `report_fitness`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FitnessOutcome {
    /// Évaluation enregistrée, la génération continue.
    Recorded,
    /// Dernier candidat de la génération : distribution mise à jour,
    /// nouvelle population tirée.
    GenerationCompleted,
    /// Vecteur incohérent (taille) : rien n'est enregistré.
    Rejected,
}

impl FitnessOutcome {
    pub fn is_new_generation(self) -> bool {
        self == FitnessOutcome::GenerationCompleted
    }
}

// Paramètres de stratégie, fonctions de (n, μ_eff) uniquement.
#[derive(Clone, Debug)]
struct Strategy {
    lambda: usize,
    mu: usize,
    weights: Vec<f64>,
    mu_eff: f64,
    cs: f64,
    damps: f64,
    cc: f64,
    c1: f64,
    cmu: f64,
    chi_n: f64,
}

impl Strategy {
    fn new(n: usize, lambda: usize) -> Self {
        let nf = n as f64;
        let mu = (lambda / 2).max(1);

        let raw: Vec<f64> = (0..mu)
            .map(|i| ((lambda as f64 + 1.0) / 2.0).ln() - ((i + 1) as f64).ln())
            .collect();
        let sum: f64 = raw.iter().sum();
        let weights: Vec<f64> = raw.iter().map(|w| w / sum).collect();
        let mu_eff = 1.0 / weights.iter().map(|w| w * w).sum::<f64>();

        let cs = (mu_eff + 2.0) / (nf + mu_eff + 5.0);
        let damps = 1.0 + 2.0 * (((mu_eff - 1.0) / (nf + 1.0)).sqrt() - 1.0).max(0.0) + cs;
        let cc = (4.0 + mu_eff / nf) / (nf + 4.0 + 2.0 * mu_eff / nf);
        let c1 = 2.0 / ((nf + 1.3).powi(2) + mu_eff);
        let cmu = (1.0 - c1).min(2.0 * (mu_eff - 2.0 + 1.0 / mu_eff) / ((nf + 2.0).powi(2) + mu_eff));
        let chi_n = nf.sqrt() * (1.0 - 1.0 / (4.0 * nf) + 1.0 / (21.0 * nf * nf));

        Self {
            lambda,
            mu,
            weights,
            mu_eff,
            cs,
            damps,
            cc,
            c1,
            cmu,
            chi_n,
        }
    }
}

/// Optimiseur d'une SubPhase. Une instance neuve par SubPhase.
pub struct CmaEsOptimizer<R: Rng> {
    active: Vec<usize>,
    base: ParameterVector,
    bounds: Option<Vec<MorphRange>>,
    settings: CmaEsSettings,
    strategy: Strategy,
    rng: R,

    mean: Vec<f64>,
    sigma: f64,
    diag_c: Vec<f64>,
    path_sigma: Vec<f64>,
    path_c: Vec<f64>,

    population: Vec<Vec<f64>>,
    results: Vec<(Vec<f64>, f64)>,
    cursor: usize,
    generation: usize,
    evaluations: usize,

    best_fitness: Option<f32>,
    best_morphs: Option<ParameterVector>,
    best_local: Option<Vec<f64>>,
}

impl<R: Rng> CmaEsOptimizer<R> {
    /// Initialise la distribution sur `active` à partir du vecteur courant.
    ///
    /// `step_scale` est exprimé en fraction de l'envergure de chaque morph
    /// (voir [`Self::with_spans`]) ; `bounds` donne, par index actif,
    /// l'intervalle dans lequel chaque échantillon est ramené.
    pub fn new(
        active: Vec<usize>,
        base: &[f32],
        step_scale: f32,
        bounds: Option<Vec<MorphRange>>,
        settings: CmaEsSettings,
        rng: R,
    ) -> Result<Self> {
        if active.is_empty() {
            return Err(AppError::InvalidInput(
                "CMA-ES : aucune dimension active".to_string(),
            ));
        }
        if let Some(&bad) = active.iter().find(|&&i| i >= base.len()) {
            return Err(AppError::InvalidInput(format!(
                "CMA-ES : index actif {} hors du vecteur ({} morphs)",
                bad,
                base.len()
            )));
        }
        if let Some(b) = &bounds {
            if b.len() != active.len() {
                return Err(AppError::InvalidInput(format!(
                    "CMA-ES : {} bornes pour {} dimensions",
                    b.len(),
                    active.len()
                )));
            }
        }
        if !(step_scale.is_finite() && step_scale > 0.0) {
            return Err(AppError::InvalidInput(format!(
                "CMA-ES : pas initial invalide ({})",
                step_scale
            )));
        }

        let n = active.len();
        let strategy = Strategy::new(n, settings.population_size(n));
        let mut optimizer = Self {
            mean: extract_active(base, &active).into_iter().map(f64::from).collect(),
            active,
            base: base.to_vec(),
            bounds,
            settings,
            strategy,
            rng,
            sigma: f64::from(step_scale).clamp(settings.sigma_min, settings.sigma_max),
            diag_c: vec![1.0; n],
            path_sigma: vec![0.0; n],
            path_c: vec![0.0; n],
            population: Vec::new(),
            results: Vec::new(),
            cursor: 0,
            generation: 0,
            evaluations: 0,
            best_fitness: None,
            best_morphs: None,
            best_local: None,
        };
        let mut mean = std::mem::take(&mut optimizer.mean);
        optimizer.clamp_local(&mut mean);
        optimizer.mean = mean;

        debug!(
            dimension = n,
            lambda = optimizer.strategy.lambda,
            mu = optimizer.strategy.mu,
            mu_eff = optimizer.strategy.mu_eff,
            sigma = optimizer.sigma,
            "CMA-ES initialisé"
        );
        Ok(optimizer)
    }

    /// Fixe l'échelle de chaque dimension (envergure native du morph) :
    /// la covariance initiale vaut `span²`, le pas est donc relatif à l'envergure.
    /// Sans effet une fois la première population tirée.
    pub fn with_spans(mut self, spans: &[f32]) -> Self {
        if self.population.is_empty() && spans.len() == self.active.len() {
            self.diag_c = spans
                .iter()
                .map(|&s| (f64::from(s) * f64::from(s)).clamp(self.settings.diag_min, self.settings.diag_max))
                .collect();
        }
        self
    }

    /// Prochain candidat (vecteur complet). Au-delà de la population, la
    /// moyenne courante est renvoyée.
    pub fn next_candidate(&mut self) -> ParameterVector {
        if self.population.is_empty() {
            self.sample_population();
        }
        match self.population.get(self.cursor) {
            Some(local) => self.to_full(local),
            None => self.to_full(&self.mean),
        }
    }

    /// Enregistre la fitness du vecteur effectivement évalué (éventuellement
    /// ramené dans les verrous par l'appelant).
    pub fn report_fitness(&mut self, fitness: f32, evaluated: &[f32]) -> FitnessOutcome {
        if evaluated.len() != self.base.len() {
            warn!(
                expected = self.base.len(),
                got = evaluated.len(),
                "CMA-ES : vecteur évalué de taille incohérente, ignoré"
            );
            return FitnessOutcome::Rejected;
        }
        if self.population.is_empty() {
            self.sample_population();
        }

        let fitness = if fitness.is_finite() {
            fitness
        } else {
            warn!("CMA-ES : fitness non finie, remplacée par 0");
            0.0
        };
        let local: Vec<f64> = extract_active(evaluated, &self.active)
            .into_iter()
            .map(f64::from)
            .collect();

        self.evaluations += 1;
        if self.best_fitness.map_or(true, |best| fitness > best) {
            self.best_fitness = Some(fitness);
            self.best_morphs = Some(evaluated.to_vec());
            self.best_local = Some(local.clone());
        }

        self.results.push((local, f64::from(fitness)));
        self.cursor += 1;

        if self.results.len() >= self.strategy.lambda {
            self.update_distribution();
            self.sample_population();
            FitnessOutcome::GenerationCompleted
        } else {
            FitnessOutcome::Recorded
        }
    }

    /// Remplace le vecteur de base (dimensions inactives). La taille doit être
    /// conservée.
    pub fn update_base_morphs(&mut self, new_base: &[f32]) -> Result<()> {
        if new_base.len() != self.base.len() {
            return Err(AppError::InvalidInput(format!(
                "CMA-ES : nouvelle base de {} valeurs (attendu {})",
                new_base.len(),
                self.base.len()
            )));
        }
        self.base = new_base.to_vec();
        Ok(())
    }

    /// Change le pas global (changement d'OptPhase).
    pub fn set_step_scale(&mut self, step_scale: f32) {
        if step_scale.is_finite() && step_scale > 0.0 {
            self.sigma = f64::from(step_scale).clamp(self.settings.sigma_min, self.settings.sigma_max);
            debug!(sigma = self.sigma, "CMA-ES : pas redimensionné");
        }
    }

    pub fn best_fitness(&self) -> Option<f32> {
        self.best_fitness
    }

    pub fn best_morphs(&self) -> Option<&[f32]> {
        self.best_morphs.as_deref()
    }

    pub fn mean_morphs(&self) -> ParameterVector {
        self.to_full(&self.mean)
    }

    pub fn active_indices(&self) -> &[usize] {
        &self.active
    }

    pub fn dimension(&self) -> usize {
        self.active.len()
    }

    pub fn population_size(&self) -> usize {
        self.strategy.lambda
    }

    pub fn parents(&self) -> usize {
        self.strategy.mu
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn diag_covariance(&self) -> &[f64] {
        &self.diag_c
    }

    pub fn generation(&self) -> usize {
        self.generation
    }

    pub fn evaluations(&self) -> usize {
        self.evaluations
    }

    // --- Helpers ---

    fn to_full(&self, local: &[f64]) -> ParameterVector {
        let local: Vec<f32> = local.iter().map(|&v| v as f32).collect();
        build_full_morph_array(&self.base, &self.active, &local)
    }

    fn clamp_local(&self, local: &mut [f64]) {
        if let Some(bounds) = &self.bounds {
            for (v, b) in local.iter_mut().zip(bounds) {
                *v = if v.is_nan() {
                    f64::from(b.min + b.max) * 0.5
                } else {
                    v.clamp(f64::from(b.min), f64::from(b.max))
                };
            }
        }
    }

    /// Slot 0 : meilleur point connu (ou moyenne au premier tirage).
    fn sample_population(&mut self) {
        let lambda = self.strategy.lambda;
        let mut population = Vec::with_capacity(lambda);

        let mut elite = self.best_local.clone().unwrap_or_else(|| self.mean.clone());
        self.clamp_local(&mut elite);
        population.push(elite);

        for _ in 1..lambda {
            let mut x: Vec<f64> = self
                .mean
                .iter()
                .zip(&self.diag_c)
                .map(|(&m, &c)| {
                    let z: f64 = self.rng.sample(StandardNormal);
                    m + self.sigma * c.sqrt() * z
                })
                .collect();
            self.clamp_local(&mut x);
            population.push(x);
        }

        self.population = population;
        self.results.clear();
        self.cursor = 0;
    }

    fn update_distribution(&mut self) {
        let n = self.active.len();
        let s = &self.strategy;

        let mut ranked = std::mem::take(&mut self.results);
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));

        let old_mean = self.mean.clone();
        let mut new_mean = vec![0.0; n];
        for ((x, _), &w) in ranked.iter().zip(&s.weights) {
            for (m, &xi) in new_mean.iter_mut().zip(x) {
                *m += w * xi;
            }
        }
        if new_mean.iter().any(|v| !v.is_finite()) {
            warn!("CMA-ES : moyenne non finie, génération ignorée");
            self.generation += 1;
            return;
        }

        // Chemin du pas (espace blanchi par la covariance diagonale)
        let y_w: Vec<f64> = new_mean
            .iter()
            .zip(&old_mean)
            .map(|(m, o)| (m - o) / self.sigma)
            .collect();
        let ps_coeff = (s.cs * (2.0 - s.cs) * s.mu_eff).sqrt();
        for ((p, y), c) in self.path_sigma.iter_mut().zip(&y_w).zip(&self.diag_c) {
            *p = (1.0 - s.cs) * *p + ps_coeff * y / c.sqrt();
        }
        let ps_norm = self.path_sigma.iter().map(|p| p * p).sum::<f64>().sqrt();

        // hsig : coupe le chemin de covariance quand le pas décroche
        let decay = 1.0 - (1.0 - s.cs).powi(2 * (self.generation as i32 + 1));
        let hsig_ratio = ps_norm / decay.max(f64::MIN_POSITIVE).sqrt() / s.chi_n;
        let hsig = if hsig_ratio < 1.4 + 2.0 / (n as f64 + 1.0) {
            1.0
        } else {
            0.0
        };

        let pc_coeff = (s.cc * (2.0 - s.cc) * s.mu_eff).sqrt();
        for (p, y) in self.path_c.iter_mut().zip(&y_w) {
            *p = (1.0 - s.cc) * *p + hsig * pc_coeff * y;
        }

        // Rang un + rang μ, diagonale seulement
        for i in 0..n {
            let rank_mu: f64 = ranked
                .iter()
                .zip(&s.weights)
                .map(|((x, _), &w)| {
                    let y = (x[i] - old_mean[i]) / self.sigma;
                    w * y * y
                })
                .sum();
            let c = self.diag_c[i];
            let rank_one = self.path_c[i] * self.path_c[i] + (1.0 - hsig) * s.cc * (2.0 - s.cc) * c;
            let updated = (1.0 - s.c1 - s.cmu) * c + s.c1 * rank_one + s.cmu * rank_mu;
            self.diag_c[i] = if updated.is_finite() {
                updated.clamp(self.settings.diag_min, self.settings.diag_max)
            } else {
                self.settings.diag_min
            };
        }

        let sigma = self.sigma * ((s.cs / s.damps) * (ps_norm / s.chi_n - 1.0)).exp();
        self.sigma = if sigma.is_finite() {
            sigma.clamp(self.settings.sigma_min, self.settings.sigma_max)
        } else {
            self.settings.sigma_min
        };

        self.mean = new_mean;
        self.generation += 1;
        debug!(
            generation = self.generation,
            sigma = self.sigma,
            best = ranked.first().map(|r| r.1).unwrap_or_default(),
            "CMA-ES : génération terminée"
        );
    }
}
