// FICHIER : src-core/src/morphing/session.rs

//! Orchestration d'une optimisation complète.
//!
//! Une session possède son contrôleur (et donc sa table de verrous), son
//! optimiseur courant et son scorer : plusieurs sessions peuvent tourner en
//! parallèle sans rien partager d'autre que la configuration immuable.

use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand::rngs::StdRng;
use rayon::prelude::*;

use crate::morphing::config::EngineConfig;
use crate::morphing::controller::{ControllerDecision, HierarchicalPhaseController, PhaseEvent};
use crate::morphing::dto::{SessionOutcome, SessionReport, SubPhaseSnapshot};
use crate::morphing::features::FeatureSet;
use crate::morphing::optimizers::CmaEsOptimizer;
use crate::morphing::scoring::{HierarchicalScore, HierarchicalScorer};
use crate::morphing::traits::MorphEvaluator;
use crate::morphing::types::ParameterVector;
use crate::utils::prelude::*;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Poids `w` du score de la SubPhase active dans la fitness :
    /// `w·SubPhase + (1-w)·Total`.
    pub fitness_blend: f32,
    /// Une ligne de progression toutes les N évaluations (0 = jamais).
    pub progress_interval: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            fitness_blend: 0.6,
            progress_interval: 100,
        }
    }
}

impl SessionSettings {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.fitness_blend) {
            return Err(AppError::config(format!(
                "fitness_blend hors de [0,1] : {}",
                self.fitness_blend
            )));
        }
        Ok(())
    }
}

struct BestSoFar {
    total: f32,
    vector: ParameterVector,
    score: HierarchicalScore,
}

/// Meilleure fitness de la SubPhase active, alignée sur celle du contrôleur.
struct SubPhaseBest {
    fitness: f32,
    vector: ParameterVector,
    score: HierarchicalScore,
}

pub struct OptimizationSession<E: MorphEvaluator, R: Rng> {
    id: Uuid,
    started_at: DateTime<Utc>,
    config: Arc<EngineConfig>,
    scorer: HierarchicalScorer,
    controller: HierarchicalPhaseController,
    optimizer: Option<CmaEsOptimizer<StdRng>>,
    evaluator: E,
    rng: R,

    target: FeatureSet,
    target_skin_tone: Option<f32>,
    base: ParameterVector,

    best: Option<BestSoFar>,
    sub_phase_best: Option<SubPhaseBest>,
    snapshots: Vec<SubPhaseSnapshot>,
    outcome: Option<SessionOutcome>,
    error: Option<String>,
}

impl<E: MorphEvaluator, R: Rng> OptimizationSession<E, R> {
    /// Prépare une session : `base` est le vecteur de départ (62 valeurs),
    /// ramené dans les plages étendues.
    pub fn new(
        config: Arc<EngineConfig>,
        target: FeatureSet,
        base: ParameterVector,
        evaluator: E,
        rng: R,
    ) -> Result<Self> {
        if base.len() != config.morphs.len() {
            return Err(AppError::InvalidInput(format!(
                "vecteur de départ de {} morphs, {} attendus",
                base.len(),
                config.morphs.len()
            )));
        }
        if !target.is_well_formed() {
            warn!("Cible mal formée : les mesures manquantes seront neutres");
        }

        let controller = HierarchicalPhaseController::new(Arc::clone(&config));
        let mut base = base;
        controller.lock_manager().clamp_vector(&mut base);

        let mut session = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            scorer: HierarchicalScorer::new(&config.groups, config.scoring.clone()),
            config,
            controller,
            optimizer: None,
            evaluator,
            rng,
            target,
            target_skin_tone: None,
            base,
            best: None,
            sub_phase_best: None,
            snapshots: Vec::new(),
            outcome: None,
            error: None,
        };
        let optimizer = session.build_optimizer()?;
        session.optimizer = Some(optimizer);

        info!(
            session = %session.id,
            evaluator = session.evaluator.name(),
            "🚀 Session d'optimisation prête"
        );
        Ok(session)
    }

    /// Active la pénalité de teinte (si l'évaluateur mesure aussi la teinte).
    pub fn with_target_skin_tone(mut self, tone: f32) -> Self {
        self.target_skin_tone = Some(tone);
        self
    }

    /// Un cycle atomique : candidat → verrous → évaluation → score → rapports.
    pub fn step(&mut self) -> Result<ControllerDecision> {
        match self.outcome {
            Some(SessionOutcome::Completed) => return Ok(ControllerDecision::Complete),
            Some(_) => return Ok(ControllerDecision::Abort),
            None => {}
        }

        let optimizer = match self.optimizer.take() {
            Some(optimizer) => optimizer,
            None => self.build_optimizer()?,
        };
        let mut candidate = self.optimizer.insert(optimizer).next_candidate();
        let clamped = self.controller.lock_manager().clamp_vector(&mut candidate);
        if !clamped.is_empty() {
            debug!(?clamped, "Proposition ramenée dans les verrous");
        }

        let score = self.score_vector(&candidate)?;

        let blend = self.config.session.fitness_blend;
        let sub_score = score.sub_phase(self.controller.sub_phase());
        let fitness = blend * sub_score + (1.0 - blend) * score.total;
        debug!(
            sub_phase = %self.controller.sub_phase(),
            opt_phase = %self.controller.opt_phase(),
            sub_score,
            total = score.total,
            fitness,
            "Évaluation"
        );

        if let Some(optimizer) = self.optimizer.as_mut() {
            if optimizer.report_fitness(fitness, &candidate).is_new_generation() {
                debug!(
                    generation = optimizer.generation(),
                    sigma = optimizer.sigma(),
                    best = optimizer.best_fitness().unwrap_or_default(),
                    "Génération CMA-ES terminée"
                );
            }
        }
        self.record_sub_phase_best(fitness, &candidate, &score);
        self.record_best(&candidate, score);

        let decision = self.controller.report_score(fitness, &candidate);
        self.handle_events()?;
        self.log_progress();

        match decision {
            ControllerDecision::Continue => {}
            ControllerDecision::Complete => self.outcome = Some(SessionOutcome::Completed),
            ControllerDecision::Abort => self.outcome = Some(SessionOutcome::Aborted),
        }
        Ok(decision)
    }

    /// Boucle jusqu'à `Complete` ou `Abort`. Une erreur de l'évaluateur met
    /// fin à la session : le rapport garde le meilleur vecteur connu.
    #[instrument(skip(self), fields(session = %self.id))]
    pub fn run(&mut self) -> SessionReport {
        loop {
            match self.step() {
                Ok(ControllerDecision::Continue) => continue,
                Ok(_) => break,
                Err(e) => {
                    error!(error = %e, "Évaluation impossible, arrêt de la session");
                    self.outcome = Some(SessionOutcome::Failed);
                    self.error = Some(e.to_string());
                    break;
                }
            }
        }
        let report = self.report();
        info!(
            outcome = ?report.outcome,
            total = report.total(),
            evaluations = report.total_evaluations,
            "🏁 Session terminée"
        );
        report
    }

    /// Rapport courant. Le vecteur final est le meilleur Total compatible
    /// avec la table de verrous courante, à défaut le vecteur de base.
    pub fn report(&self) -> SessionReport {
        SessionReport {
            session_id: self.id,
            evaluator: self.evaluator.name().to_string(),
            started_at: self.started_at,
            finished_at: Utc::now(),
            outcome: self.outcome.unwrap_or(SessionOutcome::Aborted),
            error: self.error.clone(),
            final_vector: self
                .best
                .as_ref()
                .map_or_else(|| self.base.clone(), |b| b.vector.clone()),
            final_score: self.best.as_ref().map(|b| b.score.clone()),
            sub_phases: self.snapshots.clone(),
            total_evaluations: self.controller.total_evaluations(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn controller(&self) -> &HierarchicalPhaseController {
        &self.controller
    }

    pub fn evaluator(&self) -> &E {
        &self.evaluator
    }

    /// Vecteur de base courant (verrous des SubPhases déjà closes appliqués).
    pub fn base(&self) -> &[f32] {
        &self.base
    }

    pub fn best_total(&self) -> Option<f32> {
        self.best.as_ref().map(|b| b.total)
    }

    pub fn best_vector(&self) -> Option<&[f32]> {
        self.best.as_ref().map(|b| b.vector.as_slice())
    }

    pub fn snapshots(&self) -> &[SubPhaseSnapshot] {
        &self.snapshots
    }

    pub fn outcome(&self) -> Option<SessionOutcome> {
        self.outcome
    }

    // --- Helpers ---

    /// Optimiseur neuf pour la SubPhase active, borné par les verrous.
    fn build_optimizer(&mut self) -> Result<CmaEsOptimizer<StdRng>> {
        let active = self.controller.active_indices().to_vec();
        let bounds = self.controller.lock_manager().bounds_for(&active);
        let spans: Vec<f32> = active
            .iter()
            .map(|&i| self.config.morphs.native_range(i).map_or(1.0, |r| r.span()))
            .collect();
        let rng = StdRng::seed_from_u64(self.rng.random());

        let optimizer = CmaEsOptimizer::new(
            active,
            &self.base,
            self.controller.sigma_scale(),
            Some(bounds),
            self.config.cma_es,
            rng,
        )?
        .with_spans(&spans);

        debug!(
            sub_phase = %self.controller.sub_phase(),
            dimension = optimizer.dimension(),
            lambda = optimizer.population_size(),
            "Optimiseur construit"
        );
        Ok(optimizer)
    }

    fn score_vector(&mut self, morphs: &[f32]) -> Result<HierarchicalScore> {
        let evaluation = self.evaluator.evaluate(morphs)?;
        let skin_tone = self.target_skin_tone.zip(evaluation.skin_tone);
        Ok(self
            .scorer
            .score_with_skin_tone(&self.target, &evaluation.features, skin_tone))
    }

    fn record_sub_phase_best(&mut self, fitness: f32, candidate: &[f32], score: &HierarchicalScore) {
        if self.sub_phase_best.as_ref().map_or(true, |b| fitness > b.fitness) {
            self.sub_phase_best = Some(SubPhaseBest {
                fitness,
                vector: candidate.to_vec(),
                score: score.clone(),
            });
        }
    }

    /// Seuls les candidats dans la table de verrous courante peuvent devenir
    /// la réponse finale.
    fn record_best(&mut self, candidate: &[f32], score: HierarchicalScore) {
        if !self.controller.lock_manager().check_violations(candidate).is_empty() {
            return;
        }
        if self.best.as_ref().map_or(true, |b| score.total > b.total) {
            self.best = Some(BestSoFar {
                total: score.total,
                vector: candidate.to_vec(),
                score,
            });
        }
    }

    fn handle_events(&mut self) -> Result<()> {
        let mut rebuild = false;

        for event in self.controller.take_events() {
            match event {
                PhaseEvent::OptPhaseChanged { to, .. } => {
                    let scale = self.config.schedule.settings(to).sigma_scale;
                    if let Some(optimizer) = self.optimizer.as_mut() {
                        optimizer.set_step_scale(scale);
                    }
                }
                PhaseEvent::SubPhaseCompleted {
                    sub_phase,
                    main_phase,
                    best_score,
                    best_vector,
                    locked,
                    iterations,
                } => {
                    // Sans verrou, la base reste celle d'avant la SubPhase
                    if locked {
                        if let Some(vector) = &best_vector {
                            self.base = vector.clone();
                        }
                    }
                    self.controller.lock_manager().clamp_vector(&mut self.base);
                    let base_score = match self.sub_phase_best.take() {
                        Some(b) if b.vector == self.base => Some(b.score),
                        _ => None,
                    };
                    self.keep_best_within_locks(base_score)?;
                    self.snapshots.push(SubPhaseSnapshot {
                        sub_phase,
                        main_phase,
                        best_score,
                        best_vector,
                        locked,
                        iterations,
                        locks: self.controller.lock_manager().snapshot(),
                    });
                    rebuild = true;
                }
                PhaseEvent::MainPhaseCompleted { main_phase } => {
                    debug!(%main_phase, best_total = self.best_total().unwrap_or_default(), "MainPhase close");
                }
                PhaseEvent::SessionCompleted { evaluations } => {
                    debug!(evaluations, "Plan de phases épuisé");
                }
            }
        }

        if rebuild {
            self.optimizer = None;
            if !self.controller.is_complete() {
                let optimizer = self.build_optimizer()?;
                self.optimizer = Some(optimizer);
            }
        }
        Ok(())
    }

    /// Un nouveau verrou peut exclure le meilleur vecteur retenu : il est
    /// alors remplacé par la base verrouillée, réévaluée si son score n'est
    /// pas connu.
    fn keep_best_within_locks(&mut self, base_score: Option<HierarchicalScore>) -> Result<()> {
        let violations = match &self.best {
            Some(best) => self.controller.lock_manager().check_violations(&best.vector),
            None => return Ok(()),
        };
        if violations.is_empty() {
            return Ok(());
        }

        let score = match base_score {
            Some(score) => score,
            None => {
                let base = self.base.clone();
                self.score_vector(&base)?
            }
        };
        debug!(
            ?violations,
            total = score.total,
            "Meilleur vecteur hors verrous, remplacé par la base"
        );
        self.best = Some(BestSoFar {
            total: score.total,
            vector: self.base.clone(),
            score,
        });
        Ok(())
    }

    fn log_progress(&self) {
        let interval = self.config.session.progress_interval;
        let evaluations = self.controller.total_evaluations();
        if interval > 0 && evaluations > 0 && evaluations % interval == 0 {
            info!(
                evaluations,
                main_phase = %self.controller.main_phase(),
                sub_phase = %self.controller.sub_phase(),
                opt_phase = %self.controller.opt_phase(),
                best_total = self.best_total().unwrap_or_default(),
                locked = self.controller.lock_manager().locked_count(),
                "Progression"
            );
        }
    }
}

/// Une session indépendante d'un lot.
#[derive(Clone, Debug)]
pub struct BatchJob {
    pub target: FeatureSet,
    pub base: ParameterVector,
    pub seed: u64,
}

/// Exécute des sessions indépendantes en parallèle. Chaque job possède son
/// contrôleur, ses verrous, son optimiseur et son évaluateur ; seule la
/// configuration est partagée.
pub fn run_batch<E, F>(config: Arc<EngineConfig>, jobs: Vec<BatchJob>, make_evaluator: F) -> Vec<Result<SessionReport>>
where
    E: MorphEvaluator,
    F: Fn(&BatchJob) -> E + Sync,
{
    info!(jobs = jobs.len(), "Lot de sessions lancé");
    jobs.into_par_iter()
        .map(|job| -> Result<SessionReport> {
            let evaluator = make_evaluator(&job);
            let mut session = OptimizationSession::new(
                Arc::clone(&config),
                job.target,
                job.base,
                evaluator,
                StdRng::seed_from_u64(job.seed),
            )?;
            Ok(session.run())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphing::evaluators::SyntheticEvaluator;
    use crate::morphing::scoring::ScoringCalibration;
    use crate::morphing::traits::Evaluation;
    use crate::morphing::types::MorphTable;

    /// Enregistre chaque vecteur évalué.
    struct Recording {
        inner: SyntheticEvaluator,
        seen: Vec<ParameterVector>,
    }

    impl MorphEvaluator for Recording {
        fn evaluate(&mut self, morphs: &[f32]) -> Result<Evaluation> {
            self.seen.push(morphs.to_vec());
            self.inner.evaluate(morphs)
        }
    }

    fn small_config() -> EngineConfig {
        let mut config = EngineConfig::default();
        config.scoring = ScoringCalibration::unbiased();
        for phase in [
            &mut config.schedule.exploration,
            &mut config.schedule.refinement,
            &mut config.schedule.plateau_escape,
            &mut config.schedule.lock_in,
        ] {
            phase.iteration_budget = 16;
            phase.plateau_patience = phase.plateau_patience.map(|p| p.min(10));
        }
        config
    }

    fn synthetic_target(seed: u64) -> FeatureSet {
        let evaluator = SyntheticEvaluator::default();
        let (_, features) = evaluator
            .random_target(&mut StdRng::seed_from_u64(seed), 0.3)
            .unwrap();
        features
    }

    fn session_with(
        config: EngineConfig,
        seed: u64,
    ) -> OptimizationSession<SyntheticEvaluator, StdRng> {
        OptimizationSession::new(
            Arc::new(config),
            synthetic_target(seed),
            MorphTable::default().defaults(),
            SyntheticEvaluator::default(),
            StdRng::seed_from_u64(seed),
        )
        .unwrap()
    }

    #[test]
    fn test_settings_validation() {
        assert!(SessionSettings::default().validate().is_ok());
        let bad = SessionSettings {
            fitness_blend: 1.5,
            ..Default::default()
        };
        assert!(matches!(bad.validate(), Err(AppError::Config(_))));
    }

    #[test]
    fn test_wrong_base_length_is_rejected() {
        let result = OptimizationSession::new(
            Arc::new(EngineConfig::default()),
            FeatureSet::default(),
            vec![0.5; 10],
            SyntheticEvaluator::default(),
            StdRng::seed_from_u64(0),
        );
        assert!(matches!(result, Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_run_completes_every_sub_phase() {
        let mut session = session_with(small_config(), 3);
        let report = session.run();

        assert_eq!(report.outcome, SessionOutcome::Completed);
        assert_eq!(report.sub_phases.len(), 12);
        assert!(report.total_evaluations <= 6000);
        assert_eq!(report.final_vector.len(), 62);
        assert!(report.final_score.is_some());
        assert!(session.controller().is_complete());
        // Après la fin, step ne relance rien
        assert_eq!(session.step().unwrap(), ControllerDecision::Complete);
    }

    #[test]
    fn test_final_total_never_below_locked_base() {
        let config = small_config();
        let target = synthetic_target(11);
        let scorer = HierarchicalScorer::new(&config.groups, config.scoring.clone());

        let mut session = OptimizationSession::new(
            Arc::new(config),
            target.clone(),
            MorphTable::default().defaults(),
            SyntheticEvaluator::default(),
            StdRng::seed_from_u64(11),
        )
        .unwrap();
        let report = session.run();

        let base = SyntheticEvaluator::default().evaluate(session.base()).unwrap();
        let base_total = scorer.score(&target, &base.features).total;
        assert!(report.total() >= base_total);
        assert!(session
            .controller()
            .lock_manager()
            .check_violations(session.base())
            .is_empty());
    }

    #[test]
    fn test_candidates_respect_existing_locks() {
        let config = Arc::new(small_config());
        let mut session = OptimizationSession::new(
            Arc::clone(&config),
            synthetic_target(5),
            MorphTable::default().defaults(),
            Recording {
                inner: SyntheticEvaluator::default(),
                seen: Vec::new(),
            },
            StdRng::seed_from_u64(5),
        )
        .unwrap();

        // On avance jusqu'à la première SubPhase verrouillée
        while session.snapshots().iter().all(|s| !s.locked) {
            assert_eq!(session.step().unwrap(), ControllerDecision::Continue);
        }
        let locks = session.controller().lock_manager().clone();
        let already_seen = session.evaluator().seen.len();
        let completed = session.snapshots().len();

        // La table ne change qu'à la clôture suivante
        for _ in 0..50 {
            if session.snapshots().len() > completed || session.step().is_err() {
                break;
            }
        }
        let seen = &session.evaluator().seen;

        assert!(locks.locked_count() > 0);
        assert!(seen.len() > already_seen);
        for vector in &seen[already_seen..] {
            assert!(locks.check_violations(vector).is_empty());
        }
    }

    #[test]
    fn test_global_cap_aborts_with_best_so_far() {
        let mut config = small_config();
        config.schedule.max_total_evaluations = 10;
        let mut session = session_with(config, 8);
        let report = session.run();

        assert_eq!(report.outcome, SessionOutcome::Aborted);
        assert_eq!(report.total_evaluations, 10);
        assert_eq!(Some(report.total()), session.best_total());
    }

    #[test]
    fn test_evaluator_failure_keeps_best_vector() {
        let mut calls = 0;
        let mut inner = SyntheticEvaluator::default();
        let failing = move |morphs: &[f32]| -> Result<Evaluation> {
            calls += 1;
            if calls > 20 {
                return Err(AppError::Evaluation("rendu indisponible".to_string()));
            }
            inner.evaluate(morphs)
        };
        let mut session = OptimizationSession::new(
            Arc::new(small_config()),
            synthetic_target(2),
            MorphTable::default().defaults(),
            failing,
            StdRng::seed_from_u64(2),
        )
        .unwrap();

        let report = session.run();
        assert_eq!(report.outcome, SessionOutcome::Failed);
        assert!(report.error.is_some());
        assert_eq!(report.total_evaluations, 20);
        assert_eq!(report.final_vector, session.best_vector().unwrap().to_vec());
    }

    #[test]
    fn test_final_vector_stays_within_lock_table() {
        for seed in 0..8 {
            let config = small_config();
            let scorer = HierarchicalScorer::new(&config.groups, config.scoring.clone());
            let mut session = session_with(config, seed);
            let report = session.run();
            let locks = session.controller().lock_manager();

            assert_eq!(report.outcome, SessionOutcome::Completed);
            assert!(locks.locked_count() > 0, "seed {seed}");
            assert!(
                locks.check_violations(&report.final_vector).is_empty(),
                "seed {seed} : {:?}",
                locks.check_violations(&report.final_vector)
            );
            if let Some(last) = report.sub_phases.last() {
                assert_eq!(last.locks, locks.snapshot());
            }

            // Le score publié est bien celui du vecteur publié
            let rendered = SyntheticEvaluator::default()
                .evaluate(&report.final_vector)
                .unwrap();
            let rescored = scorer.score(&synthetic_target(seed), &rendered.features);
            assert_eq!(Some(rescored), report.final_score, "seed {seed}");
        }
    }

    #[test]
    fn test_same_seed_same_result() {
        let a = session_with(small_config(), 21).run();
        let b = session_with(small_config(), 21).run();
        assert_eq!(a.final_vector, b.final_vector);
        assert_eq!(a.total_evaluations, b.total_evaluations);
        assert_ne!(a.session_id, b.session_id);
    }

    #[test]
    fn test_batch_runs_independent_sessions() {
        let config = Arc::new(small_config());
        let jobs: Vec<BatchJob> = (0..3)
            .map(|seed| BatchJob {
                target: synthetic_target(seed),
                base: MorphTable::default().defaults(),
                seed,
            })
            .collect();

        let reports = run_batch(config, jobs, |_| SyntheticEvaluator::default());
        assert_eq!(reports.len(), 3);
        for report in &reports {
            let report = report.as_ref().unwrap();
            assert_eq!(report.outcome, SessionOutcome::Completed);
            assert_eq!(report.evaluator, "synthetic");
        }
    }
}
