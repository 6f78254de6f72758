// FICHIER : src-core/src/morphing/controller.rs

use crate::morphing::config::EngineConfig;
use crate::morphing::lock::MorphLockManager;
use crate::morphing::phases::{MainPhase, OptPhase, SubPhase};
use crate::morphing::types::ParameterVector;
use crate::utils::prelude::*;

/// Réglages d'une OptPhase (accordables, non structurels).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptPhaseSettings {
    /// Pas de l'optimiseur, en fraction de l'envergure des morphs.
    pub sigma_scale: f32,
    pub iteration_budget: usize,
    pub target_score: f32,
    /// Rapports consécutifs sans progrès tolérés ; `None` = pas de détection.
    pub plateau_patience: Option<usize>,
}

impl OptPhaseSettings {
    const fn new(sigma_scale: f32, iteration_budget: usize, target_score: f32, plateau_patience: Option<usize>) -> Self {
        Self {
            sigma_scale,
            iteration_budget,
            target_score,
            plateau_patience,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhaseSchedule {
    pub exploration: OptPhaseSettings,
    pub refinement: OptPhaseSettings,
    pub plateau_escape: OptPhaseSettings,
    pub lock_in: OptPhaseSettings,
    /// Score à partir duquel on passe directement en LockIn.
    pub lock_in_threshold: f32,
    /// Gain minimal pour remettre le compteur de plateau à zéro.
    pub plateau_threshold: f32,
    /// Plafond global d'évaluations (au-delà : `Abort`).
    pub max_total_evaluations: usize,
}

impl Default for PhaseSchedule {
    fn default() -> Self {
        Self {
            exploration: OptPhaseSettings::new(0.30, 120, 0.80, Some(40)),
            refinement: OptPhaseSettings::new(0.12, 120, 0.88, Some(40)),
            plateau_escape: OptPhaseSettings::new(0.50, 60, 0.85, Some(25)),
            lock_in: OptPhaseSettings::new(0.05, 40, 0.97, None),
            lock_in_threshold: 0.92,
            plateau_threshold: 0.001,
            max_total_evaluations: 6000,
        }
    }
}

impl PhaseSchedule {
    pub fn settings(&self, phase: OptPhase) -> &OptPhaseSettings {
        match phase {
            OptPhase::Exploration => &self.exploration,
            OptPhase::Refinement => &self.refinement,
            OptPhase::PlateauEscape => &self.plateau_escape,
            OptPhase::LockIn => &self.lock_in,
        }
    }

    pub fn validate(&self) -> Result<()> {
        for phase in OptPhase::ALL {
            let s = self.settings(phase);
            if !(s.sigma_scale.is_finite() && s.sigma_scale > 0.0) {
                return Err(AppError::config(format!("{} : sigma_scale invalide", phase)));
            }
            if s.iteration_budget == 0 {
                return Err(AppError::config(format!("{} : budget nul", phase)));
            }
            if !(0.0..=1.0).contains(&s.target_score) {
                return Err(AppError::config(format!("{} : score cible hors de [0,1]", phase)));
            }
            if s.plateau_patience == Some(0) {
                return Err(AppError::config(format!("{} : patience de plateau nulle", phase)));
            }
        }
        if !(self.lock_in_threshold > 0.0 && self.lock_in_threshold <= 1.0) {
            return Err(AppError::config("lock_in_threshold hors de ]0,1]"));
        }
        if !(self.plateau_threshold >= 0.0) {
            return Err(AppError::config("plateau_threshold négatif"));
        }
        if self.max_total_evaluations == 0 {
            return Err(AppError::config("max_total_evaluations nul"));
        }
        Ok(())
    }
}

/// Décision renvoyée après chaque rapport de score.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControllerDecision {
    Continue,
    Complete,
    Abort,
}

/// Notifications destinées aux collaborateurs (orchestrateur, télémétrie).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PhaseEvent {
    OptPhaseChanged {
        sub_phase: SubPhase,
        from: OptPhase,
        to: OptPhase,
    },
    SubPhaseCompleted {
        sub_phase: SubPhase,
        main_phase: MainPhase,
        best_score: f32,
        best_vector: Option<ParameterVector>,
        locked: bool,
        iterations: usize,
    },
    MainPhaseCompleted {
        main_phase: MainPhase,
    },
    SessionCompleted {
        evaluations: usize,
    },
}

/// Automate (MainPhase, SubPhase, OptPhase).
///
/// Seul écrivain de la table des verrous : un verrou n'est posé qu'à la
/// clôture d'une SubPhase.
pub struct HierarchicalPhaseController {
    config: Arc<EngineConfig>,
    locks: MorphLockManager,

    main_phase: MainPhase,
    sub_phase: SubPhase,
    opt_phase: OptPhase,

    phase_iterations: usize,
    sub_phase_iterations: usize,
    plateau_counter: usize,
    total_evaluations: usize,

    best_score: Option<f32>,
    best_vector: Option<ParameterVector>,

    completed: bool,
    events: Vec<PhaseEvent>,
}

impl HierarchicalPhaseController {
    pub fn new(config: Arc<EngineConfig>) -> Self {
        let locks = MorphLockManager::new(&config.morphs, config.locks);
        let main_phase = MainPhase::Foundation;
        let sub_phase = main_phase.sub_phases().first().copied().unwrap_or(SubPhase::FaceWidth);
        Self {
            config,
            locks,
            main_phase,
            sub_phase,
            opt_phase: OptPhase::Exploration,
            phase_iterations: 0,
            sub_phase_iterations: 0,
            plateau_counter: 0,
            total_evaluations: 0,
            best_score: None,
            best_vector: None,
            completed: false,
            events: Vec::new(),
        }
    }

    /// Point d'entrée unique de l'automate.
    pub fn report_score(&mut self, score: f32, current: &[f32]) -> ControllerDecision {
        if self.completed {
            return ControllerDecision::Complete;
        }
        let schedule = &self.config.schedule;
        if self.total_evaluations >= schedule.max_total_evaluations {
            warn!(
                evaluations = self.total_evaluations,
                "⛔ Plafond global d'évaluations atteint"
            );
            return ControllerDecision::Abort;
        }

        let score = if score.is_finite() {
            score
        } else {
            warn!(sub_phase = %self.sub_phase, "Score non fini reçu, traité comme 0");
            0.0
        };

        self.total_evaluations += 1;
        self.phase_iterations += 1;
        self.sub_phase_iterations += 1;

        // Suivi du meilleur score de la SubPhase et détection de plateau
        let previous_best = self.best_score;
        let significant = previous_best.map_or(true, |b| score > b + schedule.plateau_threshold);
        if previous_best.map_or(true, |b| score > b) {
            self.best_score = Some(score);
            self.best_vector = Some(current.to_vec());
        }
        if significant {
            self.plateau_counter = 0;
        } else if self.opt_phase != OptPhase::LockIn {
            self.plateau_counter += 1;
        }

        let settings = *schedule.settings(self.opt_phase);
        let lock_in_threshold = schedule.lock_in_threshold;
        let min_acceptable = self.config.locks.min_acceptable_score;
        let budget_exhausted = self.phase_iterations >= settings.iteration_budget;
        let best = self.best_score.unwrap_or(score);

        // 1. Optimum trouvé : on le préserve
        if score >= lock_in_threshold && self.opt_phase != OptPhase::LockIn {
            self.switch_opt_phase(OptPhase::LockIn);
            return ControllerDecision::Continue;
        }

        // 2. Fin du polissage
        if self.opt_phase == OptPhase::LockIn {
            if budget_exhausted || score >= settings.target_score {
                return self.complete_sub_phase(true);
            }
            return ControllerDecision::Continue;
        }

        // 3. Plateau
        if let Some(patience) = settings.plateau_patience {
            if self.plateau_counter > patience {
                if self.opt_phase == OptPhase::PlateauEscape {
                    return self.complete_sub_phase(best >= min_acceptable);
                }
                self.switch_opt_phase(OptPhase::PlateauEscape);
                return ControllerDecision::Continue;
            }
        }

        // 4. Cible de la phase atteinte
        if score >= settings.target_score {
            return match self.opt_phase {
                OptPhase::Exploration => {
                    self.switch_opt_phase(OptPhase::Refinement);
                    ControllerDecision::Continue
                }
                OptPhase::Refinement if best >= lock_in_threshold => {
                    self.switch_opt_phase(OptPhase::LockIn);
                    ControllerDecision::Continue
                }
                OptPhase::Refinement => self.complete_sub_phase(best >= min_acceptable),
                OptPhase::PlateauEscape => {
                    self.switch_opt_phase(OptPhase::LockIn);
                    ControllerDecision::Continue
                }
                OptPhase::LockIn => ControllerDecision::Continue,
            };
        }

        // 5. Budget épuisé sans déclencheur : escalade forcée
        if budget_exhausted {
            return match self.opt_phase {
                OptPhase::Exploration => {
                    self.switch_opt_phase(OptPhase::Refinement);
                    ControllerDecision::Continue
                }
                OptPhase::Refinement if best >= min_acceptable => self.complete_sub_phase(true),
                OptPhase::Refinement => {
                    self.switch_opt_phase(OptPhase::PlateauEscape);
                    ControllerDecision::Continue
                }
                OptPhase::PlateauEscape => self.complete_sub_phase(best >= min_acceptable),
                OptPhase::LockIn => ControllerDecision::Continue,
            };
        }

        ControllerDecision::Continue
    }

    /// Vide la file des notifications.
    pub fn take_events(&mut self) -> Vec<PhaseEvent> {
        std::mem::take(&mut self.events)
    }

    /// Retour à l'état initial ; seul moyen de lever les verrous.
    pub fn reset(&mut self) {
        self.locks.clear_all();
        self.main_phase = MainPhase::Foundation;
        self.sub_phase = self
            .main_phase
            .sub_phases()
            .first()
            .copied()
            .unwrap_or(SubPhase::FaceWidth);
        self.opt_phase = OptPhase::Exploration;
        self.total_evaluations = 0;
        self.completed = false;
        self.events.clear();
        self.reset_sub_phase_tracking();
    }

    pub fn main_phase(&self) -> MainPhase {
        self.main_phase
    }

    pub fn sub_phase(&self) -> SubPhase {
        self.sub_phase
    }

    pub fn opt_phase(&self) -> OptPhase {
        self.opt_phase
    }

    pub fn active_indices(&self) -> &[usize] {
        self.config.groups.indices(self.sub_phase)
    }

    pub fn sigma_scale(&self) -> f32 {
        self.config.schedule.settings(self.opt_phase).sigma_scale
    }

    pub fn best_score(&self) -> Option<f32> {
        self.best_score
    }

    pub fn best_vector(&self) -> Option<&[f32]> {
        self.best_vector.as_deref()
    }

    pub fn lock_manager(&self) -> &MorphLockManager {
        &self.locks
    }

    pub fn total_evaluations(&self) -> usize {
        self.total_evaluations
    }

    pub fn sub_phase_iterations(&self) -> usize {
        self.sub_phase_iterations
    }

    pub fn is_complete(&self) -> bool {
        self.completed
    }

    pub fn config(&self) -> &Arc<EngineConfig> {
        &self.config
    }

    // --- Helpers ---

    fn switch_opt_phase(&mut self, next: OptPhase) {
        let from = self.opt_phase;
        if !from.can_transition_to(next) {
            warn!(%from, to = %next, "Transition d'OptPhase refusée");
            return;
        }
        info!(
            sub_phase = %self.sub_phase,
            %from,
            to = %next,
            best = self.best_score.unwrap_or_default(),
            "🔁 Changement d'OptPhase"
        );
        self.opt_phase = next;
        self.phase_iterations = 0;
        self.plateau_counter = 0;
        self.events.push(PhaseEvent::OptPhaseChanged {
            sub_phase: self.sub_phase,
            from,
            to: next,
        });
    }

    /// Clôt la SubPhase (verrouillage optionnel) et avance dans le plan.
    fn complete_sub_phase(&mut self, lock: bool) -> ControllerDecision {
        let best_score = self.best_score.unwrap_or_default();
        let mut locked = false;

        if lock {
            if let Some(vector) = self.best_vector.clone() {
                let indices = self.config.groups.indices(self.sub_phase).to_vec();
                for index in indices {
                    let Some(&value) = vector.get(index) else {
                        continue;
                    };
                    match self.locks.lock_with_score(index, value, best_score) {
                        Ok(()) => locked = true,
                        Err(e) => warn!(index, error = %e, "Verrouillage impossible"),
                    }
                }
            }
        }

        if locked {
            info!(
                sub_phase = %self.sub_phase,
                score = best_score,
                iterations = self.sub_phase_iterations,
                "✅ SubPhase verrouillée"
            );
        } else {
            info!(
                sub_phase = %self.sub_phase,
                score = best_score,
                "⏭️ SubPhase acceptée sans verrou"
            );
        }

        self.events.push(PhaseEvent::SubPhaseCompleted {
            sub_phase: self.sub_phase,
            main_phase: self.main_phase,
            best_score,
            best_vector: self.best_vector.clone(),
            locked,
            iterations: self.sub_phase_iterations,
        });

        self.advance()
    }

    fn advance(&mut self) -> ControllerDecision {
        self.reset_sub_phase_tracking();
        self.opt_phase = OptPhase::Exploration;

        let siblings = self.main_phase.sub_phases();
        let position = siblings.iter().position(|&s| s == self.sub_phase);
        if let Some(next) = position.and_then(|p| siblings.get(p + 1)) {
            self.sub_phase = *next;
            debug!(sub_phase = %self.sub_phase, "SubPhase suivante");
            return ControllerDecision::Continue;
        }

        info!(main_phase = %self.main_phase, "🏁 MainPhase terminée");
        self.events.push(PhaseEvent::MainPhaseCompleted {
            main_phase: self.main_phase,
        });

        match self
            .main_phase
            .next()
            .and_then(|m| m.sub_phases().first().map(|&s| (m, s)))
        {
            Some((main, sub)) => {
                self.main_phase = main;
                self.sub_phase = sub;
                ControllerDecision::Continue
            }
            None => {
                self.completed = true;
                info!(evaluations = self.total_evaluations, "🏁 Optimisation terminée");
                self.events.push(PhaseEvent::SessionCompleted {
                    evaluations: self.total_evaluations,
                });
                ControllerDecision::Complete
            }
        }
    }

    fn reset_sub_phase_tracking(&mut self) {
        self.phase_iterations = 0;
        self.sub_phase_iterations = 0;
        self.plateau_counter = 0;
        self.best_score = None;
        self.best_vector = None;
    }
}
