// FICHIER : src-core/src/morphing/phases.rs

use crate::utils::prelude::*;
use std::fmt;

/// Grandes étapes de l'optimisation, traitées strictement dans cet ordre.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MainPhase {
    Foundation,
    Structure,
    MajorFeatures,
    FineDetails,
}

impl MainPhase {
    pub const ORDER: [MainPhase; 4] = [
        MainPhase::Foundation,
        MainPhase::Structure,
        MainPhase::MajorFeatures,
        MainPhase::FineDetails,
    ];

    /// SubPhases de cette MainPhase, dans l'ordre de visite.
    pub fn sub_phases(self) -> &'static [SubPhase] {
        match self {
            MainPhase::Foundation => &[SubPhase::FaceWidth, SubPhase::FaceHeight, SubPhase::FaceShape],
            MainPhase::Structure => &[
                SubPhase::Forehead,
                SubPhase::Jaw,
                SubPhase::Chin,
                SubPhase::Cheeks,
            ],
            MainPhase::MajorFeatures => &[
                SubPhase::Nose,
                SubPhase::Eyes,
                SubPhase::Mouth,
                SubPhase::Eyebrows,
            ],
            MainPhase::FineDetails => &[SubPhase::FineDetails],
        }
    }

    pub fn next(self) -> Option<MainPhase> {
        match self {
            MainPhase::Foundation => Some(MainPhase::Structure),
            MainPhase::Structure => Some(MainPhase::MajorFeatures),
            MainPhase::MajorFeatures => Some(MainPhase::FineDetails),
            MainPhase::FineDetails => None,
        }
    }
}

impl fmt::Display for MainPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MainPhase::Foundation => "Foundation",
            MainPhase::Structure => "Structure",
            MainPhase::MajorFeatures => "MajorFeatures",
            MainPhase::FineDetails => "FineDetails",
        };
        f.write_str(label)
    }
}

/// Regroupement sémantique des morphs et des mesures.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SubPhase {
    FaceWidth,
    FaceHeight,
    FaceShape,
    Forehead,
    Jaw,
    Chin,
    Cheeks,
    Nose,
    Eyes,
    Mouth,
    Eyebrows,
    FineDetails,
}

impl SubPhase {
    /// Ordre global de visite (MainPhase par MainPhase).
    pub const ALL: [SubPhase; 12] = [
        SubPhase::FaceWidth,
        SubPhase::FaceHeight,
        SubPhase::FaceShape,
        SubPhase::Forehead,
        SubPhase::Jaw,
        SubPhase::Chin,
        SubPhase::Cheeks,
        SubPhase::Nose,
        SubPhase::Eyes,
        SubPhase::Mouth,
        SubPhase::Eyebrows,
        SubPhase::FineDetails,
    ];

    pub fn main_phase(self) -> MainPhase {
        match self {
            SubPhase::FaceWidth | SubPhase::FaceHeight | SubPhase::FaceShape => {
                MainPhase::Foundation
            }
            SubPhase::Forehead | SubPhase::Jaw | SubPhase::Chin | SubPhase::Cheeks => {
                MainPhase::Structure
            }
            SubPhase::Nose | SubPhase::Eyes | SubPhase::Mouth | SubPhase::Eyebrows => {
                MainPhase::MajorFeatures
            }
            SubPhase::FineDetails => MainPhase::FineDetails,
        }
    }
}

impl fmt::Display for SubPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Échelle d'agressivité à l'intérieur d'une SubPhase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum OptPhase {
    Exploration,
    Refinement,
    PlateauEscape,
    LockIn,
}

impl OptPhase {
    pub const ALL: [OptPhase; 4] = [
        OptPhase::Exploration,
        OptPhase::Refinement,
        OptPhase::PlateauEscape,
        OptPhase::LockIn,
    ];

    /// Transitions autorisées : monotones, PlateauEscape n'est accessible que
    /// depuis Exploration ou Refinement et ne repart que vers LockIn.
    pub fn can_transition_to(self, next: OptPhase) -> bool {
        matches!(
            (self, next),
            (OptPhase::Exploration, OptPhase::Refinement)
                | (OptPhase::Exploration, OptPhase::PlateauEscape)
                | (OptPhase::Exploration, OptPhase::LockIn)
                | (OptPhase::Refinement, OptPhase::PlateauEscape)
                | (OptPhase::Refinement, OptPhase::LockIn)
                | (OptPhase::PlateauEscape, OptPhase::LockIn)
        )
    }
}

impl fmt::Display for OptPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
