// FICHIER : src-core/src/morphing/groups.rs

use crate::morphing::features::Feature;
use crate::morphing::phases::SubPhase;
use crate::utils::prelude::*;

pub const MIN_ACTIVE_INDICES: usize = 3;
pub const MAX_ACTIVE_INDICES: usize = 12;
/// Un même index ne peut appartenir qu'à deux SubPhases au plus.
pub const MAX_OWNERS_PER_INDEX: usize = 2;

/// Configuration d'une SubPhase : morphs libres pendant qu'elle est active et
/// mesures servant à la noter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubPhaseGroup {
    pub sub_phase: SubPhase,
    pub indices: Vec<usize>,
    pub measurements: Vec<Feature>,
}

/// Tables SubPhase → index actifs / mesures.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MorphGroups {
    groups: Vec<SubPhaseGroup>,
}

impl Default for MorphGroups {
    fn default() -> Self {
        use Feature::*;
        use SubPhase as S;

        let table: Vec<(SubPhase, Vec<usize>, Vec<Feature>)> = vec![
            (S::FaceWidth, vec![0, 7, 9, 4], vec![UpperFaceWidth, MidFaceWidth, LowerFaceWidth]),
            (
                S::FaceHeight,
                vec![3, 2, 16, 12],
                vec![FaceRatio, UpperThird, MiddleThird, LowerThird],
            ),
            (
                S::FaceShape,
                vec![5, 1, 17, 19, 15],
                vec![FaceRatio, FaceTaper, JawTaper, JawCurvature, ChinPointedness, CheekWidth],
            ),
            (S::Forehead, vec![12, 13, 14, 38], vec![ForeheadWidth, ForeheadHeight, UpperThird]),
            (
                S::Jaw,
                vec![15, 16, 17, 18, 19],
                vec![JawWidth, JawTaper, JawAngle, JawCurvature, JawHeight],
            ),
            (S::Chin, vec![20, 21, 22, 23, 18], vec![ChinWidth, ChinHeight, ChinPointedness]),
            (
                S::Cheeks,
                vec![8, 9, 10, 11, 4],
                vec![CheekWidth, CheekboneHeight, CheekFullness, MidFaceWidth],
            ),
            (
                S::Nose,
                (43..=51).collect(),
                vec![NoseLength, NoseWidth, NoseTipWidth, NoseTipPosition],
            ),
            (
                S::Eyes,
                (27..=37).collect(),
                vec![EyeWidth, EyeOpenness, EyeDistance, EyeTilt, EyeVerticalPosition, EyeSize],
            ),
            (
                S::Mouth,
                (52..=59).collect(),
                vec![
                    MouthWidth,
                    UpperLipThickness,
                    LowerLipThickness,
                    MouthCornerTilt,
                    MouthPosition,
                    LipRatio,
                ],
            ),
            (
                S::Eyebrows,
                (38..=42).collect(),
                vec![EyebrowHeight, EyebrowLength, EyebrowArch, EyebrowTilt, EyebrowGap],
            ),
            // Les oreilles (24-26) n'ont pas de landmark frontal : rattachées ici
            (
                S::FineDetails,
                vec![6, 24, 25, 26, 60, 61, 5],
                vec![Symmetry, LipRatio, EyeTilt, JawCurvature],
            ),
        ];

        Self {
            groups: table
                .into_iter()
                .map(|(sub_phase, indices, measurements)| SubPhaseGroup {
                    sub_phase,
                    indices,
                    measurements,
                })
                .collect(),
        }
    }
}

impl MorphGroups {
    pub fn from_groups(groups: Vec<SubPhaseGroup>) -> Self {
        Self { groups }
    }

    pub fn group(&self, sub_phase: SubPhase) -> Option<&SubPhaseGroup> {
        self.groups.iter().find(|g| g.sub_phase == sub_phase)
    }

    pub fn indices(&self, sub_phase: SubPhase) -> &[usize] {
        self.group(sub_phase).map(|g| g.indices.as_slice()).unwrap_or(&[])
    }

    pub fn measurements(&self, sub_phase: SubPhase) -> &[Feature] {
        self.group(sub_phase)
            .map(|g| g.measurements.as_slice())
            .unwrap_or(&[])
    }

    /// SubPhases qui libèrent `index`, dans l'ordre de visite.
    pub fn owners(&self, index: usize) -> Vec<SubPhase> {
        SubPhase::ALL
            .iter()
            .copied()
            .filter(|&s| self.indices(s).contains(&index))
            .collect()
    }

    pub fn groups(&self) -> &[SubPhaseGroup] {
        &self.groups
    }

    /// Contrôles de démarrage : toute incohérence est une erreur de configuration.
    pub fn validate(&self, morph_count: usize) -> Result<()> {
        for sub_phase in SubPhase::ALL {
            let matching = self.groups.iter().filter(|g| g.sub_phase == sub_phase).count();
            if matching != 1 {
                return Err(AppError::config(format!(
                    "SubPhase {} configurée {} fois (attendu : 1)",
                    sub_phase, matching
                )));
            }
        }

        for group in &self.groups {
            let n = group.indices.len();
            if !(MIN_ACTIVE_INDICES..=MAX_ACTIVE_INDICES).contains(&n) {
                return Err(AppError::config(format!(
                    "SubPhase {} : {} index actifs (attendu {}..={})",
                    group.sub_phase, n, MIN_ACTIVE_INDICES, MAX_ACTIVE_INDICES
                )));
            }
            if group.measurements.is_empty() {
                return Err(AppError::config(format!(
                    "SubPhase {} sans mesure",
                    group.sub_phase
                )));
            }
            if let Some(&bad) = group.indices.iter().find(|&&i| i >= morph_count) {
                return Err(AppError::config(format!(
                    "SubPhase {} : index {} hors du vecteur ({} morphs)",
                    group.sub_phase, bad, morph_count
                )));
            }
            let mut sorted = group.indices.clone();
            sorted.sort_unstable();
            sorted.dedup();
            if sorted.len() != n {
                return Err(AppError::config(format!(
                    "SubPhase {} : index dupliqué",
                    group.sub_phase
                )));
            }
        }

        for index in 0..morph_count {
            let owners = self.owners(index);
            if owners.is_empty() {
                return Err(AppError::config(format!(
                    "index {} rattaché à aucune SubPhase",
                    index
                )));
            }
            if owners.len() > MAX_OWNERS_PER_INDEX {
                return Err(AppError::config(format!(
                    "index {} partagé par {} SubPhases ({:?})",
                    index,
                    owners.len(),
                    owners
                )));
            }
        }
        Ok(())
    }
}
