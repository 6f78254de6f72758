// Déclaration des sous-modules situés dans le dossier /morphing_suite/
pub mod morphing_suite {
    pub mod config_test;
    pub mod pipeline_test;
    pub mod scoring_test;
}
