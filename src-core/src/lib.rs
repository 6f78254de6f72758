// FICHIER : src-core/src/lib.rs

pub mod morphing;
pub mod utils;
