//! Captioner - resumable caption, burn and trim pipeline
//!
//! Each audio clip is identified by a hash of its content. Progress through the three
//! external stages is stored per clip, so a rerun only does the work that is still missing.

pub mod batch;
pub mod cli;
pub mod clip;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod pipeline;
pub mod prompt;
pub mod report;
pub mod stage;
pub mod store;
