// src/config/mod.rs
pub mod settings;
pub mod sources;
pub mod summarizer;

pub use settings::MonitorSettings;
pub use sources::{load_sources_default, load_sources_from};
pub use summarizer::SummarizerOptions;
