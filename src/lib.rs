//! Video feedback wizard
//!
//! Three-step flow: describe what feedback you want, pick a video, read the
//! AI analysis. The UI lives in the binary; this library holds the flow, the
//! upload checks, progress estimation and the analysis backends.

// Analysis backends (HTTP service and offline simulation)
pub mod client;
// Application configuration file
pub mod config;
// Error types
pub mod error;
// Data model shared by the wizard and the screens
pub mod model;
// Progress estimation while a run is in flight
pub mod progress;
// Glue between one client call and the UI channel
pub mod run;
// Upload checks and size formatting
pub mod validation;
// The prompt -> upload -> result state machine
pub mod wizard;

// Re-exports
pub use config::AppConfig;
pub use model::{AnalysisOutcome, FileHandle, Step, WizardState};
pub use wizard::{Effect, Event, Wizard};
