//! The prompt -> upload -> result flow.
//!
//! All mutation goes through [`Wizard::dispatch`]. Work that has to happen
//! outside the UI thread is returned as an [`Effect`] for the caller to run.

use std::fmt;

use crate::error::ValidationError;
use crate::model::{AnalysisOutcome, FileHandle, Step, WizardState};
use crate::progress::COMPLETE;
use crate::validation;

/// Shown when a failed run carries no message of its own
pub const DEFAULT_FAILURE_MESSAGE: &str = "An error occurred during processing";

/// Identity of one analysis run, used to drop events from abandoned runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RunId(u64);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "run-{}", self.0)
    }
}

/// User intents and analysis notifications
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SubmitPrompt(String),
    SelectFile(FileHandle),
    Submit,
    Back,
    Reset,
    AnalysisProgress { run: RunId, progress: f32 },
    AnalysisComplete { run: RunId, outcome: AnalysisOutcome },
}

/// Everything an analysis run needs
#[derive(Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub run: RunId,
    pub file: FileHandle,
    pub prompt: String,
}

/// Side effect requested by a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    None,
    StartRun(RunRequest),
}

#[derive(Debug, Default)]
pub struct Wizard {
    state: WizardState,
    active_run: Option<RunId>,
    // Survives reset so ids never repeat within one wizard
    runs_started: u64,
}

impl Wizard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &WizardState {
        &self.state
    }

    pub fn active_run(&self) -> Option<RunId> {
        self.active_run
    }

    pub fn dispatch(&mut self, event: Event) -> Effect {
        let step = self.state.step;
        match (step, event) {
            (Step::Prompt, Event::SubmitPrompt(text)) => {
                self.submit_prompt(text);
                Effect::None
            }
            (Step::Upload, Event::SelectFile(file)) => {
                self.select_file(file);
                Effect::None
            }
            (Step::Upload, Event::Submit) => self.start_run(),
            (Step::Upload, Event::Back) => {
                self.state.error = None;
                self.state.step = Step::Prompt;
                Effect::None
            }
            (Step::Result, Event::Back) => {
                if let Some(run) = self.active_run.take() {
                    tracing::info!(%run, "Leaving results, abandoning analysis run");
                }
                self.state.is_processing = false;
                self.state.step = Step::Upload;
                Effect::None
            }
            (_, Event::Reset) => {
                if let Some(run) = self.active_run.take() {
                    tracing::info!(%run, "Reset while analysis run in flight");
                }
                self.state = WizardState::default();
                Effect::None
            }
            (_, Event::AnalysisProgress { run, progress }) => {
                if self.accepts(run) {
                    // Never move backwards within a run
                    self.state.progress = progress.clamp(0.0, COMPLETE).max(self.state.progress);
                }
                Effect::None
            }
            (Step::Result, Event::AnalysisComplete { run, outcome }) => {
                if self.accepts(run) {
                    self.complete(run, outcome);
                }
                Effect::None
            }
            (step, event) => {
                tracing::debug!(?step, ?event, "Ignoring event not valid for current step");
                Effect::None
            }
        }
    }

    fn submit_prompt(&mut self, text: String) {
        if text.trim().is_empty() {
            self.state.error = Some(ValidationError::EmptyPrompt.to_string());
            return;
        }
        self.state.prompt = text;
        self.state.error = None;
        self.state.step = Step::Upload;
    }

    fn select_file(&mut self, file: FileHandle) {
        let verdict = validation::validate(&file);
        if verdict.valid {
            tracing::debug!(name = %file.name, size = file.size_bytes, "Video accepted");
            self.state.video_file = Some(file);
            self.state.error = None;
        } else {
            tracing::debug!(name = %file.name, error = ?verdict.error, "Video rejected");
            self.state.video_file = None;
            self.state.error = verdict.error;
        }
    }

    fn start_run(&mut self) -> Effect {
        let Some(file) = self.state.video_file.clone() else {
            self.state.error = Some(ValidationError::MissingFile.to_string());
            return Effect::None;
        };

        self.runs_started += 1;
        let run = RunId(self.runs_started);
        self.active_run = Some(run);

        self.state.step = Step::Result;
        self.state.is_processing = true;
        self.state.progress = 0.0;
        self.state.result = None;
        self.state.error = None;

        tracing::info!(%run, file = %file.name, "Starting analysis run");
        Effect::StartRun(RunRequest {
            run,
            file,
            prompt: self.state.prompt.clone(),
        })
    }

    fn complete(&mut self, run: RunId, outcome: AnalysisOutcome) {
        self.active_run = None;
        self.state.is_processing = false;
        self.state.result = if outcome.success {
            tracing::info!(%run, "Analysis finished");
            outcome.result_text
        } else {
            let message = outcome
                .error_message
                .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string());
            tracing::warn!(%run, error = %message, "Analysis failed");
            Some(format!("Error: {}", message))
        };
    }

    /// Only the active run may touch the state, and only while it is processing.
    fn accepts(&self, run: RunId) -> bool {
        let current = self.state.is_processing && self.active_run == Some(run);
        if !current {
            tracing::debug!(%run, active = ?self.active_run, "Discarding event from stale run");
        }
        current
    }
}
