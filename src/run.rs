//! One analysis run: a client call wrapped in a progress estimator.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::client::AnalysisClient;
use crate::model::AnalysisOutcome;
use crate::progress::{PhaseReporter, ProgressEstimator};
use crate::wizard::{Event, RunId, RunRequest};

/// Message sent from a run back to the UI thread
#[derive(Debug, Clone, PartialEq)]
pub enum RunMessage {
    Progress { run: RunId, value: f32 },
    Complete { run: RunId, outcome: AnalysisOutcome },
}

impl RunMessage {
    pub fn into_event(self) -> Event {
        match self {
            RunMessage::Progress { run, value } => Event::AnalysisProgress {
                run,
                progress: value,
            },
            RunMessage::Complete { run, outcome } => Event::AnalysisComplete { run, outcome },
        }
    }
}

/// Executes `request` and reports through `tx`.
///
/// Every progress message is sent before the single completion message.
/// A closed receiver is not an error: the wizard may have been closed.
pub async fn execute(
    client: Arc<dyn AnalysisClient>,
    estimator: ProgressEstimator,
    request: RunRequest,
    tx: UnboundedSender<RunMessage>,
) {
    let RunRequest { run, file, prompt } = request;
    let (reporter, phases) = PhaseReporter::channel();
    let policy = estimator.policy();
    tracing::debug!(%run, ?policy, "Analysis run started");

    let work = client.submit(&file, &prompt, &reporter);
    let progress_tx = tx.clone();
    let outcome = estimator
        .track(work, phases, move |value| {
            let _ = progress_tx.send(RunMessage::Progress { run, value });
        })
        .await;

    tracing::debug!(%run, success = outcome.success, "Analysis run finished");
    let _ = tx.send(RunMessage::Complete { run, outcome });
}
