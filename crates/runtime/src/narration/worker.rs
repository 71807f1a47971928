//! Background task that calls the narrator off the flow's loop.
//!
//! The worker receives [`NarrationJob`]s, runs each narrator call under a
//! bounded timeout and posts a [`NarrationReply`] carrying the job's ticket
//! back to the host. It never touches the session; staleness is decided by
//! the flow when the reply arrives.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::narrator::Narrator;
use super::types::{NarrationFailure, NarrationJob, NarrationReply, NarrationRequest};

pub struct NarrationWorker {
    narrator: Arc<dyn Narrator>,
    timeout: Duration,
    jobs: mpsc::Receiver<NarrationJob>,
    replies: mpsc::Sender<NarrationReply>,
}

impl NarrationWorker {
    pub fn new(
        narrator: Arc<dyn Narrator>,
        timeout: Duration,
        jobs: mpsc::Receiver<NarrationJob>,
        replies: mpsc::Sender<NarrationReply>,
    ) -> Self {
        Self {
            narrator,
            timeout,
            jobs,
            replies,
        }
    }

    /// Main worker loop; ends when either channel closes.
    pub async fn run(mut self) {
        while let Some(job) = self.jobs.recv().await {
            let reply = self.handle(job).await;
            if self.replies.send(reply).await.is_err() {
                debug!(target: "combat::narration", "reply channel closed, narration worker stopping");
                break;
            }
        }
    }

    async fn handle(&self, job: NarrationJob) -> NarrationReply {
        let call = async {
            match &job.request {
                NarrationRequest::Attempt(request) => self.narrator.narrate_attempt(request).await,
                NarrationRequest::Outcome(request) => self.narrator.narrate_outcome(request).await,
            }
        };

        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(err)) => {
                warn!(target: "combat::narration", ticket = ?job.ticket, error = %err, "narrator failed");
                Err(NarrationFailure::Adapter(err.to_string()))
            }
            Err(_) => {
                warn!(target: "combat::narration", ticket = ?job.ticket, timeout = ?self.timeout, "narrator timed out");
                Err(NarrationFailure::TimedOut(self.timeout))
            }
        };

        NarrationReply {
            ticket: job.ticket,
            result,
        }
    }
}
