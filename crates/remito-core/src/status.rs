//! Status events reported from pipeline workers to the status view.
//!
//! Long-running work (consent, refresh, upload) runs off the render loop and
//! reports completion through this channel, so the view never blocks on the
//! network.

use tokio::sync::mpsc;

/// Distinct-order counts per classification category, shown in the status
/// view after the Argentina filter runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterStats {
    pub caba: usize,
    pub pending_payment: usize,
    pub expired: usize,
    pub refunded: usize,
    pub review_notes: usize,
    pub review_dni: usize,
    pub unclassified: usize,
}

/// A progress or outcome report from the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusEvent {
    /// Pipeline advanced to a new stage.
    Progress { percent: u8, stage: String },
    /// Informational line for the user.
    Message(String),
    /// Classification statistics from the Argentina filter.
    Stats(FilterStats),
    /// The pipeline failed; the message is user-visible.
    Failed(String),
}

/// Sending half of the status channel.
///
/// Cheap to clone; sends never block and are silently dropped once the
/// receiving view has gone away.
#[derive(Debug, Clone)]
pub struct StatusSender(mpsc::UnboundedSender<StatusEvent>);

/// Create a status channel pair.
pub fn status_channel() -> (StatusSender, mpsc::UnboundedReceiver<StatusEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (StatusSender(tx), rx)
}

impl StatusSender {
    /// A sender with no receiver, for callers that do not render status.
    pub fn sink() -> Self {
        let (tx, _rx) = mpsc::unbounded_channel();
        Self(tx)
    }

    pub fn progress(&self, percent: u8, stage: impl Into<String>) {
        let _ = self.0.send(StatusEvent::Progress {
            percent,
            stage: stage.into(),
        });
    }

    pub fn message(&self, text: impl Into<String>) {
        let _ = self.0.send(StatusEvent::Message(text.into()));
    }

    pub fn stats(&self, stats: FilterStats) {
        let _ = self.0.send(StatusEvent::Stats(stats));
    }

    pub fn failed(&self, text: impl Into<String>) {
        let _ = self.0.send(StatusEvent::Failed(text.into()));
    }
}
