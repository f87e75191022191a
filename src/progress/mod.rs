//! Progress reporting - the observational side channel
//!
//! Steps emit short status lines, optional long-form detail, and the
//! added-or-modified delta after every store mutation so a UI can render
//! incremental progress. Nothing here is part of the store's correctness
//! contract; a dropped event is never an error.

use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::ScheduleItem;

/// Long-form progress detail
#[derive(Debug, Clone)]
pub struct LongStatus {
    pub title: String,
    pub description: String,
}

/// One progress emission
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Human-readable status, short and/or long form
    Status {
        short: Option<String>,
        long: Option<LongStatus>,
    },
    /// Items just added or modified by a store merge
    Delta { items: Vec<ScheduleItem> },
}

/// Cloneable sender handle. Send failures (receiver gone) are ignored.
#[derive(Clone)]
pub struct ProgressSink {
    tx: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ProgressSink {
    /// A sink wired to a channel, plus the receiving end.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// A sink that drops everything, for headless runs and tests.
    pub fn disabled() -> Self {
        Self { tx: None }
    }

    fn send(&self, event: ProgressEvent) {
        if let Some(tx) = &self.tx
            && tx.send(event).is_err()
        {
            debug!("send: progress receiver dropped");
        }
    }

    pub fn status(&self, short: impl Into<String>) {
        self.send(ProgressEvent::Status {
            short: Some(short.into()),
            long: None,
        });
    }

    pub fn long(&self, short: Option<String>, title: impl Into<String>, description: impl Into<String>) {
        self.send(ProgressEvent::Status {
            short,
            long: Some(LongStatus {
                title: title.into(),
                description: description.into(),
            }),
        });
    }

    pub fn delta(&self, items: &[ScheduleItem]) {
        if !items.is_empty() {
            self.send(ProgressEvent::Delta { items: items.to_vec() });
        }
    }
}
