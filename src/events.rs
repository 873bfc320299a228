//! Change notifications published to presentation collaborators.

use std::sync::Arc;
use std::sync::mpsc::Sender;

use parking_lot::Mutex;
use serde::Serialize;

use crate::model::{RoiId, ShapeId};
use crate::session::SessionState;
use crate::stats::{RequestId, StatsRecord};


#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CoreEvent {
    StateChanged {
        from: SessionState,
        to: SessionState,
    },
    RoisChanged {
        touched: Vec<RoiId>,
        deleted: Vec<RoiId>,
    },
    ShapesChanged {
        written: Vec<ShapeId>,
        removed: Vec<ShapeId>,
        moved: Vec<ShapeId>,
    },
    IndexLoaded {
        rois: Vec<RoiId>,
    },
    IndexReset,
    StatisticsInvalidated {
        shapes: Vec<ShapeId>,
    },
    StatisticsUpdated {
        request: RequestId,
        records: Vec<StatsRecord>,
    },
    StatisticsUnavailable {
        request: RequestId,
        shape: ShapeId,
        reason: String,
    },
    ChannelsChanged {
        active: Vec<usize>,
    },
}

/// Receives every event the session publishes, in order.
pub trait PresentationSink: Send {
    fn publish(&self, event: &CoreEvent);
}

impl<F> PresentationSink for F
where
    F: Fn(&CoreEvent) + Send,
{
    fn publish(&self, event: &CoreEvent) {
        self(event)
    }
}

/// Sink that keeps every event; clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Arc<Mutex<Vec<CoreEvent>>>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<CoreEvent> {
        self.events.lock().clone()
    }

    pub fn take(&self) -> Vec<CoreEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl PresentationSink for EventLog {
    fn publish(&self, event: &CoreEvent) {
        self.events.lock().push(event.clone());
    }
}

/// Forwards events to another thread. Events published after the receiver
/// hung up are dropped.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: Sender<CoreEvent>,
}

impl ChannelSink {
    pub fn new(sender: Sender<CoreEvent>) -> Self {
        Self { sender }
    }
}

impl PresentationSink for ChannelSink {
    fn publish(&self, event: &CoreEvent) {
        if self.sender.send(event.clone()).is_err() {
            tracing::trace!("presentation receiver disconnected");
        }
    }
}
