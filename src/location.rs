//! Live Location Watch
//!
//! A bounded channel of position fixes bound to one waypoint, with a
//! cancellation token. Producers never block: when the channel is full the
//! fix is dropped, and after cancellation nothing is delivered.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::domain::{Coordinates, LocalId};

/// Fixes less precise than this raise a warning
pub const LOW_ACCURACY_THRESHOLD_M: f64 = 100.0;

/// Queue depth between the position source and the controller
pub const DEFAULT_WATCH_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationFix {
    pub coordinates: Coordinates,
    /// Radius of uncertainty in meters, when the source reports one
    pub accuracy_m: Option<f64>,
}

impl LocationFix {
    pub fn new(coordinates: Coordinates, accuracy_m: Option<f64>) -> Self {
        Self {
            coordinates,
            accuracy_m: accuracy_m.filter(|a| a.is_finite()),
        }
    }

    /// `Accuracy: 12m`, or `Accuracy: N/A` when unknown
    pub fn accuracy_note(&self) -> String {
        match self.accuracy_m.filter(|a| *a > 0.0) {
            Some(accuracy) => format!("Accuracy: {}m", accuracy.round()),
            None => "Accuracy: N/A".to_string(),
        }
    }

    pub fn is_low_accuracy(&self) -> bool {
        self.accuracy_m
            .map(|a| a > LOW_ACCURACY_THRESHOLD_M)
            .unwrap_or(false)
    }
}

/// Create a watch bound to `target` plus the feed its position source
/// pushes into.
pub fn location_watch(target: LocalId, capacity: usize) -> (LocationWatch, LocationFeed) {
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let token = CancellationToken::new();
    (
        LocationWatch {
            target,
            receiver,
            token: token.clone(),
        },
        LocationFeed { sender, token },
    )
}

/// Consumer half, owned by the controller
#[derive(Debug)]
pub struct LocationWatch {
    target: LocalId,
    receiver: mpsc::Receiver<LocationFix>,
    token: CancellationToken,
}

impl LocationWatch {
    pub fn target(&self) -> &LocalId {
        &self.target
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait for the next fix; `None` once cancelled or the feed is gone
    pub async fn next_fix(&mut self) -> Option<LocationFix> {
        if self.token.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.token.cancelled() => None,
            fix = self.receiver.recv() => fix,
        }
    }

    /// Next queued fix without waiting
    pub fn try_next_fix(&mut self) -> Option<LocationFix> {
        if self.token.is_cancelled() {
            return None;
        }
        self.receiver.try_recv().ok()
    }
}

impl Drop for LocationWatch {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Producer half, handed to the position source
#[derive(Debug, Clone)]
pub struct LocationFeed {
    sender: mpsc::Sender<LocationFix>,
    token: CancellationToken,
}

impl LocationFeed {
    /// Queue a fix. Returns `false` when it was dropped.
    pub fn push(&self, fix: LocationFix) -> bool {
        if self.token.is_cancelled() {
            return false;
        }
        self.sender.try_send(fix).is_ok()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves when the watch is cancelled; lets a source stop polling
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}
