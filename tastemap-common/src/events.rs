//! Event types for the tastemap event system
//!
//! The session publishes one event per observable change so a presentation
//! layer can re-render without computing anything itself.

use crate::catalog::{Bounds, TastePoint};
use crate::mapper::SliderPair;
use crate::ranking::RankingEntry;
use crate::scan::ScanState;
use crate::target::TargetSource;
use crate::viewport::Viewport;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Tastemap event types
///
/// Serialisable so a front end bridge can forward them as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TasteEvent {
    /// Catalog snapshot installed
    CatalogLoaded {
        /// Items in the snapshot
        items: usize,
        /// Records excluded during loading
        skipped: usize,
        bounds: Bounds,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Target (and the derived slider pair) overwritten
    TargetChanged {
        source: TargetSource,
        target: TastePoint,
        sliders: SliderPair,
        /// Target revision after the change
        revision: u64,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Ranking recomputed for a target revision
    RankingUpdated {
        revision: u64,
        entries: Vec<RankingEntry>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// A rating was set
    RatingChanged {
        item_id: String,
        rating: u8,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Scan state machine transition
    ScanStateChanged {
        old_state: ScanState,
        new_state: ScanState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Decoded code matched a catalog item; the target moved there
    ScanMatched {
        session_id: Uuid,
        code: String,
        item_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Decoded code matched nothing; target unchanged
    ScanNoMatch {
        session_id: Uuid,
        code: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Camera/decoder error or cancelled scan; target unchanged
    CaptureFailed {
        session_id: Uuid,
        reason: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Chart zoom changed
    ZoomChanged {
        level: f64,
        viewport: Viewport,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl TasteEvent {
    /// Serde tag, handy for log fields
    pub fn event_type(&self) -> &'static str {
        match self {
            TasteEvent::CatalogLoaded { .. } => "CatalogLoaded",
            TasteEvent::TargetChanged { .. } => "TargetChanged",
            TasteEvent::RankingUpdated { .. } => "RankingUpdated",
            TasteEvent::RatingChanged { .. } => "RatingChanged",
            TasteEvent::ScanStateChanged { .. } => "ScanStateChanged",
            TasteEvent::ScanMatched { .. } => "ScanMatched",
            TasteEvent::ScanNoMatch { .. } => "ScanNoMatch",
            TasteEvent::CaptureFailed { .. } => "CaptureFailed",
            TasteEvent::ZoomChanged { .. } => "ZoomChanged",
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Fan-out of session events to presentation subscribers
///
/// Publishing never blocks the session; a subscriber that falls behind by more
/// than `capacity` events sees `RecvError::Lagged`.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<TasteEvent>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<TasteEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: TasteEvent,
    ) -> Result<usize, broadcast::error::SendError<TasteEvent>> {
        self.tx.send(event)
    }

    /// Emit without caring whether anyone listens
    pub fn emit_lossy(&self, event: TasteEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
