//! Taste session
//!
//! Wires catalog, target, ratings, scan machine and zoom together behind the
//! operations a front end calls. Every mutation is followed synchronously by
//! the events describing it; the ranking is recomputed from the current target
//! each time it is needed and never cached.

use crate::catalog::{Catalog, TastePoint};
use crate::config::TomlConfig;
use crate::error::Error;
use crate::events::{EventBus, TasteEvent};
use crate::mapper::SliderPair;
use crate::ranking::{rank, RankingEntry};
use crate::ratings::{RatedMarker, Rating, RatingStore};
use crate::scan::{lookup, CaptureEvent, CaptureHandle, CodeNormalization, ScanMachine, ScanState, StartOutcome};
use crate::target::{InitialTarget, TargetSource, TargetState};
use crate::viewport::{viewport, Viewport, Zoom, ZoomSettings};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

/// Session tunables
#[derive(Debug, Clone, PartialEq)]
pub struct SessionOptions {
    pub top_k: usize,
    pub initial_target: InitialTarget,
    pub normalization: CodeNormalization,
    pub zoom: ZoomSettings,
    pub event_capacity: usize,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&TomlConfig::default())
    }
}

impl From<&TomlConfig> for SessionOptions {
    fn from(config: &TomlConfig) -> Self {
        Self {
            top_k: config.top_k,
            initial_target: config.initial_target,
            normalization: config.code_normalization,
            zoom: config.zoom,
            event_capacity: 256,
        }
    }
}

/// How a capture event was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanOutcome {
    /// Target moved to the matched item
    Matched { code: String, item_id: String },
    /// Decoded, but nothing in the catalog carries the code
    NoMatch(String),
    /// Capture error or cancellation
    CaptureFailed(String),
    /// Duplicate, stale or out-of-state event
    Ignored,
}

impl ScanOutcome {
    /// The transient condition to report, if any
    pub fn into_error(self) -> Option<Error> {
        match self {
            ScanOutcome::NoMatch(code) => Some(Error::NoMatch(code)),
            ScanOutcome::CaptureFailed(reason) => Some(Error::CaptureFailed(reason)),
            ScanOutcome::Matched { .. } | ScanOutcome::Ignored => None,
        }
    }
}

/// Everything the presentation layer renders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionView {
    pub target: TastePoint,
    pub sliders: SliderPair,
    pub source: TargetSource,
    pub revision: u64,
    pub ranking: Vec<RankingEntry>,
    pub ratings: BTreeMap<String, u8>,
    pub rated: Vec<RatedMarker>,
    pub scan: ScanState,
    pub zoom: f64,
    pub viewport: Viewport,
}

pub struct TasteSession {
    catalog: Arc<Catalog>,
    target: TargetState,
    ratings: RatingStore,
    scan: ScanMachine,
    zoom: Zoom,
    options: SessionOptions,
    events: EventBus,
}

impl TasteSession {
    /// Start a session on a loaded catalog
    ///
    /// Also returns the receiver that capture handles feed; the driver loop
    /// passes what it receives to [`TasteSession::handle_capture`].
    pub fn new(
        catalog: Arc<Catalog>,
        options: SessionOptions,
    ) -> (Self, mpsc::UnboundedReceiver<CaptureEvent>) {
        let initial = options.initial_target.resolve(&catalog);
        let target = TargetState::new(initial, catalog.bounds());
        let (scan, capture_rx) = ScanMachine::new();
        let session = Self {
            catalog,
            target,
            ratings: RatingStore::new(),
            scan,
            zoom: Zoom::new(options.zoom),
            events: EventBus::new(options.event_capacity.max(1)),
            options,
        };
        (session, capture_rx)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn target(&self) -> TastePoint {
        self.target.target()
    }

    pub fn sliders(&self) -> SliderPair {
        self.target.sliders()
    }

    pub fn scan_state(&self) -> &ScanState {
        self.scan.state()
    }

    pub fn ratings(&self) -> &RatingStore {
        &self.ratings
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TasteEvent> {
        self.events.subscribe()
    }

    /// Announce the installed snapshot to subscribers
    pub fn announce_catalog(&self, skipped: usize) {
        info!(items = self.catalog.len(), skipped, "Catalog ready");
        self.events.emit_lossy(TasteEvent::CatalogLoaded {
            items: self.catalog.len(),
            skipped,
            bounds: self.catalog.bounds(),
            timestamp: Utc::now(),
        });
    }

    /// Current top-k list with ratings merged in
    pub fn ranking(&self) -> Vec<RankingEntry> {
        rank(self.target.target(), &self.catalog, self.options.top_k)
            .iter()
            .enumerate()
            .map(|(position, ranked)| {
                let rating = self.ratings.get_rating(&ranked.item.id).value();
                RankingEntry::new(position, ranked, rating)
            })
            .collect()
    }

    pub fn viewport(&self) -> Viewport {
        viewport(self.target.target(), &self.catalog.bounds(), self.zoom.level())
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            target: self.target.target(),
            sliders: self.target.sliders(),
            source: self.target.source(),
            revision: self.target.revision(),
            ranking: self.ranking(),
            ratings: self.ratings.snapshot(),
            rated: self.ratings.markers(&self.catalog),
            scan: self.scan.state().clone(),
            zoom: self.zoom.level(),
            viewport: self.viewport(),
        }
    }

    /// Direct pick on the chart
    pub fn pick_point(&mut self, x: f64, y: f64) -> TastePoint {
        let target = self.target.set_from_point(x, y);
        self.publish_target();
        target
    }

    pub fn set_sliders(&mut self, body: u8, sweetness: u8) -> TastePoint {
        let target = self.target.set_from_slider(body, sweetness);
        self.publish_target();
        target
    }

    pub fn set_rating(&mut self, item_id: &str, rating: i64) -> Rating {
        let stored = self.ratings.set_rating(item_id, rating);
        if self.catalog.get(item_id).is_none() {
            warn!(item_id = %item_id.trim(), "Rating stored for an item outside the catalog");
        }
        self.events.emit_lossy(TasteEvent::RatingChanged {
            item_id: item_id.trim().to_string(),
            rating: stored.value(),
            timestamp: Utc::now(),
        });
        self.publish_ranking();
        stored
    }

    pub fn zoom_in(&mut self) -> f64 {
        let level = self.zoom.zoom_in();
        self.publish_zoom();
        level
    }

    pub fn zoom_out(&mut self) -> f64 {
        let level = self.zoom.zoom_out();
        self.publish_zoom();
        level
    }

    /// Open a scan session
    ///
    /// Returns the handle for the capture backend, or `None` when a session is
    /// already open (the running session is left untouched).
    pub fn start_scan(&mut self) -> Option<CaptureHandle> {
        match self.scan.start() {
            StartOutcome::Started(handle) => {
                self.publish_scan_transition(ScanState::Idle);
                Some(handle)
            }
            StartOutcome::AlreadyScanning(_) => None,
        }
    }

    /// Cancel the open scan session, if any
    pub fn stop_scan(&mut self, reason: &str) -> Option<Error> {
        let old = self.scan.state().clone();
        let session_id = old.session_id()?;
        let condition = self.scan.cancel(reason)?;
        self.publish_scan_transition(old);
        self.events.emit_lossy(TasteEvent::CaptureFailed {
            session_id,
            reason: reason.to_string(),
            timestamp: Utc::now(),
        });
        Some(condition)
    }

    /// Apply one event from a capture backend
    pub fn handle_capture(&mut self, event: CaptureEvent) -> ScanOutcome {
        match event {
            CaptureEvent::Decoded { session_id, code } => self.resolve_decode(session_id, &code),
            CaptureEvent::Failed { session_id, reason } => {
                let old = self.scan.state().clone();
                if self.scan.fail(session_id, &reason).is_none() {
                    return ScanOutcome::Ignored;
                }
                self.publish_scan_transition(old);
                self.events.emit_lossy(TasteEvent::CaptureFailed {
                    session_id,
                    reason: reason.clone(),
                    timestamp: Utc::now(),
                });
                ScanOutcome::CaptureFailed(reason)
            }
        }
    }

    fn resolve_decode(&mut self, session_id: uuid::Uuid, raw: &str) -> ScanOutcome {
        let scanning = self.scan.state().clone();
        let code = match self.scan.accept_decode(session_id, raw) {
            Some(code) => code,
            None => return ScanOutcome::Ignored,
        };
        self.publish_scan_transition(scanning);

        let catalog = Arc::clone(&self.catalog);
        let matched = lookup(&catalog, &code, self.options.normalization);

        let outcome = match matched {
            Some(item) => {
                self.target.set_from_scan_match(item);
                info!(%session_id, code = %code, item_id = %item.id, "Scan matched");
                self.publish_target();
                self.events.emit_lossy(TasteEvent::ScanMatched {
                    session_id,
                    code: code.clone(),
                    item_id: item.id.clone(),
                    timestamp: Utc::now(),
                });
                ScanOutcome::Matched {
                    code,
                    item_id: item.id.clone(),
                }
            }
            None => {
                warn!(%session_id, code = %code, "Scanned code matches no catalog item");
                self.events.emit_lossy(TasteEvent::ScanNoMatch {
                    session_id,
                    code: code.clone(),
                    timestamp: Utc::now(),
                });
                ScanOutcome::NoMatch(code)
            }
        };

        let resolved = self.scan.state().clone();
        self.scan.finish();
        self.publish_scan_transition(resolved);
        outcome
    }

    fn publish_target(&self) {
        self.events.emit_lossy(TasteEvent::TargetChanged {
            source: self.target.source(),
            target: self.target.target(),
            sliders: self.target.sliders(),
            revision: self.target.revision(),
            timestamp: Utc::now(),
        });
        self.publish_ranking();
    }

    fn publish_ranking(&self) {
        self.events.emit_lossy(TasteEvent::RankingUpdated {
            revision: self.target.revision(),
            entries: self.ranking(),
            timestamp: Utc::now(),
        });
    }

    fn publish_scan_transition(&self, old_state: ScanState) {
        self.events.emit_lossy(TasteEvent::ScanStateChanged {
            old_state,
            new_state: self.scan.state().clone(),
            timestamp: Utc::now(),
        });
    }

    fn publish_zoom(&self) {
        self.events.emit_lossy(TasteEvent::ZoomChanged {
            level: self.zoom.level(),
            viewport: self.viewport(),
            timestamp: Utc::now(),
        });
    }
}
