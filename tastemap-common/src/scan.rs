//! Scan state machine
//!
//! Turns an asynchronous barcode/QR read into at most one target update per
//! scan session:
//!
//! ```text
//! Idle --start--> Scanning --decode--> Resolved --lookup--> Idle
//!                     |
//!                     +--cancel/error--> Idle
//! ```
//!
//! Capture backends are untrusted producers: some emit several decode
//! callbacks for one physical scan, possibly from different threads. Each
//! backend gets a [`CaptureHandle`] whose first terminal event (decode or
//! failure) wins through an atomic test-and-set on the session; everything
//! after is dropped before it reaches the machine. The machine itself also
//! refuses a second decode for the same session, and ignores events tagged
//! with a session that is no longer current.

use crate::catalog::{Catalog, Item};
use crate::error::Error;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// How decoded strings and catalog keys are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeNormalization {
    /// Trim surrounding whitespace only
    Trim,
    /// Trim, then drop every non-digit (hyphens, spaces, check-digit labels)
    #[default]
    Digits,
}

impl std::str::FromStr for CodeNormalization {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trim" => Ok(CodeNormalization::Trim),
            "digits" => Ok(CodeNormalization::Digits),
            other => Err(Error::InvalidInput(format!(
                "unknown code normalization '{}' (expected 'trim' or 'digits')",
                other
            ))),
        }
    }
}

pub fn normalize_code(raw: &str, mode: CodeNormalization) -> String {
    let trimmed = raw.trim();
    match mode {
        CodeNormalization::Trim => trimmed.to_string(),
        CodeNormalization::Digits => trimmed.chars().filter(|c| c.is_ascii_digit()).collect(),
    }
}

/// Keys made only of digits and separators (EAN/JAN style)
fn is_numeric_code(key: &str) -> bool {
    key.chars().any(|c| c.is_ascii_digit())
        && key.chars().all(|c| c.is_ascii_digit() || matches!(c, '-' | ' '))
}

/// Find the catalog item a decoded string refers to
///
/// In `Digits` mode only numeric catalog keys are compared digit-for-digit;
/// any other key (e.g. `SKU-1`) must equal the trimmed decoded string.
pub fn lookup<'a>(catalog: &'a Catalog, raw: &str, mode: CodeNormalization) -> Option<&'a Item> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let code = normalize_code(raw, mode);
    catalog.items().iter().find(|item| {
        let key = item.id.trim();
        match mode {
            CodeNormalization::Digits if is_numeric_code(key) => {
                !code.is_empty() && normalize_code(key, mode) == code
            }
            CodeNormalization::Digits | CodeNormalization::Trim => key == trimmed,
        }
    })
}

/// Scan state visible to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScanState {
    Idle,
    Scanning { session_id: Uuid },
    Resolved { session_id: Uuid, code: String },
}

impl ScanState {
    pub fn is_idle(&self) -> bool {
        matches!(self, ScanState::Idle)
    }

    pub fn is_scanning(&self) -> bool {
        matches!(self, ScanState::Scanning { .. })
    }

    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            ScanState::Idle => None,
            ScanState::Scanning { session_id } | ScanState::Resolved { session_id, .. } => {
                Some(*session_id)
            }
        }
    }
}

impl std::fmt::Display for ScanState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanState::Idle => write!(f, "idle"),
            ScanState::Scanning { .. } => write!(f, "scanning"),
            ScanState::Resolved { code, .. } => write!(f, "resolved ({})", code),
        }
    }
}

/// One user-initiated scan attempt
#[derive(Debug)]
pub struct ScanSession {
    id: Uuid,
    consumed: AtomicBool,
    started_at: DateTime<Utc>,
}

impl ScanSession {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            consumed: AtomicBool::new(false),
            started_at: Utc::now(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_consumed(&self) -> bool {
        self.consumed.load(Ordering::Acquire)
    }

    /// Test-and-set; exactly one caller per session gets `true`
    pub fn try_consume(&self) -> bool {
        self.consumed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Event pushed by a capture backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    Decoded { session_id: Uuid, code: String },
    Failed { session_id: Uuid, reason: String },
}

impl CaptureEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            CaptureEvent::Decoded { session_id, .. } | CaptureEvent::Failed { session_id, .. } => {
                *session_id
            }
        }
    }
}

/// Producer side handed to a capture backend for one scan session
///
/// Cheap to clone; every clone shares the session's consumed flag.
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    session: Arc<ScanSession>,
    tx: mpsc::UnboundedSender<CaptureEvent>,
}

impl CaptureHandle {
    pub fn session_id(&self) -> Uuid {
        self.session.id()
    }

    /// True once the session has produced its result or the consumer is gone
    pub fn is_closed(&self) -> bool {
        self.session.is_consumed() || self.tx.is_closed()
    }

    /// Report a decoded string; returns `false` if it was dropped
    pub fn decoded(&self, code: impl Into<String>) -> bool {
        let code = code.into();
        if !self.session.try_consume() {
            debug!(session_id = %self.session.id(), code = %code, "Ignoring repeated decode");
            return false;
        }
        self.send(CaptureEvent::Decoded {
            session_id: self.session.id(),
            code,
        })
    }

    /// Report a camera/decoder failure; returns `false` if it was dropped
    pub fn failed(&self, reason: impl Into<String>) -> bool {
        let reason = reason.into();
        if !self.session.try_consume() {
            debug!(session_id = %self.session.id(), reason = %reason, "Ignoring failure after result");
            return false;
        }
        self.send(CaptureEvent::Failed {
            session_id: self.session.id(),
            reason,
        })
    }

    fn send(&self, event: CaptureEvent) -> bool {
        if self.tx.send(event).is_err() {
            warn!(session_id = %self.session.id(), "Scan consumer is gone; capture event lost");
            return false;
        }
        true
    }
}

/// Result of a start request
#[derive(Debug)]
pub enum StartOutcome {
    Started(CaptureHandle),
    /// A session is already open; nothing changed
    AlreadyScanning(Uuid),
}

/// The state machine proper
#[derive(Debug)]
pub struct ScanMachine {
    state: ScanState,
    session: Option<Arc<ScanSession>>,
    tx: mpsc::UnboundedSender<CaptureEvent>,
}

impl ScanMachine {
    /// Create a machine and the receiver its capture handles feed
    pub fn new() -> (Self, mpsc::UnboundedReceiver<CaptureEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let machine = Self {
            state: ScanState::Idle,
            session: None,
            tx,
        };
        (machine, rx)
    }

    pub fn state(&self) -> &ScanState {
        &self.state
    }

    pub fn session(&self) -> Option<&Arc<ScanSession>> {
        self.session.as_ref()
    }

    /// Idle → Scanning; re-entrant calls never open a second session
    pub fn start(&mut self) -> StartOutcome {
        if let Some(session) = &self.session {
            debug!(session_id = %session.id(), "Scan already in progress; start ignored");
            return StartOutcome::AlreadyScanning(session.id());
        }

        let session = Arc::new(ScanSession::new());
        info!(session_id = %session.id(), "Scan session started");
        self.state = ScanState::Scanning {
            session_id: session.id(),
        };
        self.session = Some(Arc::clone(&session));

        StartOutcome::Started(CaptureHandle {
            session,
            tx: self.tx.clone(),
        })
    }

    /// Scanning → Resolved for the first decode of the current session
    ///
    /// Returns the accepted code, or `None` when the event is ignored (wrong
    /// session, not scanning, or already resolved).
    pub fn accept_decode(&mut self, session_id: Uuid, code: &str) -> Option<String> {
        let current = match (&self.state, &self.session) {
            (ScanState::Scanning { session_id: active }, Some(session)) if *active == session_id => {
                session
            }
            _ => {
                debug!(%session_id, code = %code, state = %self.state, "Decode ignored");
                return None;
            }
        };

        // Direct callers bypass the handle; close the session for any handle still out there
        current.consumed.store(true, Ordering::Release);

        self.state = ScanState::Resolved {
            session_id,
            code: code.to_string(),
        };
        Some(code.to_string())
    }

    /// Resolved → Idle once the lookup has been applied
    pub fn finish(&mut self) -> Option<String> {
        match std::mem::replace(&mut self.state, ScanState::Idle) {
            ScanState::Resolved { session_id, code } => {
                self.session = None;
                debug!(%session_id, code = %code, "Scan session finished");
                Some(code)
            }
            other => {
                self.state = other;
                None
            }
        }
    }

    /// Scanning → Idle on user cancel or capture error
    ///
    /// Returns the `CaptureFailed` condition to report, or `None` when there
    /// was nothing to cancel.
    pub fn cancel(&mut self, reason: &str) -> Option<Error> {
        let session_id = match &self.state {
            ScanState::Scanning { session_id } => *session_id,
            _ => return None,
        };
        self.fail(session_id, reason)
    }

    /// Scanning → Idle for a failure reported by the given session
    pub fn fail(&mut self, session_id: Uuid, reason: &str) -> Option<Error> {
        match &self.state {
            ScanState::Scanning { session_id: active } if *active == session_id => {}
            _ => {
                debug!(%session_id, reason = %reason, "Capture failure ignored");
                return None;
            }
        }

        if let Some(session) = self.session.take() {
            session.consumed.store(true, Ordering::Release);
        }
        self.state = ScanState::Idle;
        warn!(%session_id, reason = %reason, "Scan session failed");
        Some(Error::CaptureFailed(reason.to_string()))
    }
}
