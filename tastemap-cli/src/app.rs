//! Interactive driver loop
//!
//! Owns the [`TasteSession`] and serialises everything that mutates it:
//! command lines from the user and capture events from scanner backends.

use crate::capture::{read_line_lossy, ActiveScan};
use crate::commands::{Command, HELP};
use crate::render::{render_json, render_outcome, render_text};
use std::time::Duration;
use tastemap_common::scan::{CaptureEvent, CaptureHandle};
use tastemap_common::{Result, TasteSession};
use tokio::io::{AsyncBufRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// How views are printed after each change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Text,
    Json,
}

pub struct App<W> {
    session: TasteSession,
    capture_rx: mpsc::UnboundedReceiver<CaptureEvent>,
    active: watch::Sender<Option<CaptureHandle>>,
    out: W,
    mode: OutputMode,
    scan_timeout: Option<Duration>,
}

impl<W: AsyncWrite + Unpin> App<W> {
    pub fn new(
        session: TasteSession,
        capture_rx: mpsc::UnboundedReceiver<CaptureEvent>,
        out: W,
        mode: OutputMode,
    ) -> Self {
        let (active, _) = watch::channel(None);
        Self {
            session,
            capture_rx,
            active,
            out,
            mode,
            scan_timeout: None,
        }
    }

    /// Fail scans that have not produced a result after `timeout`
    pub fn with_scan_timeout(mut self, timeout: Duration) -> Self {
        self.scan_timeout = Some(timeout);
        self
    }

    pub fn session(&self) -> &TasteSession {
        &self.session
    }

    /// Receiver for scanner backends running beside the loop
    pub fn active_scan(&self) -> ActiveScan {
        self.active.subscribe()
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Process input until `quit` or end of input
    ///
    /// Capture events already queued are applied before the next command.
    /// Bytes that are not UTF-8 are replaced, so a garbled line is reported
    /// like any other unparseable command.
    pub async fn run<R: AsyncBufRead + Unpin>(&mut self, mut input: R) -> Result<()> {
        self.print_view().await?;
        let mut buf = Vec::new();

        loop {
            tokio::select! {
                biased;

                Some(event) = self.capture_rx.recv() => {
                    self.apply_capture(event).await?;
                }

                line = read_line_lossy(&mut input, &mut buf) => {
                    let Some(line) = line? else {
                        debug!("Input closed");
                        break;
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    if !self.execute(&line).await? {
                        break;
                    }
                }
            }
        }

        while let Ok(event) = self.capture_rx.try_recv() {
            self.apply_capture(event).await?;
        }
        info!("Session ended");
        Ok(())
    }

    /// Run one command line; `false` means quit
    pub async fn execute(&mut self, line: &str) -> Result<bool> {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(e) => {
                self.print(&e.to_string()).await?;
                return Ok(true);
            }
        };
        debug!(?command, "Command");

        match command {
            Command::Pick { x, y } => {
                self.session.pick_point(x, y);
                self.print_view().await?;
            }
            Command::Slider { body, sweetness } => {
                self.session.set_sliders(body, sweetness);
                self.print_view().await?;
            }
            Command::Scan => match self.session.start_scan() {
                Some(handle) => {
                    let session_id = handle.session_id();
                    if let Some(timeout) = self.scan_timeout {
                        let deadline = handle.clone();
                        tokio::spawn(async move {
                            tokio::time::sleep(timeout).await;
                            if deadline.failed("scan timed out") {
                                debug!(%session_id, "Scan deadline reached");
                            }
                        });
                    }
                    self.active.send_replace(Some(handle));
                    self.print(&format!("Scanning (session {})", session_id)).await?;
                }
                None => self.print("A scan is already in progress").await?,
            },
            Command::Decode(code) => {
                let handle = self.active.borrow().clone();
                match handle {
                    Some(handle) if !handle.is_closed() => {
                        handle.decoded(code);
                    }
                    _ => self.print("No scan in progress (use 'scan' first)").await?,
                }
            }
            Command::Stop => {
                self.active.send_replace(None);
                match self.session.stop_scan("cancelled by user") {
                    Some(condition) => self.print(&condition.to_string()).await?,
                    None => self.print("No scan in progress").await?,
                }
            }
            Command::Rate { id, rating } => {
                let stored = self.session.set_rating(&id, rating);
                self.print(&format!("{} rated {}", id.trim(), stored.label())).await?;
                self.print_view().await?;
            }
            Command::ZoomIn => {
                self.session.zoom_in();
                self.print_view().await?;
            }
            Command::ZoomOut => {
                self.session.zoom_out();
                self.print_view().await?;
            }
            Command::Show => self.print(&render_text(&self.session.view())).await?,
            Command::Json => self.print_json().await?,
            Command::Help => self.print(HELP).await?,
            Command::Quit => return Ok(false),
        }
        Ok(true)
    }

    async fn apply_capture(&mut self, event: CaptureEvent) -> Result<()> {
        let outcome = self.session.handle_capture(event);
        if !self.session.scan_state().is_scanning() {
            self.active.send_replace(None);
        }
        let Some(notice) = render_outcome(&outcome) else {
            return Ok(());
        };
        self.print(&notice).await?;
        match outcome.into_error() {
            Some(condition) => {
                debug!(error = %condition, transient = condition.is_transient(), "Scan ended without a match")
            }
            None => self.print_view().await?,
        }
        Ok(())
    }

    async fn print_view(&mut self) -> Result<()> {
        match self.mode {
            OutputMode::Text => {
                let text = render_text(&self.session.view());
                self.print(&text).await
            }
            OutputMode::Json => self.print_json().await,
        }
    }

    async fn print_json(&mut self) -> Result<()> {
        match render_json(&self.session.view()) {
            Ok(json) => self.print(&json).await,
            Err(e) => {
                warn!(error = %e, "Failed to serialize view");
                Ok(())
            }
        }
    }

    async fn print(&mut self, text: &str) -> Result<()> {
        self.out.write_all(text.as_bytes()).await?;
        if !text.ends_with('\n') {
            self.out.write_all(b"\n").await?;
        }
        self.out.flush().await?;
        Ok(())
    }
}
