//! Line-oriented capture backend
//!
//! Hardware barcode scanners usually present themselves as a keyboard or a
//! serial device that emits one decoded code per line. [`LineSource`] reads
//! such a stream (a device node, FIFO, file or any `AsyncRead`) and
//! [`run_capture`] hands every decoded line to whichever scan session is open.

use async_trait::async_trait;
use std::path::Path;
use tastemap_common::scan::CaptureHandle;
use tastemap_common::{Error, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Producer of decoded strings
#[async_trait]
pub trait DecodeSource: Send {
    /// Next decoded string, `Ok(None)` once the stream has ended
    async fn next_decoded(&mut self) -> Result<Option<String>>;
}

/// Read one line, replacing invalid UTF-8 with U+FFFD
///
/// `Ok(None)` at end of input. Partially read bytes stay in `buf` when the
/// future is dropped, so the call can be raced in `tokio::select!`.
pub async fn read_line_lossy<R: AsyncBufRead + Unpin>(
    reader: &mut R,
    buf: &mut Vec<u8>,
) -> std::io::Result<Option<String>> {
    let read = reader.read_until(b'\n', buf).await?;
    if read == 0 && buf.is_empty() {
        return Ok(None);
    }
    let line = String::from_utf8_lossy(&buf[..])
        .trim_end_matches(|c: char| c == '\n' || c == '\r')
        .to_string();
    buf.clear();
    Ok(Some(line))
}

pub struct LineSource<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin + Send> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
        }
    }
}

impl LineSource<tokio::fs::File> {
    /// Open a scanner device or FIFO
    pub async fn open(path: &Path) -> Result<Self> {
        let file = tokio::fs::File::open(path)
            .await
            .map_err(|e| Error::CaptureFailed(format!("{}: {}", path.display(), e)))?;
        info!(device = %path.display(), "Scanner opened");
        Ok(Self::new(file))
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> DecodeSource for LineSource<R> {
    async fn next_decoded(&mut self) -> Result<Option<String>> {
        loop {
            let line = read_line_lossy(&mut self.reader, &mut self.buf)
                .await
                .map_err(|e| Error::CaptureFailed(e.to_string()))?;
            match line {
                Some(line) if line.trim().is_empty() => continue,
                other => return Ok(other),
            }
        }
    }
}

/// Read errors in a row after which the scanner is given up
const MAX_READ_ERRORS: u32 = 5;

/// Slot holding the handle of the open scan session, if any
pub type ActiveScan = watch::Receiver<Option<CaptureHandle>>;

/// Feed decoded strings into the open scan session until the source ends
///
/// Codes read while no session is open are dropped. A read error is reported
/// as a capture failure to the open session and reading goes on; the end of
/// the stream, or repeated errors, also fail the open session and stop.
pub async fn run_capture<S: DecodeSource>(mut source: S, active: ActiveScan) {
    let mut errors = 0;
    loop {
        match source.next_decoded().await {
            Ok(Some(code)) => {
                errors = 0;
                let handle = active.borrow().clone();
                match handle {
                    Some(handle) if !handle.is_closed() => {
                        if !handle.decoded(code.as_str()) {
                            debug!(code = %code, "Scan session already consumed, code dropped");
                        }
                    }
                    _ => debug!(code = %code, "No scan session open, code dropped"),
                }
            }
            Ok(None) => {
                info!("Scanner stream ended");
                report_failure(&active, "scanner stream ended");
                return;
            }
            Err(e) => {
                errors += 1;
                warn!(error = %e, errors, "Scanner read failed");
                report_failure(&active, &e.to_string());
                if errors >= MAX_READ_ERRORS {
                    warn!("Giving up on scanner after repeated read errors");
                    return;
                }
            }
        }
    }
}

fn report_failure(active: &ActiveScan, reason: &str) {
    if let Some(handle) = active.borrow().as_ref() {
        handle.failed(reason);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tastemap_common::scan::CaptureEvent;
    use tastemap_common::{Catalog, Item, SessionOptions, TasteSession, WineType};
    use tokio::io::AsyncWriteExt;

    fn session() -> (TasteSession, tokio::sync::mpsc::UnboundedReceiver<CaptureEvent>) {
        let catalog = Arc::new(Catalog::new(vec![Item::new("123", 1.0, 1.0, WineType::Red)]));
        TasteSession::new(catalog, SessionOptions::default())
    }

    #[tokio::test]
    async fn test_line_source_skips_blank_lines() {
        let mut source = LineSource::new(&b"\n  \n4901\n\n4902\n"[..]);
        assert_eq!(source.next_decoded().await.unwrap().as_deref(), Some("4901"));
        assert_eq!(source.next_decoded().await.unwrap().as_deref(), Some("4902"));
        assert_eq!(source.next_decoded().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_decoded_lossily() {
        let mut source = LineSource::new(&b"\xff\xfe\r\n123\n"[..]);
        assert_eq!(source.next_decoded().await.unwrap().as_deref(), Some("\u{fffd}\u{fffd}"));
        assert_eq!(source.next_decoded().await.unwrap().as_deref(), Some("123"));
    }

    #[tokio::test]
    async fn test_noise_while_idle_does_not_stop_scanner() {
        let (mut session, mut capture_rx) = session();
        let (tx, rx) = watch::channel(None);
        let (mut writer, reader) = tokio::io::duplex(64);
        let pump = tokio::spawn(run_capture(LineSource::new(reader), rx));

        writer.write_all(b"\xff\xfe\n").await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!pump.is_finished());

        let handle = session.start_scan().unwrap();
        tx.send_replace(Some(handle));
        writer.write_all(b"123\n").await.unwrap();
        let event = tokio::time::timeout(std::time::Duration::from_secs(1), capture_rx.recv())
            .await
            .expect("decode delivered")
            .expect("channel open");
        assert!(matches!(event, CaptureEvent::Decoded { ref code, .. } if code == "123"));

        drop(writer);
        pump.await.unwrap();
    }

    /// Fails the first read, then yields one code, then ends
    struct FlakySource {
        reads: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl DecodeSource for FlakySource {
        async fn next_decoded(&mut self) -> Result<Option<String>> {
            match self.reads.fetch_add(1, Ordering::SeqCst) {
                0 => Err(Error::CaptureFailed("device hiccup".into())),
                1 => Ok(Some("123".into())),
                _ => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn test_read_error_does_not_stop_scanner() {
        let (mut session, mut capture_rx) = session();
        let handle = session.start_scan().unwrap();
        let (_tx, rx) = watch::channel(Some(handle));
        let reads = Arc::new(AtomicUsize::new(0));

        run_capture(FlakySource { reads: Arc::clone(&reads) }, rx).await;

        // Kept reading past the error until the end of the stream
        assert_eq!(reads.load(Ordering::SeqCst), 3);
        assert!(matches!(
            capture_rx.try_recv().unwrap(),
            CaptureEvent::Failed { reason, .. } if reason.contains("device hiccup")
        ));
        assert!(capture_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_lines_while_idle_are_dropped() {
        let (_session, mut capture_rx) = session();
        let (_tx, rx) = watch::channel(None);
        run_capture(LineSource::new(&b"123\n"[..]), rx).await;
        assert!(capture_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_only_first_line_reaches_open_session() {
        let (mut session, mut capture_rx) = session();
        let handle = session.start_scan().unwrap();
        let session_id = handle.session_id();
        let (_tx, rx) = watch::channel(Some(handle));

        run_capture(LineSource::new(&b"123\n456\n"[..]), rx).await;

        match capture_rx.try_recv().unwrap() {
            CaptureEvent::Decoded { session_id: id, code } => {
                assert_eq!(id, session_id);
                assert_eq!(code, "123");
            }
            other => panic!("unexpected event {:?}", other),
        }
        // End of stream comes after consumption and is swallowed
        assert!(capture_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_stream_end_fails_open_session() {
        let (mut session, mut capture_rx) = session();
        let handle = session.start_scan().unwrap();
        let (_tx, rx) = watch::channel(Some(handle));

        run_capture(LineSource::new(&b""[..]), rx).await;

        assert!(matches!(
            capture_rx.try_recv().unwrap(),
            CaptureEvent::Failed { reason, .. } if reason == "scanner stream ended"
        ));
    }
}
