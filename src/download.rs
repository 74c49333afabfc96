//! Transfer manager: streamed asset downloads with skip and length checks.

use std::path::PathBuf;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::fs::{FileSystem, TokioFileSystem};
use crate::notify::Notifier;
use crate::transport::Transport;

/// A resolved (url, local path) pair. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadTarget {
    /// Remote url, exactly as advertised by the device.
    pub url: String,
    /// Local file path the asset is written to.
    pub path: PathBuf,
}

/// Per-pass state: the quality filter and the notification bracketing flag.
///
/// One session lives exactly as long as one pass, so repeated daemon passes
/// cannot leak the "a transfer has started" flag into each other.
pub struct TransferSession {
    quality: Option<String>,
    started: bool,
}

impl TransferSession {
    /// Creates a fresh session with an optional quality filter.
    #[must_use]
    pub const fn new(quality: Option<String>) -> Self {
        Self {
            quality,
            started: false,
        }
    }

    /// The session's quality marker, if any.
    #[must_use]
    pub fn quality(&self) -> Option<&str> {
        self.quality.as_deref()
    }

    /// Whether any real download has started this pass.
    #[must_use]
    pub const fn has_started(&self) -> bool {
        self.started
    }

    /// Fires the start notification on the first real download of the pass.
    pub(crate) fn mark_started(&mut self, notifier: &dyn Notifier) {
        if !self.started {
            self.started = true;
            notifier.transfer_started();
        }
    }

    /// Fires the finished notification if a start was shown. Called once
    /// when the enclosing traversal completes.
    pub fn finish(&mut self, notifier: &dyn Notifier) {
        if self.started {
            self.started = false;
            notifier.transfer_finished();
        }
    }
}

/// What became of one download target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Streamed to disk, byte count as advertised (or nothing advertised).
    Downloaded {
        /// Bytes written.
        bytes: u64,
    },
    /// File already existed with the advertised size; nothing was read.
    Skipped,
    /// Stream delivered a different byte count than advertised. The file is
    /// kept as written; the source may have been deleted mid-transfer.
    LengthMismatch {
        /// Advertised content length.
        advertised: u64,
        /// Bytes actually written.
        written: u64,
    },
    /// The asset GET answered with a non-success status. The local file was
    /// not touched.
    Failed {
        /// The status the device returned.
        status: reqwest::StatusCode,
    },
}

/// Performs streamed downloads against a [`Transport`].
pub struct Downloader<T: Transport, F: FileSystem = TokioFileSystem> {
    transport: T,
    fs: F,
}

impl<T: Transport> Downloader<T, TokioFileSystem> {
    /// Creates a downloader with the default file system.
    #[must_use]
    pub const fn new(transport: T) -> Self {
        Self {
            transport,
            fs: TokioFileSystem,
        }
    }
}

impl<T: Transport, F: FileSystem> Downloader<T, F> {
    /// Creates a downloader with a custom file system implementation.
    #[must_use]
    pub const fn with_fs(transport: T, fs: F) -> Self {
        Self { transport, fs }
    }

    /// Returns a reference to the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Downloads one target.
    ///
    /// Already-complete files (size equals a nonzero advertised length) are
    /// skipped without reading the stream, so re-running is always cheap.
    /// The first non-skipped download of the pass fires the session's start
    /// notification.
    ///
    /// # Errors
    ///
    /// Propagates transport errors (camera unreachable, stream aborted) and
    /// local I/O errors. Non-success HTTP statuses and length mismatches are
    /// reported as [`Outcome`]s, not errors.
    pub async fn download(
        &self,
        target: &DownloadTarget,
        session: &mut TransferSession,
        notifier: &dyn Notifier,
    ) -> Result<Outcome> {
        if let Some(parent) = target.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.fs.create_dir_all(parent).await?;
        }

        let mut body = self.transport.fetch(&target.url).await?;
        if !body.status.is_success() {
            log::warn!("unexpected status {} for {}", body.status, target.url);
            return Ok(Outcome::Failed {
                status: body.status,
            });
        }

        let advertised = body.content_length;
        if let Some(len) = advertised
            && len != 0
            && self.fs.file_size(&target.path).await == Some(len)
        {
            log::info!("skipping existing file {}", target.path.display());
            return Ok(Outcome::Skipped);
        }

        session.mark_started(notifier);
        log::info!("downloading {} -> {}", target.url, target.path.display());

        let mut file = self.fs.create_file(&target.path).await?;
        let mut written: u64 = 0;
        while let Some(chunk) = body.stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        match advertised {
            Some(len) if len != written => {
                log::warn!(
                    "received {written} bytes but {len} were advertised for {}",
                    target.path.display()
                );
                Ok(Outcome::LengthMismatch {
                    advertised: len,
                    written,
                })
            }
            _ => Ok(Outcome::Downloaded { bytes: written }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::stream;
    use reqwest::StatusCode;
    use tempfile::TempDir;

    use crate::notify::NoNotifier;
    use crate::transport::FetchBody;

    /// Serves a fixed body for any fetched url; counts fetches.
    struct FixedBodyTransport {
        status: StatusCode,
        content_length: Option<u64>,
        body: Vec<u8>,
        fetches: AtomicUsize,
    }

    impl FixedBodyTransport {
        fn new(status: StatusCode, content_length: Option<u64>, body: &[u8]) -> Self {
            Self {
                status,
                content_length,
                body: body.to_vec(),
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Transport for FixedBodyTransport {
        async fn browse(&self, _object_id: &str, _starting_index: u32) -> Result<String> {
            unimplemented!("not used by download tests")
        }

        async fn fetch(&self, _url: &str) -> Result<FetchBody> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let chunks: Vec<Result<Bytes>> = self
                .body
                .chunks(4)
                .map(|c| Ok(Bytes::copy_from_slice(c)))
                .collect();
            Ok(FetchBody {
                status: self.status,
                content_length: self.content_length,
                stream: stream::iter(chunks).boxed(),
            })
        }

        async fn transfer_start(&self) {}
        async fn transfer_end(&self) {}

        async fn service_description(&self) -> Result<String> {
            unimplemented!("not used by download tests")
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        started: AtomicUsize,
        finished: AtomicUsize,
    }

    impl Notifier for RecordingNotifier {
        fn transfer_started(&self) {
            self.started.fetch_add(1, Ordering::SeqCst);
        }
        fn transfer_finished(&self) {
            self.finished.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn target_in(dir: &TempDir, name: &str) -> DownloadTarget {
        DownloadTarget {
            url: format!("http://cam/{name}"),
            path: dir.path().join("100MSDCF").join(name),
        }
    }

    #[tokio::test]
    async fn downloads_stream_to_file() {
        let dir = TempDir::new().unwrap();
        let body = b"0123456789";
        let transport = FixedBodyTransport::new(StatusCode::OK, Some(10), body);
        let downloader = Downloader::new(transport);
        let mut session = TransferSession::new(None);
        let target = target_in(&dir, "DSC00001.JPG");

        let outcome = downloader
            .download(&target, &mut session, &NoNotifier)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Downloaded { bytes: 10 });
        assert_eq!(std::fs::read(&target.path).unwrap(), body);
    }

    #[tokio::test]
    async fn second_run_skips_complete_file() {
        let dir = TempDir::new().unwrap();
        let body = b"0123456789";
        let transport = FixedBodyTransport::new(StatusCode::OK, Some(10), body);
        let downloader = Downloader::new(transport);
        let notifier = RecordingNotifier::default();
        let target = target_in(&dir, "DSC00001.JPG");

        let mut session = TransferSession::new(None);
        let first = downloader
            .download(&target, &mut session, &notifier)
            .await
            .unwrap();
        assert_eq!(first, Outcome::Downloaded { bytes: 10 });
        let mtime = std::fs::metadata(&target.path).unwrap().modified().unwrap();

        let mut session = TransferSession::new(None);
        let second = downloader
            .download(&target, &mut session, &notifier)
            .await
            .unwrap();
        assert_eq!(second, Outcome::Skipped);
        assert!(!session.has_started());
        // The file was not rewritten.
        assert_eq!(
            std::fs::metadata(&target.path).unwrap().modified().unwrap(),
            mtime
        );
        assert_eq!(notifier.started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn short_stream_reports_length_mismatch_but_keeps_file() {
        let dir = TempDir::new().unwrap();
        let body = vec![7u8; 900];
        let transport = FixedBodyTransport::new(StatusCode::OK, Some(1000), &body);
        let downloader = Downloader::new(transport);
        let mut session = TransferSession::new(None);
        let target = target_in(&dir, "DSC00002.ARW");

        let outcome = downloader
            .download(&target, &mut session, &NoNotifier)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::LengthMismatch {
                advertised: 1000,
                written: 900
            }
        );
        assert_eq!(std::fs::metadata(&target.path).unwrap().len(), 900);
    }

    #[tokio::test]
    async fn error_status_leaves_file_untouched() {
        let dir = TempDir::new().unwrap();
        let transport = FixedBodyTransport::new(StatusCode::NOT_FOUND, Some(10), b"0123456789");
        let downloader = Downloader::new(transport);
        let mut session = TransferSession::new(None);
        let target = target_in(&dir, "DSC00003.JPG");

        let outcome = downloader
            .download(&target, &mut session, &NoNotifier)
            .await
            .unwrap();
        assert_eq!(
            outcome,
            Outcome::Failed {
                status: StatusCode::NOT_FOUND
            }
        );
        assert!(!target.path.exists());
        assert!(!session.has_started());
    }

    #[tokio::test]
    async fn missing_content_length_downloads_without_mismatch() {
        let dir = TempDir::new().unwrap();
        let transport = FixedBodyTransport::new(StatusCode::OK, None, b"abc");
        let downloader = Downloader::new(transport);
        let mut session = TransferSession::new(None);
        let target = target_in(&dir, "DSC00004.JPG");

        let outcome = downloader
            .download(&target, &mut session, &NoNotifier)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Downloaded { bytes: 3 });
    }

    #[test]
    fn session_bracketing_fires_each_side_once() {
        let notifier = RecordingNotifier::default();
        let mut session = TransferSession::new(None);

        session.finish(&notifier);
        assert_eq!(notifier.finished.load(Ordering::SeqCst), 0);

        session.mark_started(&notifier);
        session.mark_started(&notifier);
        session.finish(&notifier);
        session.finish(&notifier);
        assert_eq!(notifier.started.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.finished.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn session_carries_quality_filter() {
        let session = TransferSession::new(Some("_SM".to_string()));
        assert_eq!(session.quality(), Some("_SM"));
        assert!(TransferSession::new(None).quality().is_none());
    }
}
