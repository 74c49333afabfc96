//! Traversal engine: walks the remote catalog and drives downloads.

use std::time::Instant;

use futures::FutureExt;
use futures::future::BoxFuture;
use percent_encoding::percent_decode_str;

use crate::catalog::{CatalogItem, DirectoryRef, Root, parse_browse_response, parse_didl};
use crate::config::SyncConfig;
use crate::download::{DownloadTarget, Downloader, TransferSession};
use crate::error::Result;
use crate::format::{format_bytes, format_duration};
use crate::fs::{FileSystem, TokioFileSystem};
use crate::notify::Notifier;
use crate::resolve::resolve;
use crate::stats::PassStats;
use crate::transport::Transport;

/// Bound on directory nesting. Real cameras nest two or three levels; the
/// limit only guards against a pathological catalog that references itself.
const MAX_DEPTH: u32 = 32;

/// Whether the process runs one pass or repeats forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    /// One pass, then exit.
    Once,
    /// Repeat passes on a fixed interval until the process is terminated.
    Daemon {
        /// Wait between passes.
        interval: std::time::Duration,
    },
}

/// Walks the device catalog depth-first and mirrors every new item.
pub struct Syncer<T: Transport, F: FileSystem = TokioFileSystem> {
    downloader: Downloader<T, F>,
    config: SyncConfig,
}

impl<T: Transport> Syncer<T, TokioFileSystem> {
    /// Creates a syncer with the default file system.
    #[must_use]
    pub const fn new(transport: T, config: SyncConfig) -> Self {
        Self {
            downloader: Downloader::new(transport),
            config,
        }
    }
}

impl<T: Transport, F: FileSystem> Syncer<T, F> {
    /// Creates a syncer with a custom file system implementation.
    #[must_use]
    pub const fn with_fs(transport: T, fs: F, config: SyncConfig) -> Self {
        Self {
            downloader: Downloader::with_fs(transport, fs),
            config,
        }
    }

    /// Returns a reference to the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        self.downloader.transport()
    }

    /// Runs passes according to `mode`.
    ///
    /// In daemon mode no error ends the loop: an unreachable camera or an
    /// aborted pass is logged and retried on the next interval. In one-shot
    /// mode an unreachable camera ends the run quietly (the camera is simply
    /// off); other errors propagate.
    ///
    /// # Errors
    ///
    /// Only in [`RunMode::Once`], when a pass aborts for a reason other than
    /// the camera being unreachable.
    pub async fn run(&self, notifier: &dyn Notifier, mode: RunMode) -> Result<()> {
        loop {
            match self.run_pass(notifier).await {
                Ok(stats) => {
                    if stats.is_quiet() {
                        log::info!(
                            "pass complete, nothing new ({} already present)",
                            stats.files_skipped
                        );
                    } else {
                        log::info!(
                            "pass complete: {} downloaded ({}), {} skipped, {} failed, {} unresolved in {}",
                            stats.files_downloaded,
                            format_bytes(stats.total_bytes),
                            stats.files_skipped,
                            stats.files_failed,
                            stats.files_unresolved,
                            format_duration(stats.elapsed),
                        );
                    }
                }
                Err(e) if e.is_connection() => log::warn!("camera unreachable: {e}"),
                Err(e) => match mode {
                    RunMode::Once => return Err(e),
                    RunMode::Daemon { .. } => log::error!("pass aborted: {e}"),
                },
            }
            match mode {
                RunMode::Once => return Ok(()),
                RunMode::Daemon { interval } => {
                    log::debug!("next pass in {}", format_duration(interval));
                    tokio::time::sleep(interval).await;
                }
            }
        }
    }

    /// Runs one complete pass: transfer signaling, the push-or-photo root
    /// walk, downloads and notification bracketing.
    ///
    /// The push root is tried first; a protocol error there means the camera
    /// is in "choose on computer" mode, so the photo root is walked instead.
    /// A failure on the photo root propagates. The transfer-end signal and
    /// the finished notification are sent even when the walk fails, so an
    /// interrupted daemon pass does not leave the camera UI hanging.
    ///
    /// # Errors
    ///
    /// Transport, decode and local I/O errors abort the pass.
    pub async fn run_pass(&self, notifier: &dyn Notifier) -> Result<PassStats> {
        let started_at = Instant::now();
        let mut stats = PassStats::new();
        let mut session = TransferSession::new(self.config.quality.clone());

        self.transport().transfer_start().await;
        let mut result = self
            .traverse(Root::Push.directory(), 0, &mut session, notifier, &mut stats)
            .await;
        if let Err(e) = &result
            && e.is_protocol()
        {
            log::info!("push root unavailable ({e}), falling back to the photo root");
            result = self
                .traverse(Root::Photo.directory(), 0, &mut session, notifier, &mut stats)
                .await;
        }
        self.transport().transfer_end().await;
        session.finish(notifier);

        stats.elapsed = started_at.elapsed();
        result.map(|()| stats)
    }

    /// Walks one directory depth-first: fetches its pages, recurses into
    /// sub-directories as they appear, then downloads the page's items.
    fn traverse<'a>(
        &'a self,
        dir: DirectoryRef,
        depth: u32,
        session: &'a mut TransferSession,
        notifier: &'a dyn Notifier,
        stats: &'a mut PassStats,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            if depth > MAX_DEPTH {
                log::warn!(
                    "directory {} nested deeper than {MAX_DEPTH} levels, not descending",
                    dir.display_name()
                );
                return Ok(());
            }

            let mut offset = 0;
            loop {
                let body = self.transport().browse(&dir.id, offset).await?;
                let page = parse_browse_response(&body, offset)?;
                let content = parse_didl(&page.result)?;
                log::debug!(
                    "{}: {} children at offset {} of {}",
                    dir.display_name(),
                    page.number_returned,
                    page.starting_index,
                    page.total_matches
                );

                for sub in content.directories {
                    log::info!("entering subdir {} ({})", sub.display_name(), sub.id);
                    self.traverse(sub, depth + 1, &mut *session, notifier, &mut *stats)
                        .await?;
                }

                for item in content.items {
                    if let Some(url) = resolve(&item, session.quality()) {
                        let target = self.target_for(&dir, &item, url);
                        let outcome = self.downloader.download(&target, session, notifier).await?;
                        stats.record(&outcome);
                    } else {
                        log::warn!(
                            "no usable resource variant for {}",
                            item.title.as_deref().unwrap_or("<untitled item>")
                        );
                        stats.record_unresolved();
                    }
                }

                if page.is_last() {
                    return Ok(());
                }
                offset = page.next_index();
            }
        }
        .boxed()
    }

    /// Local path for an item: output root, owning directory's display name,
    /// item title (or a name derived from the url when the title is absent).
    fn target_for(&self, dir: &DirectoryRef, item: &CatalogItem, url: &str) -> DownloadTarget {
        let file_name = item
            .title
            .clone()
            .or_else(|| file_name_from_url(url))
            .unwrap_or_else(|| "unnamed".to_string());
        DownloadTarget {
            url: url.to_string(),
            path: self
                .config
                .output_dir
                .join(dir.display_name())
                .join(file_name),
        }
    }
}

/// Derives a filename from a url's last path segment, percent-decoded.
fn file_name_from_url(url: &str) -> Option<String> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').next()?;
    if segment.is_empty() {
        return None;
    }
    let decoded = percent_decode_str(segment).decode_utf8().ok()?;
    if decoded.is_empty() {
        None
    } else {
        Some(decoded.into_owned())
    }
}
