//! cam-dl - mirror photos and videos from a camera's wifi media server.
//!
//! The camera exposes a UPnP/DLNA ContentDirectory plus Sony's XPushList
//! vendor extension. This library walks that catalog depth-first, picks the
//! best advertised variant of every asset, and streams new files to local
//! storage. Already-complete files are skipped, so re-running is always
//! safe and cheap.
//!
//! # Example
//!
//! ```no_run
//! use cam_dl::{AppConfig, HttpTransport, NoNotifier, RunMode, Syncer};
//!
//! # async fn example() -> cam_dl::Result<()> {
//! let config = AppConfig::load()?;
//! let transport = HttpTransport::new(&config.device)?;
//! let syncer = Syncer::new(transport, config.sync);
//! syncer.run(&NoNotifier, RunMode::Once).await?;
//! # Ok(())
//! # }
//! ```

#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod catalog;
pub mod config;
pub mod download;
pub mod error;
pub mod format;
pub mod fs;
pub mod notify;
pub mod resolve;
pub mod stats;
pub mod sync;
pub mod transport;

// Re-export main types for convenience
pub use catalog::{
    BrowsePage, CatalogItem, DirectoryRef, PageContent, ResourceDescriptor, Root,
    parse_browse_response, parse_didl,
};
pub use config::{AppConfig, DaemonConfig, DeviceConfig, SyncConfig};
pub use download::{DownloadTarget, Downloader, Outcome, TransferSession};
pub use error::{Error, Result};
pub use format::{format_bytes, format_duration};
pub use fs::{FileSystem, TokioFileSystem};
#[cfg(feature = "notify")]
pub use notify::DesktopNotifier;
pub use notify::{NoNotifier, Notifier};
pub use resolve::{DEFAULT_QUALITY_MARKER, resolve};
pub use stats::PassStats;
pub use sync::{RunMode, Syncer};
pub use transport::{FetchBody, HttpTransport, Transport};
