//! Installer artifact download with progress reporting and atomic placement
//!
//! The body is streamed into `<destination>.tmp` and renamed onto the
//! destination only once every byte has been written, so a partially
//! downloaded file is never visible at the final path.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use log::{debug, warn};
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use super::progress::ProgressSink;
use crate::error::{MeowError, Result};

const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const USER_AGENT: &str = concat!("meow-cli/", env!("CARGO_PKG_VERSION"));

/// What a call to [`Downloader::fetch`] ended up doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fetched {
    /// The destination already existed and no download was forced
    AlreadyPresent,
    /// A fresh copy was written; carries the number of bytes
    Downloaded(u64),
}

/// Streams HTTP resources onto the local filesystem
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(DOWNLOAD_CONNECT_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Download `url` to `destination`.
    ///
    /// Returns immediately without touching the network when `destination`
    /// exists and `force` is false.
    pub async fn fetch(
        &self,
        url: &str,
        destination: &Path,
        force: bool,
        sink: Option<&dyn ProgressSink>,
        cancel: &CancellationToken,
    ) -> Result<Fetched> {
        if !force && tokio::fs::try_exists(destination).await? {
            debug!("artifact already present at {}", destination.display());
            return Ok(Fetched::AlreadyPresent);
        }

        debug!("downloading {url}");
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MeowError::Cancelled),
            response = self.client.get(url).send() => response?,
        };

        let status = response.status();
        if !status.is_success() {
            return Err(MeowError::Network {
                status: status.as_u16(),
            });
        }

        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let temp_path = temp_path_for(destination);
        let total = response.content_length().unwrap_or(0);
        debug!(
            "saving {} bytes to {}",
            total,
            temp_path.display()
        );

        let written = match write_body(response, &temp_path, total, sink, cancel).await {
            Ok(written) => written,
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&temp_path).await
                    && cleanup.kind() != std::io::ErrorKind::NotFound
                {
                    warn!(
                        "could not remove partial download {}: {}",
                        temp_path.display(),
                        cleanup
                    );
                }
                return Err(e);
            }
        };

        tokio::fs::rename(&temp_path, destination).await?;
        if let Some(sink) = sink {
            sink.on_finish();
        }
        debug!("saved {} ({} bytes)", destination.display(), written);

        Ok(Fetched::Downloaded(written))
    }
}

/// The in-progress sibling of `destination`
pub fn temp_path_for(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

async fn write_body(
    response: reqwest::Response,
    temp_path: &Path,
    total: u64,
    sink: Option<&dyn ProgressSink>,
    cancel: &CancellationToken,
) -> Result<u64> {
    let mut file = tokio::fs::File::create(temp_path).await?;
    let mut stream = response.bytes_stream();
    let mut written: u64 = 0;

    if let Some(sink) = sink {
        sink.on_start(total);
    }

    loop {
        let chunk = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(MeowError::Cancelled),
            next = stream.next() => match next {
                Some(chunk) => chunk?,
                None => break,
            },
        };

        file.write_all(&chunk).await?;
        written += chunk.len() as u64;

        if let Some(sink) = sink {
            sink.on_transfer(total, &chunk);
        }
    }

    file.flush().await?;
    file.sync_all().await?;
    drop(file);

    Ok(written)
}
