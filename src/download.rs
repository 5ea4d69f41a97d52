// Downloader: streams one image to its destination file and calls back
// with progress at a fixed cadence. The transfer runs on the calling thread
// and the cadence is checked each time a chunk arrives, so a connection that
// stops delivering data produces no progress lines until data or an error
// arrives. Reporting goes through a callback rather than a separate timer.

use std::fmt;
use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use tracing::debug;

use crate::drain::Fetch;

/// How often progress is reported while a transfer is running.
pub const REPORT_INTERVAL: Duration = Duration::from_millis(500);

const CHUNK_SIZE: usize = 64 * 1024;

/// Counters for the transfer currently in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadProgress {
    pub transferred: u64,
    /// `Content-Length` of the response, when the server sent one.
    pub total: Option<u64>,
}

impl DownloadProgress {
    /// Completed share in `0.0..=1.0`, if the total size is known.
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some(self.transferred as f64 / total as f64),
            None => None,
        }
    }
}

impl fmt::Display for DownloadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.total, self.fraction()) {
            (Some(total), Some(fraction)) => write!(
                f,
                "Transferred {} / {} bytes ({:.2}%)",
                self.transferred,
                total,
                100.0 * fraction
            ),
            _ => write!(f, "Transferred {} / ? bytes", self.transferred),
        }
    }
}

/// Blocking image downloader sharing the API client's HTTP client.
#[derive(Clone)]
pub struct Downloader {
    client: Client,
    interval: Duration,
}

impl Downloader {
    pub fn new(client: Client) -> Self {
        Downloader {
            client,
            interval: REPORT_INTERVAL,
        }
    }

    /// Override the progress cadence.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Download `url` into `dest`, returning the number of bytes written.
    /// The body is streamed into `<dest>.part` and only renamed to `dest`
    /// once complete; a failed transfer leaves the `.part` file behind.
    pub fn download(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &mut dyn FnMut(&DownloadProgress),
    ) -> Result<u64> {
        let mut res = self
            .client
            .get(url)
            .send()
            .with_context(|| format!("Failed to send download request for {}", url))?;
        if !res.status().is_success() {
            anyhow::bail!("Download of {} failed: {}", url, res.status());
        }

        let total = res.content_length();
        debug!(%url, dest = %dest.display(), ?total, "starting download");
        let bytes = stream_to_file(&mut res, total, dest, self.interval, on_progress)
            .with_context(|| format!("Download of {} failed", url))?;
        debug!(bytes, "download complete");
        Ok(bytes)
    }
}

/// Path of the in-progress file for `dest`.
pub fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

fn stream_to_file(
    body: &mut dyn Read,
    total: Option<u64>,
    dest: &Path,
    interval: Duration,
    on_progress: &mut dyn FnMut(&DownloadProgress),
) -> Result<u64> {
    let part = part_path(dest);
    let file = File::create(&part)
        .with_context(|| format!("Failed to create {}", part.display()))?;
    let mut writer = BufWriter::new(file);
    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut progress = DownloadProgress {
        transferred: 0,
        total,
    };
    let mut last_report = Instant::now();

    loop {
        let n = body.read(&mut buf).context("Failed reading response body")?;
        if n == 0 {
            break;
        }
        writer
            .write_all(&buf[..n])
            .with_context(|| format!("Failed writing to {}", part.display()))?;
        progress.transferred += n as u64;

        if last_report.elapsed() >= interval {
            on_progress(&progress);
            last_report = Instant::now();
        }
    }

    writer
        .flush()
        .with_context(|| format!("Failed writing to {}", part.display()))?;

    if let Some(total) = total {
        if progress.transferred != total {
            anyhow::bail!("ended after {} of {} bytes", progress.transferred, total);
        }
    }

    fs::rename(&part, dest)
        .with_context(|| format!("Failed to move {} to {}", part.display(), dest.display()))?;
    Ok(progress.transferred)
}

impl Fetch for Downloader {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &mut dyn FnMut(&DownloadProgress),
    ) -> Result<u64> {
        self.download(url, dest, on_progress)
    }
}
