// Drain loop: list the newest images, download and delete each one, then
// list again until the account comes back empty. Re-listing instead of
// paging means images uploaded while the loop runs are picked up too.
// The loop also stops once a listing holds nothing but url-less images,
// which non premium accounts can never download.
//
// Every failure ends the run. An image is only deleted after its file was
// written completely, so aborting never loses an image; it stays on the
// account for the next run.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info, warn};

use crate::api::ImageRecord;
use crate::download::DownloadProgress;
use crate::filename::{derive_file_name, resolve_destination, FileCollision};

/// Remote side of the loop: where images are listed and deleted.
pub trait ImageStore {
    fn list_images(&self) -> Result<Vec<ImageRecord>>;
    fn delete_image(&self, image_id: &str) -> Result<()>;
}

/// Transfers one image to a local file, returning the bytes written.
pub trait Fetch {
    fn fetch(
        &self,
        url: &str,
        dest: &Path,
        on_progress: &mut dyn FnMut(&DownloadProgress),
    ) -> Result<u64>;
}

/// Receives what the loop is doing, for display.
pub trait Reporter {
    fn listing(&mut self) {}
    fn found(&mut self, count: usize);
    fn skipped(&mut self, image: &ImageRecord);
    fn processing(&mut self, file_name: &str);
    fn progress(&mut self, progress: &DownloadProgress);
    fn downloaded(&mut self, bytes: u64);
    fn download_failed(&mut self, error: &anyhow::Error);
    fn deleting(&mut self, _image_id: &str) {}
    fn deleted(&mut self, image_id: &str);
}

/// Settings for one drain run.
#[derive(Debug, Clone)]
pub struct DrainConfig {
    pub output_dir: PathBuf,
    pub on_collision: FileCollision,
}

impl DrainConfig {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        DrainConfig {
            output_dir: output_dir.into(),
            on_collision: FileCollision::default(),
        }
    }
}

impl Default for DrainConfig {
    fn default() -> Self {
        DrainConfig::new("images")
    }
}

/// Totals for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainSummary {
    /// Listings that returned at least one image.
    pub cycles: usize,
    pub downloaded: usize,
    /// Records passed over for lacking a url, counted per listing.
    pub skipped: usize,
    /// Url-less images still on the account when the run stopped.
    pub left_behind: usize,
}

/// Drain the account behind `store` into `config.output_dir`.
pub fn run<S, F>(
    store: &S,
    fetcher: &F,
    config: &DrainConfig,
    reporter: &mut dyn Reporter,
) -> Result<DrainSummary>
where
    S: ImageStore + ?Sized,
    F: Fetch + ?Sized,
{
    fs::create_dir_all(&config.output_dir)
        .with_context(|| format!("Failed to create {}", config.output_dir.display()))?;

    let mut summary = DrainSummary::default();
    loop {
        reporter.listing();
        let images = store.list_images()?;
        reporter.found(images.len());
        if images.is_empty() {
            info!(?summary, "account is empty");
            return Ok(summary);
        }

        summary.cycles += 1;
        debug!(cycle = summary.cycles, batch = images.len(), "processing batch");

        let mut drained = 0;
        let mut skipped = 0;
        for image in &images {
            if !image.has_url() {
                skipped += 1;
                reporter.skipped(image);
                continue;
            }
            drain_image(store, fetcher, config, reporter, image)?;
            drained += 1;
        }
        summary.downloaded += drained;
        summary.skipped += skipped;

        // Listing again would only return the same url-less images.
        if drained == 0 {
            warn!(skipped, "only images without a download url remain");
            summary.left_behind = skipped;
            return Ok(summary);
        }
    }
}

fn drain_image<S, F>(
    store: &S,
    fetcher: &F,
    config: &DrainConfig,
    reporter: &mut dyn Reporter,
    image: &ImageRecord,
) -> Result<()>
where
    S: ImageStore + ?Sized,
    F: Fetch + ?Sized,
{
    let file_name = derive_file_name(image)?;
    let dest = resolve_destination(&config.output_dir, &file_name, config.on_collision)?;
    let shown = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or(file_name);
    reporter.processing(&shown);

    let result = fetcher.fetch(&image.url, &dest, &mut |progress: &DownloadProgress| {
        reporter.progress(progress)
    });
    let bytes = match result {
        Ok(bytes) => bytes,
        Err(err) => {
            reporter.download_failed(&err);
            return Err(err.context(format!("Downloading image {}", image.image_id)));
        }
    };
    reporter.downloaded(bytes);

    reporter.deleting(&image.image_id);
    store.delete_image(&image.image_id)?;
    reporter.deleted(&image.image_id);
    Ok(())
}
