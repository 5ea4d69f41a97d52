// UI layer: renders drain loop events as plain console lines. Spinners from
// `indicatif` cover the API round trips (listing, deleting); the download
// itself prints its own progress lines.

use std::time::Duration;

use crossterm::style::Stylize;
use indicatif::{ProgressBar, ProgressStyle};

use crate::api::ImageRecord;
use crate::download::DownloadProgress;
use crate::drain::{DrainSummary, Reporter};

/// Console implementation of `Reporter`.
#[derive(Default)]
pub struct ConsoleReporter {
    spinner: Option<ProgressBar>,
}

impl ConsoleReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn start_spinner(&mut self, msg: String) {
        self.stop_spinner();
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(msg);
        spinner.enable_steady_tick(Duration::from_millis(100));
        self.spinner = Some(spinner);
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.finish_and_clear();
        }
    }
}

impl Drop for ConsoleReporter {
    fn drop(&mut self) {
        self.stop_spinner();
    }
}

impl Reporter for ConsoleReporter {
    fn listing(&mut self) {
        self.start_spinner("Fetching image list...".into());
    }

    fn found(&mut self, count: usize) {
        self.stop_spinner();
        println!("Found {} images", count);
    }

    fn skipped(&mut self, image: &ImageRecord) {
        println!(
            "{}",
            format!("Skipping {}: no download url (non premium account?)", image.image_id).yellow()
        );
    }

    fn processing(&mut self, file_name: &str) {
        println!("Processing {}", file_name);
    }

    fn progress(&mut self, progress: &DownloadProgress) {
        println!("{}", progress);
    }

    fn downloaded(&mut self, _bytes: u64) {
        println!("{}", "Successfully downloaded ✅".green());
    }

    fn download_failed(&mut self, _error: &anyhow::Error) {
        println!("{}", "Download failed ❌".red());
    }

    fn deleting(&mut self, image_id: &str) {
        self.start_spinner(format!("Deleting {} from gyazo...", image_id));
    }

    fn deleted(&mut self, _image_id: &str) {
        self.stop_spinner();
        println!("{}", "Successfully deleted from gyazo ✅".green());
    }
}

/// Final line of a successful run.
pub fn print_finished(summary: &DrainSummary) {
    println!(
        "Downloaded {} images in {} cycles.",
        summary.downloaded, summary.cycles
    );
    if summary.left_behind > 0 {
        println!(
            "{}",
            format!(
                "{} images without a download url were left on the account",
                summary.left_behind
            )
            .yellow()
        );
    }
    println!("{}", "Finished, have a nice day! :)".bold());
}
