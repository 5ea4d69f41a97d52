// Entrypoint for the CLI application.
// - Keeps `main` small: parse flags, build the shared HTTP client and hand
//   everything to `drain::run`.
// - Returns `anyhow::Result` so any failure ends the process with a
//   non-zero exit code and the error chain on stderr.

use std::path::PathBuf;

use clap::Parser;
use gyazo_drain::api::{build_http_client, ApiClient};
use gyazo_drain::download::Downloader;
use gyazo_drain::drain::{self, DrainConfig};
use gyazo_drain::filename::FileCollision;
use gyazo_drain::ui::{print_finished, ConsoleReporter};
use tracing_subscriber::EnvFilter;

/// Download every image from a Gyazo account, deleting each one remotely
/// once it is saved locally.
///
/// Images the API lists without a download url (non premium accounts) are
/// left on the account; the run still finishes successfully.
#[derive(Parser)]
#[command(name = "gyazo-drain", version, about, long_about)]
struct Cli {
    /// Gyazo API access token
    #[arg(
        long = "access_token",
        env = "GYAZO_ACCESS_TOKEN",
        hide_env_values = true,
        value_parser = clap::builder::NonEmptyStringValueParser::new()
    )]
    access_token: String,

    /// Directory the images are written to
    #[arg(long = "output_dir", default_value = "images")]
    output_dir: PathBuf,

    /// What to do when a file with the derived name already exists
    #[arg(long = "on_collision", value_enum, default_value_t = FileCollision::Rename)]
    on_collision: FileCollision,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    let client = build_http_client()?;
    let api = ApiClient::new(client.clone(), &cli.access_token);
    let downloader = Downloader::new(client);
    let config = DrainConfig {
        output_dir: cli.output_dir,
        on_collision: cli.on_collision,
    };

    let mut reporter = ConsoleReporter::new();
    let summary = drain::run(&api, &downloader, &config, &mut reporter)?;
    print_finished(&summary);
    Ok(())
}
