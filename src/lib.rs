// Library root
// -----------
// This crate exposes a small library surface for the CLI. The binary
// (`main.rs`) parses flags, builds the shared HTTP client and hands
// everything to `drain::run`.
//
// Module responsibilities:
// - `api`: HTTP interactions with the Gyazo API (list, delete) and the
//   image record model.
// - `filename`: local file names derived from image metadata, plus the
//   collision policy for the output directory.
// - `download`: streams one image to disk and reports progress.
// - `drain`: the list -> download -> delete loop that empties the account.
// - `error`: typed errors the loop and callers care about.
// - `ui`: console rendering of what the loop is doing.
pub mod api;
pub mod download;
pub mod drain;
pub mod error;
pub mod filename;
pub mod ui;
