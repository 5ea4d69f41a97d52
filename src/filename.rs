// Local file names for downloaded images.
//
// `derive_file_name` is pure: the same record always yields the same name.
// Where that name lands on disk is decided by `resolve_destination`, which
// applies the configured `FileCollision` policy.

use std::path::{Component, Path, PathBuf};

use anyhow::Result;
use clap::ValueEnum;

use crate::api::ImageRecord;
use crate::error::FileNameError;

/// Trailing characters of `created_at` that are left out of the name
/// (fractional seconds / zone suffix).
const TIMESTAMP_SUFFIX_LEN: usize = 5;

const MAX_RENAME_ATTEMPTS: u32 = 9999;

/// What to do when the derived file already exists in the output directory.
///
/// Only completed downloads carry the derived name; an interrupted transfer
/// leaves `<name>.part` behind, so an existing file is always a finished
/// image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum FileCollision {
    /// Write to `<stem> (1).<ext>`, `<stem> (2).<ext>`, ...
    #[default]
    Rename,
    /// Replace the existing file.
    Overwrite,
}

/// `<app>_<timestamp>.<type>` with spaces in the app tag turned into
/// underscores, or `<timestamp>.<type>` when there is no app tag. The last
/// five characters of `created_at` are dropped. Names that are not a single
/// plain path component are rejected.
pub fn derive_file_name(image: &ImageRecord) -> Result<String, FileNameError> {
    let timestamp = trim_timestamp(&image.created_at).ok_or_else(|| {
        FileNameError::TimestampTooShort {
            image_id: image.image_id.clone(),
            created_at: image.created_at.clone(),
        }
    })?;

    let name = match image.app_tag() {
        Some(app) => format!("{}_{}.{}", app.replace(' ', "_"), timestamp, image.image_type),
        None => format!("{}.{}", timestamp, image.image_type),
    };

    if !is_plain_file_name(&name) {
        return Err(FileNameError::UnsafeName {
            image_id: image.image_id.clone(),
            name,
        });
    }
    Ok(name)
}

// Metadata comes from the server; anything that could resolve outside the
// output directory is refused.
fn is_plain_file_name(name: &str) -> bool {
    if name.contains(&['/', '\\', '\0'][..]) || name.contains("..") {
        return false;
    }
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

fn trim_timestamp(created_at: &str) -> Option<&str> {
    let len = created_at.chars().count();
    if len < TIMESTAMP_SUFFIX_LEN {
        return None;
    }
    let end = created_at
        .char_indices()
        .nth(len - TIMESTAMP_SUFFIX_LEN)
        .map_or(created_at.len(), |(idx, _)| idx);
    Some(&created_at[..end])
}

/// Path inside `dir` that `file_name` should be written to.
pub fn resolve_destination(dir: &Path, file_name: &str, policy: FileCollision) -> Result<PathBuf> {
    let path = dir.join(file_name);
    if policy == FileCollision::Overwrite || !path.exists() {
        return Ok(path);
    }

    let candidate = Path::new(file_name);
    let stem = candidate
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let extension = candidate.extension().and_then(|e| e.to_str());

    for i in 1..=MAX_RENAME_ATTEMPTS {
        let renamed = match extension {
            Some(ext) => format!("{} ({}).{}", stem, i, ext),
            None => format!("{} ({})", stem, i),
        };
        let path = dir.join(renamed);
        if !path.exists() {
            return Ok(path);
        }
    }
    anyhow::bail!(
        "No free file name for {} in {} after {} attempts",
        file_name,
        dir.display(),
        MAX_RENAME_ATTEMPTS
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::Metadata;
    use std::fs;
    use tempfile::TempDir;

    fn record(app: &str, created_at: &str, image_type: &str) -> ImageRecord {
        ImageRecord {
            url: "http://x/a.png".into(),
            image_id: "1".into(),
            metadata: Metadata { app: app.into() },
            created_at: created_at.into(),
            image_type: image_type.into(),
        }
    }

    #[test]
    fn app_tag_prefixes_the_name() {
        let image = record("Notes", "2023-01-01T00:00:00+0000", "png");
        assert_eq!(derive_file_name(&image).unwrap(), "Notes_2023-01-01T00:00:00.png");
    }

    #[test]
    fn spaces_in_app_tag_become_underscores() {
        let image = record("Google Chrome Beta", "2023-05-06T07:08:09+0000", "jpg");
        assert_eq!(
            derive_file_name(&image).unwrap(),
            "Google_Chrome_Beta_2023-05-06T07:08:09.jpg"
        );
    }

    #[test]
    fn blank_or_single_space_app_tag_is_absent() {
        for app in ["", " "] {
            let image = record(app, "2023-01-01T00:00:00+0000", "png");
            assert_eq!(derive_file_name(&image).unwrap(), "2023-01-01T00:00:00.png");
        }
    }

    #[test]
    fn two_spaces_count_as_a_tag() {
        let image = record("  ", "2023-01-01T00:00:00+0000", "png");
        assert_eq!(derive_file_name(&image).unwrap(), "___2023-01-01T00:00:00.png");
    }

    #[test]
    fn timestamp_of_exactly_five_chars_leaves_empty_stem() {
        let image = record("", "+0000", "gif");
        assert_eq!(derive_file_name(&image).unwrap(), ".gif");
    }

    #[test]
    fn short_timestamp_is_rejected() {
        let image = record("Notes", "2023", "png");
        assert_eq!(
            derive_file_name(&image),
            Err(FileNameError::TimestampTooShort {
                image_id: "1".into(),
                created_at: "2023".into(),
            })
        );
    }

    #[test]
    fn timestamp_is_trimmed_by_characters() {
        let image = record("", "2023年01月01日ああああa", "png");
        assert_eq!(derive_file_name(&image).unwrap(), "2023年01月01日.png");
    }

    #[test]
    fn names_leaving_the_output_dir_are_rejected() {
        let cases = [
            record("../escaped", "2023-01-01T00:00:00+0000", "png"),
            record("a/b", "2023-01-01T00:00:00+0000", "png"),
            record("a\\b", "2023-01-01T00:00:00+0000", "png"),
            record("/etc/cron.d/x", "2023-01-01T00:00:00+0000", "png"),
            record("", "2023-01-01T00:00:00+0000", "png/../../x"),
            record("", "../../2023-01-01T00:00:00+0000", "png"),
        ];
        for image in cases {
            assert!(
                matches!(
                    derive_file_name(&image),
                    Err(FileNameError::UnsafeName { .. })
                ),
                "{:?} should be rejected",
                image.metadata.app
            );
        }
    }

    #[test]
    fn single_dots_are_still_allowed() {
        let image = record("v1.2 beta", "2023-01-01T00:00:00+0000", "png");
        assert_eq!(derive_file_name(&image).unwrap(), "v1.2_beta_2023-01-01T00:00:00.png");
    }

    #[test]
    fn destination_is_unchanged_when_free() {
        let dir = TempDir::new().unwrap();
        let path = resolve_destination(dir.path(), "a.png", FileCollision::Rename).unwrap();
        assert_eq!(path, dir.path().join("a.png"));
    }

    #[test]
    fn rename_picks_next_free_suffix() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.png"), "first").unwrap();
        let path = resolve_destination(dir.path(), "a.png", FileCollision::Rename).unwrap();
        assert_eq!(path, dir.path().join("a (1).png"));

        fs::write(&path, "second").unwrap();
        let path = resolve_destination(dir.path(), "a.png", FileCollision::Rename).unwrap();
        assert_eq!(path, dir.path().join("a (2).png"));
    }

    #[test]
    fn overwrite_keeps_existing_path() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.png"), "first").unwrap();
        let path = resolve_destination(dir.path(), "a.png", FileCollision::Overwrite).unwrap();
        assert_eq!(path, dir.path().join("a.png"));
    }
}
