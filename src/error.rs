use thiserror::Error;

/// Raised when an image record cannot be turned into a local file name.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FileNameError {
    #[error("created_at {created_at:?} of image {image_id} is shorter than 5 characters")]
    TimestampTooShort { image_id: String, created_at: String },

    /// The derived name would leave the output directory or is not a
    /// single path component.
    #[error("derived file name {name:?} of image {image_id} is not a plain file name")]
    UnsafeName { image_id: String, name: String },
}
