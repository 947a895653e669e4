//! Errors raised while decoding frames off the order feed.

use thiserror::Error;

/// A frame that could not be classified.
///
/// Frame errors are local to one frame: callers log and drop the frame, the
/// connection itself is unaffected.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("frame is not a JSON object: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame has no `type` field")]
    MissingType,
    #[error("`{kind}` frame is missing `{field}`")]
    MissingField {
        kind: &'static str,
        field: &'static str,
    },
}
