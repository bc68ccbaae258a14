//! Error type surfaced by the layout builder.

use thiserror::Error;

/// Errors that can occur when configuring or rebuilding the scene layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LayoutError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
}

pub type LayoutResult<T> = Result<T, LayoutError>;
