//! Error types for huruf.
//!
//! Nothing here ever halts a scan: platform errors are logged per node as
//! [`PlatformError`](crate::platform::PlatformError), store errors fall back
//! to default settings, and malformed change notifications are dropped.

use miette::Diagnostic;

/// Main error type for huruf operations.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum HurufError {
    /// The settings store could not be read or written.
    #[error("settings store error: {0}")]
    #[diagnostic(
        code(huruf::store),
        help("the defaults (130% size, 190% line height, Droid Arabic Naskh) are used instead")
    )]
    Store(String),

    /// A change notification did not have the `{ key: { newValue, oldValue } }` shape.
    #[error(transparent)]
    #[diagnostic(code(huruf::serde))]
    Serde(#[from] serde_json::Error),
}

impl HurufError {
    pub fn store(message: impl Into<String>) -> Self {
        HurufError::Store(message.into())
    }
}

pub type Result<T, E = HurufError> = std::result::Result<T, E>;
