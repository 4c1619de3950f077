//! The UI automation seam.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use super::element::RawNode;
use super::query::ElementQuery;

/// UI backend errors.
#[derive(Error, Debug)]
pub enum UiError {
    #[error("No element matches {0}")]
    NoMatch(String),
    #[error("Unknown application: {0}")]
    UnknownApp(String),
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),
    #[error("Backend error: {0}")]
    Backend(String),
}

/// A point in screen space, both axes in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NormalizedPoint {
    pub x: f64,
    pub y: f64,
}

impl NormalizedPoint {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Snapshot, query and interaction primitives of a device.
///
/// Element handles never cross this boundary; every interaction takes a
/// fresh [`ElementQuery`] that the backend evaluates on the live UI.
#[async_trait]
pub trait UiBackend: Send + Sync {
    /// Capture the accessibility tree of an application.
    async fn snapshot(&self, app: &str) -> Result<RawNode, UiError>;

    /// Bring an application to the foreground, launching it if needed.
    async fn activate(&self, app: &str) -> Result<(), UiError>;

    /// Whether the query currently matches at least one element.
    async fn exists(&self, query: &ElementQuery) -> Result<bool, UiError>;

    async fn tap(&self, query: &ElementQuery) -> Result<(), UiError>;

    /// Press and hold the first match for `duration`.
    async fn press(&self, query: &ElementQuery, duration: Duration) -> Result<(), UiError>;

    /// Press at `from`, hold for `duration`, then drag to `to`.
    async fn press_and_drag(
        &self,
        app: &str,
        from: NormalizedPoint,
        to: NormalizedPoint,
        duration: Duration,
    ) -> Result<(), UiError>;

    /// Type text into the first match.
    async fn type_text(&self, query: &ElementQuery, text: &str) -> Result<(), UiError>;

    /// Press the device home button.
    async fn press_home(&self) -> Result<(), UiError>;

    async fn is_foreground(&self, app: &str) -> Result<bool, UiError>;
}
