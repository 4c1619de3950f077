//! Executes parsed actions against the live UI.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::reply::Action;
use crate::tree::{resolve, CompactNode, ResolveError};
use crate::ui::{UiBackend, UiError};

/// How long `tap_hold` keeps the element pressed.
pub const HOLD_DURATION: Duration = Duration::from_secs(1);

/// Action execution errors.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// The target number does not exist in the described tree.
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    /// The live UI rejected the interaction.
    #[error(transparent)]
    Ui(#[from] UiError),
}

/// Handles execution of actions from model replies.
///
/// Every interaction re-derives its element query from the compact tree the
/// model was shown; no element handles are kept between calls.
pub struct ActionHandler {
    backend: Arc<dyn UiBackend>,
}

impl ActionHandler {
    pub fn new(backend: Arc<dyn UiBackend>) -> Self {
        Self { backend }
    }

    /// Execute an action inside `app`. `done` is a no-op.
    pub async fn execute(
        &self,
        action: &Action,
        tree: &CompactNode<'_>,
        app: &str,
    ) -> Result<(), ExecutionError> {
        match action {
            Action::Tap { id } => {
                let query = resolve(tree, *id, app)?;
                tracing::debug!(id, query = %query, "Tap");
                self.backend.tap(&query).await?;
            }
            Action::TapHold { id } => {
                let query = resolve(tree, *id, app)?;
                tracing::debug!(id, query = %query, "Tap and hold");
                self.backend.press(&query, HOLD_DURATION).await?;
            }
            Action::Type { id, text } => self.handle_type(tree, *id, text, app).await?,
            Action::Home => self.backend.press_home().await?,
            Action::Done => {}
        }
        Ok(())
    }

    /// Focus the field, then enter the text one character at a time,
    /// re-resolving the field before every character.
    async fn handle_type(
        &self,
        tree: &CompactNode<'_>,
        id: usize,
        text: &str,
        app: &str,
    ) -> Result<(), ExecutionError> {
        let mut target = resolve(tree, id, app)?;
        tracing::debug!(id, query = %target, chars = text.chars().count(), "Type");
        self.backend.tap(&target).await?;

        let mut buf = [0u8; 4];
        for c in text.chars() {
            self.backend
                .type_text(&target, c.encode_utf8(&mut buf))
                .await?;
            target = resolve(tree, id, app)?.without_target_value();
        }
        Ok(())
    }
}
