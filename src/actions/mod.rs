//! Actions module: parsing model replies and executing them.

mod handler;
mod reply;

pub use handler::{ActionHandler, ExecutionError, HOLD_DURATION};
pub use reply::{parse_reply, Action, ActionError, ModelReply};
