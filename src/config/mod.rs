//! Configuration module: prompts sent to the model.

mod prompts;

pub use prompts::{system_prompt, ui_prompt, DESCRIPTION_PLACEHOLDER};
