//! Agent module for driving the device towards a task.

mod conversation;
mod phone_pilot;

pub use conversation::Conversation;
pub use phone_pilot::{
    AgentConfig, AgentError, AgentState, Pacing, PhonePilot, RunSummary, StepOutcome,
};
