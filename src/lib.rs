// Copyright 2025 Zhipu AI (Original Python implementation)
// Copyright 2025 ModerRAS (Rust implementation)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! # Phone Pilot
//!
//! Language-model driven agent for automating iOS devices.
//!
//! Every step captures the accessibility tree of the active app, compresses
//! it into a short numbered description, asks a chat model for the next
//! action and maps the chosen number back to a live element query.
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use phone_pilot::{AgentConfig, FileCache, ModelClient, ModelConfig, PhonePilot, WdaClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let model_config = ModelConfig::default().with_api_key("sk-...");
//!     let backend = WdaClient::connect("http://localhost:8100").await?;
//!     let cache = FileCache::new("/tmp/phone-pilot-cache")?;
//!
//!     let mut pilot = PhonePilot::new(
//!         Arc::new(backend),
//!         Arc::new(ModelClient::new(model_config.clone())),
//!         Arc::new(cache),
//!         model_config,
//!         AgentConfig::default(),
//!     );
//!     let summary = pilot.run("Set an alarm for 7am").await?;
//!
//!     println!("Finished after {} actions", summary.actions);
//!     Ok(())
//! }
//! ```

pub mod actions;
pub mod agent;
pub mod cache;
pub mod config;
pub mod model;
pub mod settings;
pub mod tree;
pub mod ui;

pub use actions::{parse_reply, Action, ActionError, ActionHandler, ModelReply};
pub use agent::{
    AgentConfig, AgentError, AgentState, Conversation, Pacing, PhonePilot, RunSummary,
    StepOutcome,
};
pub use cache::{fingerprint, CacheError, FileCache, MemoryCache, ResponseCache};
pub use model::{ChatMessage, ChatModel, ChatRequest, ModelClient, ModelConfig, ModelError, Role};
pub use settings::AppSettings;
pub use tree::{compress, render, resolve, CompactNode, ResolveError};
pub use ui::{ElementKind, ElementQuery, InMemoryDevice, RawNode, UiBackend, UiError, WdaClient};
