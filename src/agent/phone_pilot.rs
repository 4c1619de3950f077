//! The agent loop that drives a device towards a task.

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

use super::conversation::Conversation;
use crate::actions::{parse_reply, Action, ActionError, ActionHandler, ExecutionError, ModelReply};
use crate::cache::{fingerprint, ResponseCache};
use crate::config::{system_prompt, ui_prompt};
use crate::model::{ChatModel, ModelConfig};
use crate::tree::{compress, render, ResolveError};
use crate::ui::{app_switcher_query, NormalizedPoint, UiBackend, UiError, HOME_BUNDLE_ID};

static CARD_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"card:([a-zA-Z0-9\.]+):sceneID").expect("valid card pattern"));

/// Where the swipe that dismisses the app switcher starts and ends.
const SWIPE_FROM: NormalizedPoint = NormalizedPoint::new(0.5, 1.0);
const SWIPE_TO: NormalizedPoint = NormalizedPoint::new(0.5, 0.5);
const SWIPE_PRESS: Duration = Duration::from_millis(200);

/// Agent errors.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The model's reply could not be turned into an action.
    #[error("Failed to interpret response: {0}")]
    Action(#[from] ActionError),
    /// The chosen number is not part of the tree the model was shown.
    #[error("Failed to address element: {0}")]
    Resolve(#[from] ResolveError),
    #[error("UI backend error: {0}")]
    Ui(#[from] UiError),
    #[error("Max steps reached ({0})")]
    MaxStepsReached(u32),
}

/// Delays between the agent's interactions with the device and the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pacing {
    /// Wait before retrying a transient failure.
    pub retry: Duration,
    /// Wait after an action for the UI to settle.
    pub settle: Duration,
    /// Wait after a response arrives.
    pub after_response: Duration,
    /// Simulated model latency on a cache hit.
    pub cache_hit: Duration,
    /// Pause around the swipe that leaves the app switcher.
    pub switcher: Duration,
}

impl Default for Pacing {
    fn default() -> Self {
        Self {
            retry: Duration::from_secs(1),
            settle: Duration::from_secs(1),
            after_response: Duration::from_millis(500),
            cache_hit: Duration::from_secs(1),
            switcher: Duration::from_secs(1),
        }
    }
}

impl Pacing {
    /// No delays at all.
    pub fn none() -> Self {
        Self {
            retry: Duration::ZERO,
            settle: Duration::ZERO,
            after_response: Duration::ZERO,
            cache_hit: Duration::ZERO,
            switcher: Duration::ZERO,
        }
    }
}

/// Configuration for the PhonePilot.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Bundle id of the home surface.
    pub home_app: String,
    /// Whether to print the run to stdout.
    pub verbose: bool,
    /// Optional cap on loop iterations; unlimited when `None`.
    pub max_steps: Option<u32>,
    pub pacing: Pacing,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            home_app: HOME_BUNDLE_ID.to_string(),
            verbose: true,
            max_steps: None,
            pacing: Pacing::default(),
        }
    }
}

impl AgentConfig {
    pub fn with_home_app(mut self, home_app: impl Into<String>) -> Self {
        self.home_app = home_app.into();
        self
    }

    /// Create a new AgentConfig with custom max steps.
    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    /// Create a new AgentConfig with verbose output disabled.
    pub fn quiet(mut self) -> Self {
        self.verbose = false;
        self
    }
}

/// Where the agent is in its loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentState {
    Foreground(String),
    AppSwitcher,
    AwaitingModel,
    Done,
    Failed(String),
}

/// What a single step achieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// A transient problem; the step should simply be repeated.
    Retry(String),
    /// The app switcher revealed the launched app, which is now active.
    Switched(String),
    /// An action was executed.
    Acted(Action),
    /// The model declared the task complete.
    Done,
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Loop iterations, including retries.
    pub steps: u32,
    /// Actions executed on the device.
    pub actions: u32,
    /// The active app when the model declared the task done.
    pub app: String,
}

/// Language-model driven agent for iOS devices.
///
/// Each step snapshots the active app, compresses the accessibility tree
/// into a numbered description, asks the model for the next action and
/// executes it.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use phone_pilot::{AgentConfig, MemoryCache, ModelClient, ModelConfig, PhonePilot, WdaClient};
///
/// #[tokio::main]
/// async fn main() -> anyhow::Result<()> {
///     let model_config = ModelConfig::default().with_api_key("sk-...");
///     let backend = Arc::new(WdaClient::connect("http://localhost:8100").await?);
///     let model = Arc::new(ModelClient::new(model_config.clone()));
///
///     let mut pilot = PhonePilot::new(
///         backend,
///         model,
///         Arc::new(MemoryCache::new()),
///         model_config,
///         AgentConfig::default(),
///     );
///     let summary = pilot.run("Turn on dark mode").await?;
///     println!("Done after {} actions", summary.actions);
///     Ok(())
/// }
/// ```
pub struct PhonePilot {
    backend: Arc<dyn UiBackend>,
    model: Arc<dyn ChatModel>,
    cache: Arc<dyn ResponseCache>,
    model_config: ModelConfig,
    config: AgentConfig,
    action_handler: ActionHandler,
    conversation: Conversation,
    app: String,
    state: AgentState,
    step_count: u32,
    action_count: u32,
}

impl PhonePilot {
    pub fn new(
        backend: Arc<dyn UiBackend>,
        model: Arc<dyn ChatModel>,
        cache: Arc<dyn ResponseCache>,
        model_config: ModelConfig,
        config: AgentConfig,
    ) -> Self {
        let app = config.home_app.clone();
        Self {
            action_handler: ActionHandler::new(backend.clone()),
            backend,
            model,
            cache,
            model_config,
            conversation: Conversation::default(),
            state: AgentState::Foreground(app.clone()),
            app,
            config,
            step_count: 0,
            action_count: 0,
        }
    }

    /// Run the agent until the model declares the task done.
    ///
    /// Transient failures are retried indefinitely unless `max_steps` is
    /// configured.
    pub async fn run(&mut self, task: &str) -> Result<RunSummary, AgentError> {
        self.start(task).await?;

        loop {
            if let Some(max_steps) = self.config.max_steps {
                if self.step_count >= max_steps {
                    self.state = AgentState::Failed("max steps reached".to_string());
                    return Err(AgentError::MaxStepsReached(max_steps));
                }
            }

            if self.step().await? == StepOutcome::Done {
                let summary = RunSummary {
                    steps: self.step_count,
                    actions: self.action_count,
                    app: self.app.clone(),
                };
                if self.config.verbose {
                    println!("\n🎉 {}", "=".repeat(48));
                    println!(
                        "✅ Task completed: {} steps, {} actions",
                        summary.steps, summary.actions
                    );
                    println!("{}\n", "=".repeat(50));
                }
                return Ok(summary);
            }
        }
    }

    /// Reset the conversation for a task and bring up the home surface.
    pub async fn start(&mut self, task: &str) -> Result<(), AgentError> {
        self.conversation = Conversation::new(system_prompt(task));
        self.step_count = 0;
        self.action_count = 0;
        self.app = self.config.home_app.clone();
        self.backend.activate(&self.app).await?;
        self.state = AgentState::Foreground(self.app.clone());
        tracing::info!(task, app = %self.app, "Starting task");
        Ok(())
    }

    /// Execute a single iteration of the loop.
    pub async fn step(&mut self) -> Result<StepOutcome, AgentError> {
        self.step_count += 1;
        self.state = AgentState::Foreground(self.app.clone());
        let pacing = self.config.pacing.clone();

        let snapshot = match self.backend.snapshot(&self.app).await {
            Ok(snapshot) => snapshot,
            Err(e) => return Ok(self.retry(format!("Snapshot failed: {}", e)).await),
        };
        let Some(tree) = compress(&snapshot) else {
            return Ok(self
                .retry(format!("Could not make description of {}", self.app))
                .await);
        };
        let description = render(&tree);

        match self.backend.exists(&app_switcher_query(&self.app)).await {
            Ok(true) => return self.leave_app_switcher(&description).await,
            Ok(false) => {}
            Err(e) => return Ok(self.retry(format!("App switcher check failed: {}", e)).await),
        }

        if self.config.verbose {
            println!("\n{}", "=".repeat(50));
            println!("📱 Screen ({}):", self.app);
            println!("{}", "-".repeat(50));
            println!("{}", description);
        }

        self.conversation.push_description(ui_prompt(&description));
        let request = self.model_config.request(self.conversation.messages().to_vec());
        let key = fingerprint(&request);
        self.state = AgentState::AwaitingModel;

        let response = match self.cache.get(&key).await {
            Some(cached) => {
                tracing::info!(key = %key, "Using cached response");
                pause(pacing.cache_hit).await;
                cached
            }
            None => match self.model.complete(&request).await {
                Ok(response) => response,
                Err(e) => {
                    self.conversation.discard_pending();
                    return Ok(self.retry(format!("Model request failed: {}", e)).await);
                }
            },
        };

        pause(pacing.after_response).await;

        let reply = match parse_reply(&response) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, response = %response, "Could not interpret response");
                self.state = AgentState::Failed(e.to_string());
                return Err(AgentError::Action(e));
            }
        };
        self.narrate(&reply);

        if reply.action == Action::Done {
            tracing::info!(steps = self.step_count, "Model reports the task is done");
            self.state = AgentState::Done;
            return Ok(StepOutcome::Done);
        }

        match self
            .action_handler
            .execute(&reply.action, &tree, &self.app)
            .await
        {
            Ok(()) => {}
            Err(ExecutionError::Resolve(e)) => {
                tracing::error!(error = %e, "Resolver could not find element");
                self.state = AgentState::Failed(e.to_string());
                return Err(AgentError::Resolve(e));
            }
            Err(ExecutionError::Ui(e)) => {
                self.conversation.discard_pending();
                return Ok(self.retry(format!("Interaction failed: {}", e)).await);
            }
        }
        self.action_count += 1;

        if let Err(e) = self.cache.set(&key, &response).await {
            tracing::warn!(error = %e, "Failed to cache response");
        }
        self.conversation.compact(response);

        pause(pacing.settle).await;
        self.ensure_foreground().await;

        Ok(StepOutcome::Acted(reply.action))
    }

    /// Switch to the app whose card the switcher shows, or swipe it away.
    async fn leave_app_switcher(&mut self, description: &str) -> Result<StepOutcome, AgentError> {
        self.state = AgentState::AppSwitcher;
        let pacing = self.config.pacing.clone();

        let card = CARD_PATTERN
            .captures_iter(description)
            .last()
            .map(|captures| captures[1].to_string());

        if let Some(bundle) = card {
            tracing::info!(app = %bundle, "Switching to app from app switcher");
            self.app = bundle;
            if let Err(e) = self.backend.activate(&self.app).await {
                return Ok(self.retry(format!("Could not activate {}: {}", self.app, e)).await);
            }
            self.state = AgentState::Foreground(self.app.clone());
            return Ok(StepOutcome::Switched(self.app.clone()));
        }

        tracing::warn!("Did not find app in app switcher");
        self.app = self.config.home_app.clone();
        if let Err(e) = self.backend.activate(&self.app).await {
            tracing::warn!(error = %e, "Could not activate home surface");
        }
        pause(pacing.switcher).await;
        if let Err(e) = self
            .backend
            .press_and_drag(&self.app, SWIPE_FROM, SWIPE_TO, SWIPE_PRESS)
            .await
        {
            tracing::warn!(error = %e, "Swipe out of app switcher failed");
        }
        pause(pacing.switcher).await;
        Ok(StepOutcome::Retry("app switcher without app card".to_string()))
    }

    /// Fall back to the home surface when the active app lost the foreground.
    async fn ensure_foreground(&mut self) {
        match self.backend.is_foreground(&self.app).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::info!(app = %self.app, "App left the foreground, returning home");
                self.app = self.config.home_app.clone();
                if let Err(e) = self.backend.activate(&self.app).await {
                    tracing::warn!(error = %e, "Could not activate home surface");
                }
            }
            Err(e) => tracing::warn!(error = %e, "Foreground check failed"),
        }
    }

    async fn retry(&mut self, reason: String) -> StepOutcome {
        tracing::warn!(step = self.step_count, "{}", reason);
        self.state = AgentState::Foreground(self.app.clone());
        pause(self.config.pacing.retry).await;
        StepOutcome::Retry(reason)
    }

    fn narrate(&self, reply: &ModelReply) {
        if !self.config.verbose {
            return;
        }
        println!("{}", "-".repeat(50));
        if let Some(observation) = &reply.observation {
            println!("👀 Observation: {}", observation);
        }
        if let Some(thought) = &reply.thought {
            println!("💭 Thought: {}", thought);
        }
        if let Some(description) = &reply.action_description {
            println!("📝 {}", description);
        }
        println!("🎯 Action: {}", action_summary(&reply.action));
        println!("{}\n", "=".repeat(50));
    }

    /// Get the current conversation.
    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    /// Get the bundle id of the active app.
    pub fn app(&self) -> &str {
        &self.app
    }

    /// Get the current step count.
    pub fn step_count(&self) -> u32 {
        self.step_count
    }
}

/// One-line form of an action for narration, e.g. `tap (id: 3)`.
fn action_summary(action: &Action) -> String {
    match (action.target(), action) {
        (Some(id), Action::Type { text, .. }) => {
            format!("{} (id: {}, text: {:?})", action.name(), id, text)
        }
        (Some(id), _) => format!("{} (id: {})", action.name(), id),
        (None, _) => action.name().to_string(),
    }
}

async fn pause(duration: Duration) {
    if !duration.is_zero() {
        sleep(duration).await;
    }
}
