//! Prompts sent to the language model.

/// Replaces a UI description once the model has acted on it.
pub const DESCRIPTION_PLACEHOLDER: &str = "(UI description omitted)";

const SYSTEM_PROMPT: &str = "You control my iPhone through me to achieve a task I give you. \
I give you a textual description of the UI and you respond with the next action. \
This is repeated until the task is done.";

const SYSTEM_PROMPT_FOOTER: &str = "You can use all apps and content on my phone to complete \
the task. Personal information must be observed using my phone. Do not make this up.";

const ACTION_MENU: &str = r#"Respond with a single action in YAML with its required arguments.

Possible actions (with required arguments):
- tap (id: the id of the view to tap)
- tap_hold (id: the id of the view to tap and hold for 1 second)
- type (id: the id of the view to enter text in, text: the text to enter)
- home (to go back to the home screen)
- done (when you are sure the task was completed)

Other required arguments:
- observation: a description of the screen, noting anything that's relevant to the task at hand
- thought: think about what needs to be done to achieve the task step by step
- action_description: a short description of the action you take

Example response:

```
observation: "I'm on the home screen where I can add a document."
thought: "I first need to look up X, then do Y."
action_description: "I tap on the button with label \"New\""
action: tap
id: 1
```"#;

/// Get the system prompt for a task.
///
/// The prompt depends on nothing but the task, so cached responses stay
/// valid across runs.
pub fn system_prompt(task: &str) -> String {
    format!("{}\n\nTask: {}\n\n{}", SYSTEM_PROMPT, task, SYSTEM_PROMPT_FOOTER)
}

/// Get the per-step prompt embedding a UI description.
pub fn ui_prompt(description: &str) -> String {
    format!("UI description:\n{}\n\n{}", description, ACTION_MENU)
}
