//! Parsing model replies into actions.

use serde_yaml::{Mapping, Value};
use thiserror::Error;

/// Reply parsing errors. All of them end the run.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("Could not parse response: {0}")]
    ParseError(String),
    #[error("Parsed YAML is not a mapping")]
    NotAMapping,
    #[error("Response has no action")]
    MissingAction,
    #[error("Unknown action: {0}")]
    UnknownAction(String),
    #[error("Missing required parameter for {action}: {parameter}")]
    MissingParameter {
        action: &'static str,
        parameter: &'static str,
    },
}

/// The closed set of actions the model may request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Tap { id: usize },
    TapHold { id: usize },
    Type { id: usize, text: String },
    Home,
    Done,
}

impl Action {
    /// Name of the action as it appears in replies.
    pub fn name(&self) -> &'static str {
        match self {
            Action::Tap { .. } => "tap",
            Action::TapHold { .. } => "tap_hold",
            Action::Type { .. } => "type",
            Action::Home => "home",
            Action::Done => "done",
        }
    }

    /// The described element the action targets, if any.
    pub fn target(&self) -> Option<usize> {
        match self {
            Action::Tap { id } | Action::TapHold { id } | Action::Type { id, .. } => Some(*id),
            Action::Home | Action::Done => None,
        }
    }
}

/// A validated model reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelReply {
    pub observation: Option<String>,
    pub thought: Option<String>,
    pub action_description: Option<String>,
    pub action: Action,
}

/// Parse a YAML reply, unwrapping a surrounding Markdown code fence first.
///
/// ```text
/// observation: "I'm on the home screen."
/// thought: "Open Settings first."
/// action_description: "I tap on the Settings icon"
/// action: tap
/// id: 12
/// ```
pub fn parse_reply(response: &str) -> Result<ModelReply, ActionError> {
    let payload: Value = serde_yaml::from_str(strip_code_fence(response))
        .map_err(|e| ActionError::ParseError(e.to_string()))?;
    let map = payload.as_mapping().ok_or(ActionError::NotAMapping)?;

    let name = match map.get("action") {
        Some(Value::String(name)) => name.as_str(),
        Some(Value::Null) | None => return Err(ActionError::MissingAction),
        Some(other) => {
            return Err(ActionError::UnknownAction(
                scalar_text(other).unwrap_or_default(),
            ))
        }
    };

    let action = match name {
        "tap" => Action::Tap {
            id: element_id(map, "tap")?,
        },
        "tap_hold" => Action::TapHold {
            id: element_id(map, "tap_hold")?,
        },
        "type" => Action::Type {
            id: element_id(map, "type")?,
            text: map
                .get("text")
                .and_then(scalar_text)
                .ok_or(ActionError::MissingParameter {
                    action: "type",
                    parameter: "text",
                })?,
        },
        "home" => Action::Home,
        "done" => Action::Done,
        other => return Err(ActionError::UnknownAction(other.to_string())),
    };

    Ok(ModelReply {
        observation: narrative(map, "observation"),
        thought: narrative(map, "thought"),
        action_description: narrative(map, "action_description"),
        action,
    })
}

fn element_id(map: &Mapping, action: &'static str) -> Result<usize, ActionError> {
    map.get("id")
        .and_then(Value::as_u64)
        .and_then(|id| usize::try_from(id).ok())
        .ok_or(ActionError::MissingParameter {
            action,
            parameter: "id",
        })
}

fn narrative(map: &Mapping, key: &str) -> Option<String> {
    map.get(key).and_then(scalar_text).filter(|text| !text.is_empty())
}

/// Text of a scalar; unquoted numbers and flags are accepted as text.
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        _ => None,
    }
}

/// Strip one surrounding ``` fence (with optional language tag).
fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return response;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.strip_suffix("```").unwrap_or(body).trim_end()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_tap_with_narrative() {
        let reply = parse_reply(
            "observation: \"I'm on the home screen.\"\n\
             thought: \"Open Settings.\"\n\
             action_description: \"I tap on the button with label \\\"Settings\\\"\"\n\
             action: tap\n\
             id: 12\n",
        )
        .unwrap();
        assert_eq!(reply.action, Action::Tap { id: 12 });
        assert_eq!(reply.observation.as_deref(), Some("I'm on the home screen."));
        assert_eq!(reply.thought.as_deref(), Some("Open Settings."));
        assert_eq!(
            reply.action_description.as_deref(),
            Some("I tap on the button with label \"Settings\"")
        );
    }

    #[test]
    fn test_parse_each_action() {
        assert_eq!(
            parse_reply("action: tap_hold\nid: 3").unwrap().action,
            Action::TapHold { id: 3 }
        );
        assert_eq!(
            parse_reply("action: type\nid: 4\ntext: \"hello world\"")
                .unwrap()
                .action,
            Action::Type {
                id: 4,
                text: "hello world".to_string()
            }
        );
        assert_eq!(parse_reply("action: home").unwrap().action, Action::Home);
        assert_eq!(parse_reply("action: done").unwrap().action, Action::Done);
    }

    #[test]
    fn test_narrative_is_optional() {
        let reply = parse_reply("action: home").unwrap();
        assert_eq!(reply.observation, None);
        assert_eq!(reply.thought, None);
        assert_eq!(reply.action_description, None);
    }

    #[test]
    fn test_numeric_text_is_accepted() {
        assert_eq!(
            parse_reply("action: type\nid: 2\ntext: 1234").unwrap().action,
            Action::Type {
                id: 2,
                text: "1234".to_string()
            }
        );
    }

    #[test]
    fn test_fenced_reply() {
        let fenced = "```yaml\naction: tap\nid: 1\n```";
        assert_eq!(parse_reply(fenced).unwrap().action, Action::Tap { id: 1 });

        let bare_fence = "```\naction: done\n```\n";
        assert_eq!(parse_reply(bare_fence).unwrap().action, Action::Done);
    }

    #[test]
    fn test_invalid_yaml() {
        assert!(matches!(
            parse_reply("action: [tap"),
            Err(ActionError::ParseError(_))
        ));
    }

    #[test]
    fn test_not_a_mapping() {
        assert_eq!(parse_reply("- tap\n- 1"), Err(ActionError::NotAMapping));
        assert_eq!(parse_reply("just some prose"), Err(ActionError::NotAMapping));
    }

    #[test]
    fn test_missing_or_unknown_action() {
        assert_eq!(parse_reply("id: 3"), Err(ActionError::MissingAction));
        assert_eq!(
            parse_reply("action: swipe"),
            Err(ActionError::UnknownAction("swipe".to_string()))
        );
    }

    #[test]
    fn test_missing_parameters() {
        assert_eq!(
            parse_reply("action: tap"),
            Err(ActionError::MissingParameter {
                action: "tap",
                parameter: "id"
            })
        );
        assert_eq!(
            parse_reply("action: tap\nid: \"3\""),
            Err(ActionError::MissingParameter {
                action: "tap",
                parameter: "id"
            })
        );
        assert_eq!(
            parse_reply("action: type\nid: 3"),
            Err(ActionError::MissingParameter {
                action: "type",
                parameter: "text"
            })
        );
        assert_eq!(
            parse_reply("action: tap_hold\nid: -1"),
            Err(ActionError::MissingParameter {
                action: "tap_hold",
                parameter: "id"
            })
        );
    }

    #[test]
    fn test_action_target() {
        assert_eq!(Action::Tap { id: 7 }.target(), Some(7));
        assert_eq!(Action::Home.target(), None);
        assert_eq!(Action::TapHold { id: 1 }.name(), "tap_hold");
    }
}
