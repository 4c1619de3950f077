//! In-memory device backend.
//!
//! Evaluates queries against scripted accessibility trees the way XCUITest
//! does: descendants in document order, interactions on the first match.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use super::backend::{NormalizedPoint, UiBackend, UiError};
use super::element::{NodeValue, RawNode};
use super::query::{ElementQuery, QueryStep};

/// A recorded interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum Interaction {
    Activate(String),
    Tap {
        app: String,
        path: Vec<usize>,
    },
    Press {
        app: String,
        path: Vec<usize>,
        duration: Duration,
    },
    Drag {
        app: String,
        from: NormalizedPoint,
        to: NormalizedPoint,
    },
    Type {
        app: String,
        path: Vec<usize>,
        text: String,
    },
    Home,
}

/// Scripted reaction to tapping an element with a given label.
#[derive(Debug, Clone)]
pub enum TapEffect {
    /// Bring another application to the foreground.
    Launch(String),
    /// Replace the tree of an application.
    ShowScreen { app: String, tree: RawNode },
}

#[derive(Debug)]
struct DeviceState {
    home_app: String,
    apps: HashMap<String, RawNode>,
    foreground: Option<String>,
    tap_effects: HashMap<String, TapEffect>,
    interactions: Vec<Interaction>,
}

/// A device whose screens are plain [`RawNode`] trees.
#[derive(Debug)]
pub struct InMemoryDevice {
    state: Mutex<DeviceState>,
}

impl InMemoryDevice {
    /// Create a device whose home surface is `home_app` showing `home_tree`.
    pub fn new(home_app: impl Into<String>, home_tree: RawNode) -> Self {
        let home_app = home_app.into();
        let mut apps = HashMap::new();
        apps.insert(home_app.clone(), home_tree);
        Self {
            state: Mutex::new(DeviceState {
                home_app,
                apps,
                foreground: None,
                tap_effects: HashMap::new(),
                interactions: Vec::new(),
            }),
        }
    }

    /// Install or replace the tree of an application.
    pub fn set_screen(&self, app: impl Into<String>, tree: RawNode) {
        self.lock().apps.insert(app.into(), tree);
    }

    /// Current tree of an application.
    pub fn screen(&self, app: &str) -> Option<RawNode> {
        self.lock().apps.get(app).cloned()
    }

    /// React to taps on elements labelled `label`.
    pub fn on_tap(&self, label: impl Into<String>, effect: TapEffect) {
        self.lock().tap_effects.insert(label.into(), effect);
    }

    pub fn foreground(&self) -> Option<String> {
        self.lock().foreground.clone()
    }

    pub fn interactions(&self) -> Vec<Interaction> {
        self.lock().interactions.clone()
    }

    /// Child-index paths of every element the query matches, in document order.
    pub fn find_all(&self, query: &ElementQuery) -> Result<Vec<Vec<usize>>, UiError> {
        let state = self.lock();
        let root = state
            .apps
            .get(&query.app)
            .ok_or_else(|| UiError::UnknownApp(query.app.clone()))?;
        Ok(evaluate(root, query))
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        // A panic while holding the lock leaves the scripted state intact.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn first_match(state: &DeviceState, query: &ElementQuery) -> Result<Vec<usize>, UiError> {
        let root = state
            .apps
            .get(&query.app)
            .ok_or_else(|| UiError::UnknownApp(query.app.clone()))?;
        evaluate(root, query)
            .into_iter()
            .next()
            .ok_or_else(|| UiError::NoMatch(query.to_string()))
    }
}

fn evaluate(root: &RawNode, query: &ElementQuery) -> Vec<Vec<usize>> {
    let mut current: Vec<Vec<usize>> = vec![Vec::new()];
    for step in &query.steps {
        current = match step {
            QueryStep::Descendants(kind) => {
                let mut found = Vec::new();
                for path in &current {
                    if let Some(node) = root.at_path(path) {
                        collect_descendants(node, path, *kind, &mut found);
                    }
                }
                found.sort();
                found.dedup();
                found
            }
            QueryStep::Matching(predicate) => current
                .into_iter()
                .filter(|path| root.at_path(path).is_some_and(|node| predicate.matches(node)))
                .collect(),
        };
    }
    current
}

fn collect_descendants(
    node: &RawNode,
    path: &[usize],
    kind: super::element::ElementKind,
    found: &mut Vec<Vec<usize>>,
) {
    for (index, child) in node.children.iter().enumerate() {
        let mut child_path = path.to_vec();
        child_path.push(index);
        if child.kind == kind {
            found.push(child_path.clone());
        }
        collect_descendants(child, &child_path, kind, found);
    }
}

#[async_trait]
impl UiBackend for InMemoryDevice {
    async fn snapshot(&self, app: &str) -> Result<RawNode, UiError> {
        self.screen(app)
            .ok_or_else(|| UiError::UnknownApp(app.to_string()))
    }

    async fn activate(&self, app: &str) -> Result<(), UiError> {
        let mut state = self.lock();
        if !state.apps.contains_key(app) {
            return Err(UiError::UnknownApp(app.to_string()));
        }
        state.foreground = Some(app.to_string());
        state.interactions.push(Interaction::Activate(app.to_string()));
        Ok(())
    }

    async fn exists(&self, query: &ElementQuery) -> Result<bool, UiError> {
        Ok(!self.find_all(query)?.is_empty())
    }

    async fn tap(&self, query: &ElementQuery) -> Result<(), UiError> {
        let mut state = self.lock();
        let path = Self::first_match(&state, query)?;
        let label = state
            .apps
            .get(&query.app)
            .and_then(|root| root.at_path(&path))
            .and_then(|node| node.label().map(str::to_string));
        state.interactions.push(Interaction::Tap {
            app: query.app.clone(),
            path,
        });

        let effect = label.and_then(|label| state.tap_effects.get(&label).cloned());
        match effect {
            Some(TapEffect::Launch(app)) => {
                if !state.apps.contains_key(&app) {
                    return Err(UiError::UnknownApp(app));
                }
                state.foreground = Some(app);
            }
            Some(TapEffect::ShowScreen { app, tree }) => {
                state.apps.insert(app, tree);
            }
            None => {}
        }
        Ok(())
    }

    async fn press(&self, query: &ElementQuery, duration: Duration) -> Result<(), UiError> {
        let mut state = self.lock();
        let path = Self::first_match(&state, query)?;
        state.interactions.push(Interaction::Press {
            app: query.app.clone(),
            path,
            duration,
        });
        Ok(())
    }

    async fn press_and_drag(
        &self,
        app: &str,
        from: NormalizedPoint,
        to: NormalizedPoint,
        _duration: Duration,
    ) -> Result<(), UiError> {
        self.lock().interactions.push(Interaction::Drag {
            app: app.to_string(),
            from,
            to,
        });
        Ok(())
    }

    async fn type_text(&self, query: &ElementQuery, text: &str) -> Result<(), UiError> {
        let mut state = self.lock();
        let path = Self::first_match(&state, query)?;
        if let Some(node) = state
            .apps
            .get_mut(&query.app)
            .and_then(|root| root.at_path_mut(&path))
        {
            let mut value = node.text_value().unwrap_or_default().to_string();
            value.push_str(text);
            node.value = Some(NodeValue::Text(value));
        }
        state.interactions.push(Interaction::Type {
            app: query.app.clone(),
            path,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn press_home(&self) -> Result<(), UiError> {
        let mut state = self.lock();
        state.foreground = Some(state.home_app.clone());
        state.interactions.push(Interaction::Home);
        Ok(())
    }

    async fn is_foreground(&self, app: &str) -> Result<bool, UiError> {
        Ok(self.lock().foreground.as_deref() == Some(app))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ui::{ElementKind, Predicate};

    fn home() -> RawNode {
        RawNode::new(ElementKind::Application).with_child(
            RawNode::new(ElementKind::Window)
                .with_child(RawNode::new(ElementKind::Icon).with_label("Mail"))
                .with_child(
                    RawNode::new(ElementKind::Other).with_child(
                        RawNode::new(ElementKind::Icon).with_label("Notes"),
                    ),
                ),
        )
    }

    #[tokio::test]
    async fn test_descendants_in_document_order() {
        let device = InMemoryDevice::new("home", home());
        let query = ElementQuery::application("home").descendants(ElementKind::Icon);
        let paths = device.find_all(&query).unwrap();
        assert_eq!(paths, vec![vec![0, 0], vec![0, 1, 0]]);
    }

    #[tokio::test]
    async fn test_nested_descendant_steps_do_not_duplicate() {
        let tree = RawNode::new(ElementKind::Application).with_child(
            RawNode::new(ElementKind::Other).with_child(
                RawNode::new(ElementKind::Other)
                    .with_child(RawNode::new(ElementKind::Button).with_label("Go")),
            ),
        );
        let device = InMemoryDevice::new("home", tree);
        let query = ElementQuery::application("home")
            .descendants(ElementKind::Other)
            .descendants(ElementKind::Button);
        assert_eq!(device.find_all(&query).unwrap(), vec![vec![0, 0, 0]]);
    }

    #[tokio::test]
    async fn test_tap_records_first_match_and_applies_effect() {
        let device = InMemoryDevice::new("home", home());
        device.set_screen("com.example.notes", RawNode::new(ElementKind::Application));
        device.on_tap("Notes", TapEffect::Launch("com.example.notes".to_string()));

        let query = ElementQuery::application("home")
            .descendants(ElementKind::Icon)
            .matching(Predicate::for_node(&RawNode::new(ElementKind::Icon).with_label("Notes")));
        device.tap(&query).await.unwrap();

        assert_eq!(device.foreground().as_deref(), Some("com.example.notes"));
        assert_eq!(
            device.interactions(),
            vec![Interaction::Tap {
                app: "home".to_string(),
                path: vec![0, 1, 0]
            }]
        );
    }

    #[tokio::test]
    async fn test_tap_without_match_fails() {
        let device = InMemoryDevice::new("home", home());
        let query = ElementQuery::application("home").descendants(ElementKind::Button);
        assert!(matches!(device.tap(&query).await, Err(UiError::NoMatch(_))));
    }

    #[tokio::test]
    async fn test_type_text_appends_to_value() {
        let tree = RawNode::new(ElementKind::Application)
            .with_child(RawNode::new(ElementKind::TextField).with_identifier("to"));
        let device = InMemoryDevice::new("home", tree);
        let query = ElementQuery::application("home")
            .descendants(ElementKind::TextField)
            .matching(Predicate::identifier("to"));

        device.type_text(&query, "h").await.unwrap();
        device.type_text(&query, "i").await.unwrap();

        let screen = device.screen("home").unwrap();
        assert_eq!(screen.children[0].text_value(), Some("hi"));
    }

    #[tokio::test]
    async fn test_home_and_foreground() {
        let device = InMemoryDevice::new("home", home());
        device.set_screen("com.example.app", RawNode::new(ElementKind::Application));
        device.activate("com.example.app").await.unwrap();
        assert!(device.is_foreground("com.example.app").await.unwrap());

        device.press_home().await.unwrap();
        assert!(device.is_foreground("home").await.unwrap());
        assert!(!device.is_foreground("com.example.app").await.unwrap());
    }

    #[tokio::test]
    async fn test_activate_unknown_app() {
        let device = InMemoryDevice::new("home", home());
        assert!(matches!(
            device.activate("com.missing").await,
            Err(UiError::UnknownApp(_))
        ));
    }
}
