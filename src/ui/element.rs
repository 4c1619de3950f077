//! Accessibility tree snapshot types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a UI element, mirroring XCUITest element types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementKind {
    Application,
    Window,
    Other,
    Group,
    Button,
    Cell,
    Icon,
    Image,
    Link,
    NavigationBar,
    ScrollView,
    SearchField,
    StaticText,
    StatusBar,
    Switch,
    TabBar,
    Table,
    CollectionView,
    TextField,
    SecureTextField,
    TextView,
    Keyboard,
    Key,
    Alert,
    Sheet,
    Toolbar,
}

const ALL_KINDS: &[ElementKind] = &[
    ElementKind::Application,
    ElementKind::Window,
    ElementKind::Other,
    ElementKind::Group,
    ElementKind::Button,
    ElementKind::Cell,
    ElementKind::Icon,
    ElementKind::Image,
    ElementKind::Link,
    ElementKind::NavigationBar,
    ElementKind::ScrollView,
    ElementKind::SearchField,
    ElementKind::StaticText,
    ElementKind::StatusBar,
    ElementKind::Switch,
    ElementKind::TabBar,
    ElementKind::Table,
    ElementKind::CollectionView,
    ElementKind::TextField,
    ElementKind::SecureTextField,
    ElementKind::TextView,
    ElementKind::Keyboard,
    ElementKind::Key,
    ElementKind::Alert,
    ElementKind::Sheet,
    ElementKind::Toolbar,
];

impl ElementKind {
    /// Short XCUITest type name, e.g. `Button` for `XCUIElementTypeButton`.
    pub fn type_name(&self) -> &'static str {
        match self {
            ElementKind::Application => "Application",
            ElementKind::Window => "Window",
            ElementKind::Other => "Other",
            ElementKind::Group => "Group",
            ElementKind::Button => "Button",
            ElementKind::Cell => "Cell",
            ElementKind::Icon => "Icon",
            ElementKind::Image => "Image",
            ElementKind::Link => "Link",
            ElementKind::NavigationBar => "NavigationBar",
            ElementKind::ScrollView => "ScrollView",
            ElementKind::SearchField => "SearchField",
            ElementKind::StaticText => "StaticText",
            ElementKind::StatusBar => "StatusBar",
            ElementKind::Switch => "Switch",
            ElementKind::TabBar => "TabBar",
            ElementKind::Table => "Table",
            ElementKind::CollectionView => "CollectionView",
            ElementKind::TextField => "TextField",
            ElementKind::SecureTextField => "SecureTextField",
            ElementKind::TextView => "TextView",
            ElementKind::Keyboard => "Keyboard",
            ElementKind::Key => "Key",
            ElementKind::Alert => "Alert",
            ElementKind::Sheet => "Sheet",
            ElementKind::Toolbar => "Toolbar",
        }
    }

    /// Full XCUITest class name used in class chain queries.
    pub fn xcui_type(&self) -> String {
        format!("XCUIElementType{}", self.type_name())
    }

    /// Parse either the short (`Button`) or full (`XCUIElementTypeButton`) type name.
    ///
    /// Unknown types map to [`ElementKind::Other`].
    pub fn from_type_name(name: &str) -> Self {
        let short = name.strip_prefix("XCUIElementType").unwrap_or(name);
        ALL_KINDS
            .iter()
            .copied()
            .find(|kind| kind.type_name() == short)
            .unwrap_or(ElementKind::Other)
    }

    /// Label shown to the model in the UI description.
    pub fn description_label(&self) -> &'static str {
        match self {
            ElementKind::Application => "Application",
            ElementKind::Button => "Button",
            ElementKind::Cell => "Cell",
            ElementKind::Icon => "Icon",
            ElementKind::Link => "Link",
            ElementKind::NavigationBar => "Navigation Bar",
            ElementKind::ScrollView => "Scroll View",
            ElementKind::SearchField => "Search Field",
            ElementKind::TabBar => "Tab Bar",
            ElementKind::TextField => "TextField",
            ElementKind::TextView => "TextView",
            ElementKind::StaticText => "Text",
            _ => "Other",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

/// Loosely typed display value of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NodeValue {
    Flag(bool),
    Number(f64),
    Text(String),
}

impl NodeValue {
    /// The value as text, if it is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            NodeValue::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl fmt::Display for NodeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeValue::Flag(flag) => write!(f, "{}", flag),
            NodeValue::Number(n) => write!(f, "{}", n),
            NodeValue::Text(text) => f.write_str(text),
        }
    }
}

/// One node of an accessibility snapshot.
///
/// Snapshots are read-only and only meaningful until the next snapshot is taken.
#[derive(Debug, Clone, PartialEq)]
pub struct RawNode {
    pub kind: ElementKind,
    pub identifier: Option<String>,
    pub label: Option<String>,
    pub value: Option<NodeValue>,
    pub enabled: bool,
    pub selected: bool,
    pub children: Vec<RawNode>,
}

impl RawNode {
    /// Create an enabled, unselected node without attributes or children.
    pub fn new(kind: ElementKind) -> Self {
        Self {
            kind,
            identifier: None,
            label: None,
            value: None,
            enabled: true,
            selected: false,
            children: Vec::new(),
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_value(mut self, value: NodeValue) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_text_value(self, value: impl Into<String>) -> Self {
        self.with_value(NodeValue::Text(value.into()))
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn selected(mut self) -> Self {
        self.selected = true;
        self
    }

    pub fn with_child(mut self, child: RawNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = RawNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Identifier, if present and non-empty.
    pub fn identifier(&self) -> Option<&str> {
        non_empty(self.identifier.as_deref())
    }

    /// Label, if present and non-empty.
    pub fn label(&self) -> Option<&str> {
        non_empty(self.label.as_deref())
    }

    /// Textual value, if present and non-empty.
    pub fn text_value(&self) -> Option<&str> {
        non_empty(self.value.as_ref().and_then(NodeValue::as_text))
    }

    /// Look up a descendant by child-index path.
    pub fn at_path(&self, path: &[usize]) -> Option<&RawNode> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get(index))
    }

    /// Mutable variant of [`RawNode::at_path`].
    pub fn at_path_mut(&mut self, path: &[usize]) -> Option<&mut RawNode> {
        path.iter()
            .try_fold(self, |node, &index| node.children.get_mut(index))
    }
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.is_empty())
}
