//! Live element queries.
//!
//! A query never holds a live element. It is a recipe that the backend
//! evaluates against whatever the screen shows at interaction time.

use std::fmt;

use super::element::{ElementKind, RawNode};

/// A single attribute comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    Identifier(String),
    Label(String),
    Value(String),
}

impl Clause {
    /// Whether the node satisfies this clause.
    pub fn matches(&self, node: &RawNode) -> bool {
        match self {
            Clause::Identifier(id) => node.identifier.as_deref() == Some(id.as_str()),
            Clause::Label(label) => node.label.as_deref() == Some(label.as_str()),
            Clause::Value(value) => node.text_value() == Some(value.as_str()),
        }
    }

    fn class_chain_attribute(&self) -> (&'static str, &str) {
        match self {
            Clause::Identifier(id) => ("name", id),
            Clause::Label(label) => ("label", label),
            Clause::Value(value) => ("value", value),
        }
    }
}

/// AND-combination of clauses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Predicate {
    pub clauses: Vec<Clause>,
}

impl Predicate {
    /// Build the identity predicate of a node from its non-empty identifier,
    /// label and textual value.
    pub fn for_node(node: &RawNode) -> Self {
        let mut clauses = Vec::new();
        if let Some(id) = node.identifier() {
            clauses.push(Clause::Identifier(id.to_string()));
        }
        if let Some(label) = node.label() {
            clauses.push(Clause::Label(label.to_string()));
        }
        if let Some(value) = node.text_value() {
            clauses.push(Clause::Value(value.to_string()));
        }
        Self { clauses }
    }

    pub fn identifier(id: impl Into<String>) -> Self {
        Self {
            clauses: vec![Clause::Identifier(id.into())],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, node: &RawNode) -> bool {
        self.clauses.iter().all(|clause| clause.matches(node))
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .clauses
            .iter()
            .map(|clause| {
                let (attribute, expected) = clause.class_chain_attribute();
                format!("{} == {}", attribute, quote(expected))
            })
            .collect();
        f.write_str(&parts.join(" AND "))
    }
}

/// One refinement step of a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryStep {
    /// All descendants of the current matches with the given kind.
    Descendants(ElementKind),
    /// Keep only the current matches satisfying the predicate.
    Matching(Predicate),
}

/// A query scoped to one application, refined step by step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementQuery {
    pub app: String,
    pub steps: Vec<QueryStep>,
}

impl ElementQuery {
    /// Query matching the application element itself.
    pub fn application(app: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            steps: Vec::new(),
        }
    }

    pub fn descendants(mut self, kind: ElementKind) -> Self {
        self.steps.push(QueryStep::Descendants(kind));
        self
    }

    /// Narrow by predicate; an empty predicate leaves the query unchanged.
    pub fn matching(mut self, predicate: Predicate) -> Self {
        if !predicate.is_empty() {
            self.steps.push(QueryStep::Matching(predicate));
        }
        self
    }

    /// Drop value clauses from the target's own predicate.
    ///
    /// Typing changes the target's value, so a query that pins the old value
    /// stops matching after the first character.
    pub fn without_target_value(mut self) -> Self {
        if let Some(QueryStep::Matching(predicate)) = self.steps.last_mut() {
            predicate
                .clauses
                .retain(|clause| !matches!(clause, Clause::Value(_)));
            if predicate.is_empty() {
                self.steps.pop();
            }
        }
        self
    }

    /// Whether the query addresses the application element itself.
    pub fn is_application(&self) -> bool {
        self.steps.is_empty()
    }

    /// Render as an XCUITest class chain, e.g.
    /// ``**/XCUIElementTypeCell[`label == "Inbox"`]/**/XCUIElementTypeButton``.
    pub fn to_class_chain(&self) -> String {
        let mut chain = String::new();
        for step in &self.steps {
            match step {
                QueryStep::Descendants(kind) => {
                    if !chain.is_empty() {
                        chain.push('/');
                    }
                    chain.push_str("**/");
                    chain.push_str(&kind.xcui_type());
                }
                QueryStep::Matching(predicate) => {
                    if chain.is_empty() {
                        chain.push_str("XCUIElementTypeApplication");
                    }
                    chain.push_str(&format!("[`{}`]", predicate));
                }
            }
        }
        if chain.is_empty() {
            chain.push_str("XCUIElementTypeApplication");
        }
        chain
    }
}

impl fmt::Display for ElementQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.app, self.to_class_chain())
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predicate_for_node_skips_empty_attributes() {
        let node = RawNode::new(ElementKind::TextField)
            .with_identifier("")
            .with_label("Search")
            .with_text_value("");
        let predicate = Predicate::for_node(&node);
        assert_eq!(predicate.clauses, vec![Clause::Label("Search".to_string())]);
    }

    #[test]
    fn test_predicate_matches_all_clauses() {
        let node = RawNode::new(ElementKind::Button)
            .with_identifier("send")
            .with_label("Send");
        let predicate = Predicate::for_node(&node);
        assert!(predicate.matches(&node));

        let other = RawNode::new(ElementKind::Button)
            .with_identifier("send")
            .with_label("Cancel");
        assert!(!predicate.matches(&other));
    }

    #[test]
    fn test_empty_predicate_does_not_add_step() {
        let query = ElementQuery::application("com.example")
            .descendants(ElementKind::Button)
            .matching(Predicate::default());
        assert_eq!(query.steps.len(), 1);
    }

    #[test]
    fn test_class_chain() {
        let query = ElementQuery::application("com.example")
            .descendants(ElementKind::Cell)
            .matching(Predicate {
                clauses: vec![
                    Clause::Identifier("row".to_string()),
                    Clause::Label("Say \"hi\"".to_string()),
                ],
            })
            .descendants(ElementKind::Button);
        assert_eq!(
            query.to_class_chain(),
            "**/XCUIElementTypeCell[`name == \"row\" AND label == \"Say \\\"hi\\\"\"`]/**/XCUIElementTypeButton"
        );
    }

    #[test]
    fn test_without_target_value() {
        let field = RawNode::new(ElementKind::TextField)
            .with_identifier("email")
            .with_text_value("Email");
        let query = ElementQuery::application("app")
            .descendants(ElementKind::TextField)
            .matching(Predicate::for_node(&field))
            .without_target_value();
        assert_eq!(
            query.steps.last(),
            Some(&QueryStep::Matching(Predicate::identifier("email")))
        );

        let unnamed = RawNode::new(ElementKind::TextField).with_text_value("Search");
        let query = ElementQuery::application("app")
            .descendants(ElementKind::TextField)
            .matching(Predicate::for_node(&unnamed))
            .without_target_value();
        assert_eq!(
            query.steps,
            vec![QueryStep::Descendants(ElementKind::TextField)]
        );
    }

    #[test]
    fn test_application_class_chain() {
        let query = ElementQuery::application("com.example");
        assert!(query.is_application());
        assert_eq!(query.to_class_chain(), "XCUIElementTypeApplication");
    }
}
