//! Mapping description numbers back to live element queries.

use thiserror::Error;

use super::compress::CompactNode;
use crate::ui::{ElementKind, ElementQuery, Predicate};

/// Resolver errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The number was not produced by the tree it is resolved against.
    #[error("Element {number} is not part of the described tree")]
    NumberNotInTree { number: usize },
}

/// Re-derive a live query for the element numbered `number`.
///
/// The walk follows the same shape the compressor produced: at every hop it
/// enters the first child whose number is not below the target (numbers are
/// post-order, so that child's subtree holds the target) and narrows the
/// query by the child's kind and identity predicate.
pub fn resolve(
    root: &CompactNode<'_>,
    number: usize,
    app: &str,
) -> Result<ElementQuery, ResolveError> {
    let scope = ElementQuery::application(app);

    if root.number == number {
        if root.kind() == ElementKind::Application {
            return Ok(scope);
        }
        return Ok(narrow(scope, root));
    }

    let mut query = scope;
    let mut node = next_hop(root, number)?;
    loop {
        query = narrow(query, node);
        if node.number == number {
            return Ok(query);
        }
        node = next_hop(node, number)?;
    }
}

fn narrow(query: ElementQuery, node: &CompactNode<'_>) -> ElementQuery {
    query
        .descendants(node.kind())
        .matching(Predicate::for_node(node.attributes))
}

fn next_hop<'n, 'a>(
    node: &'n CompactNode<'a>,
    number: usize,
) -> Result<&'n CompactNode<'a>, ResolveError> {
    node.children
        .iter()
        .find(|child| child.number >= number)
        .ok_or(ResolveError::NumberNotInTree { number })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::compress;
    use crate::ui::{Clause, InMemoryDevice, QueryStep, RawNode};

    const APP: &str = "com.example.mail";

    fn mailbox() -> RawNode {
        RawNode::new(ElementKind::Application)
            .with_label("Mail")
            .with_child(
                RawNode::new(ElementKind::Window).with_child(
                    RawNode::new(ElementKind::Other)
                        .with_child(
                            RawNode::new(ElementKind::NavigationBar)
                                .with_identifier("Mailboxes")
                                .with_child(RawNode::new(ElementKind::Button).with_label("Edit"))
                                .with_child(
                                    RawNode::new(ElementKind::StaticText).with_label("Mailboxes"),
                                ),
                        )
                        .with_child(
                            RawNode::new(ElementKind::Table)
                                .with_child(
                                    RawNode::new(ElementKind::Cell)
                                        .with_label("Inbox")
                                        .with_child(
                                            RawNode::new(ElementKind::StaticText)
                                                .with_label("Inbox"),
                                        ),
                                )
                                .with_child(
                                    RawNode::new(ElementKind::Cell)
                                        .with_label("Sent")
                                        .with_child(
                                            RawNode::new(ElementKind::StaticText)
                                                .with_label("Sent"),
                                        ),
                                ),
                        )
                        .with_child(
                            RawNode::new(ElementKind::SearchField)
                                .with_identifier("search")
                                .with_text_value("Search"),
                        ),
                ),
            )
    }

    fn path_of(root: &RawNode, target: &RawNode) -> Option<Vec<usize>> {
        if std::ptr::eq(root, target) {
            return Some(Vec::new());
        }
        root.children.iter().enumerate().find_map(|(index, child)| {
            path_of(child, target).map(|mut path| {
                path.insert(0, index);
                path
            })
        })
    }

    #[test]
    fn test_every_number_round_trips() {
        let tree = mailbox();
        let device = InMemoryDevice::new(APP, tree.clone());
        let compact = compress(&tree).unwrap();

        for number in compact.numbers() {
            let node = compact.find(number).unwrap();
            let expected = path_of(&tree, node.attributes).unwrap();
            let query = resolve(&compact, number, APP).unwrap();
            let matches = device.find_all(&query).unwrap();
            assert_eq!(
                matches.first(),
                Some(&expected),
                "number {} resolved to {}",
                number,
                query
            );
        }
    }

    #[test]
    fn test_query_path_for_nested_element() {
        let tree = mailbox();
        let compact = compress(&tree).unwrap();
        // Window and application each wrap a single child, so the root is the
        // container numbered 9 and the table is entered directly.
        assert_eq!(compact.number, 9);
        let query = resolve(&compact, 3, APP).unwrap();
        assert_eq!(
            query.steps,
            vec![
                QueryStep::Descendants(ElementKind::Table),
                QueryStep::Descendants(ElementKind::Cell),
                QueryStep::Matching(Predicate {
                    clauses: vec![Clause::Label("Inbox".to_string())]
                }),
                QueryStep::Descendants(ElementKind::StaticText),
                QueryStep::Matching(Predicate {
                    clauses: vec![Clause::Label("Inbox".to_string())]
                }),
            ]
        );
    }

    #[test]
    fn test_root_application_resolves_to_scope() {
        let tree = RawNode::new(ElementKind::Application)
            .with_child(RawNode::new(ElementKind::Button).with_label("A"))
            .with_child(RawNode::new(ElementKind::Button).with_label("B"));
        let compact = compress(&tree).unwrap();
        assert_eq!(compact.kind(), ElementKind::Application);
        let query = resolve(&compact, compact.number, APP).unwrap();
        assert!(query.is_application());
    }

    #[test]
    fn test_promoted_root_resolves_by_kind() {
        let tree = RawNode::new(ElementKind::Application)
            .with_child(RawNode::new(ElementKind::Button).with_label("OK"));
        let compact = compress(&tree).unwrap();
        assert_eq!(compact.kind(), ElementKind::Button);

        let query = resolve(&compact, 0, APP).unwrap();
        let device = InMemoryDevice::new(APP, tree.clone());
        assert_eq!(device.find_all(&query).unwrap(), vec![vec![0]]);
    }

    #[test]
    fn test_unknown_number_fails() {
        let tree = mailbox();
        let compact = compress(&tree).unwrap();
        let beyond = compact.number + 1;
        assert_eq!(
            resolve(&compact, beyond, APP),
            Err(ResolveError::NumberNotInTree { number: beyond })
        );
    }

    #[test]
    fn test_number_missing_from_foreign_tree_fails() {
        // A hand-built tree with a gap: 1 was never assigned.
        let leaf = RawNode::new(ElementKind::Button).with_label("A");
        let other = RawNode::new(ElementKind::Button).with_label("B");
        let root = RawNode::new(ElementKind::Other);
        let compact = CompactNode {
            number: 3,
            attributes: &root,
            children: vec![
                CompactNode {
                    number: 0,
                    attributes: &leaf,
                    children: Vec::new(),
                },
                CompactNode {
                    number: 2,
                    attributes: &other,
                    children: Vec::new(),
                },
            ],
        };
        assert_eq!(
            resolve(&compact, 1, APP),
            Err(ResolveError::NumberNotInTree { number: 1 })
        );
    }
}
