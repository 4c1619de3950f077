//! Compression of raw accessibility snapshots into numbered description trees.

use std::collections::HashSet;

use crate::ui::{ElementKind, RawNode};

/// Kinds that always get their own number: interactive or content-bearing elements.
pub const INCLUDED_KINDS: &[ElementKind] = &[
    ElementKind::Button,
    ElementKind::Cell,
    ElementKind::Icon,
    ElementKind::Link,
    ElementKind::NavigationBar,
    ElementKind::ScrollView,
    ElementKind::SearchField,
    ElementKind::TabBar,
    ElementKind::TextField,
    ElementKind::TextView,
    ElementKind::StaticText,
];

/// Kinds dropped together with their whole subtree.
pub const EXCLUDED_KINDS: &[ElementKind] = &[ElementKind::StatusBar];

/// A numbered node of the description tree.
///
/// Borrows the snapshot it was built from, so a compact tree cannot outlive
/// the iteration that captured it.
#[derive(Debug, Clone, PartialEq)]
pub struct CompactNode<'a> {
    pub number: usize,
    pub attributes: &'a RawNode,
    pub children: Vec<CompactNode<'a>>,
}

impl<'a> CompactNode<'a> {
    pub fn kind(&self) -> ElementKind {
        self.attributes.kind
    }

    /// Find the node carrying `number`.
    pub fn find(&self, number: usize) -> Option<&CompactNode<'a>> {
        if self.number == number {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(number))
    }

    /// All numbers in the tree, in assignment order.
    pub fn numbers(&self) -> Vec<usize> {
        let mut numbers = Vec::new();
        self.collect_numbers(&mut numbers);
        numbers
    }

    fn collect_numbers(&self, numbers: &mut Vec<usize>) {
        for child in &self.children {
            child.collect_numbers(numbers);
        }
        numbers.push(self.number);
    }

    /// Number of nodes in the tree.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(CompactNode::node_count).sum::<usize>()
    }
}

/// Decides which raw nodes materialize in the description.
#[derive(Debug, Clone)]
pub struct Compressor {
    include: HashSet<ElementKind>,
    exclude: HashSet<ElementKind>,
}

impl Default for Compressor {
    fn default() -> Self {
        Self::new(INCLUDED_KINDS.iter().copied(), EXCLUDED_KINDS.iter().copied())
    }
}

impl Compressor {
    pub fn new(
        include: impl IntoIterator<Item = ElementKind>,
        exclude: impl IntoIterator<Item = ElementKind>,
    ) -> Self {
        Self {
            include: include.into_iter().collect(),
            exclude: exclude.into_iter().collect(),
        }
    }

    /// Compress a snapshot, numbering nodes from 0 in post-order.
    ///
    /// Returns `None` when nothing in the tree is worth describing.
    pub fn compress<'a>(&self, root: &'a RawNode) -> Option<CompactNode<'a>> {
        let mut next = 0;
        self.build(root, &mut next)
    }

    fn build<'a>(&self, node: &'a RawNode, next: &mut usize) -> Option<CompactNode<'a>> {
        // Checked before visiting children so excluded subtrees never consume numbers.
        if self.exclude.contains(&node.kind) {
            return None;
        }

        let mut children: Vec<CompactNode<'a>> = node
            .children
            .iter()
            .filter_map(|child| self.build(child, next))
            .collect();

        let significant = self.include.contains(&node.kind)
            || children.len() > 1
            || node.identifier().is_some();

        if significant {
            let number = *next;
            *next += 1;
            Some(CompactNode {
                number,
                attributes: node,
                children,
            })
        } else if children.len() == 1 {
            children.pop()
        } else {
            None
        }
    }
}

/// Compress with the default include and exclude sets.
pub fn compress(root: &RawNode) -> Option<CompactNode<'_>> {
    Compressor::default().compress(root)
}
