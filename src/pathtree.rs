//! Values stored under `/`-separated paths, cascading down the hierarchy.
//!
//! A value set on `foo/bar` applies to `foo/bar` and every descendant of it
//! (`foo/bar/baz`, `foo/bar/baz/qux`, ...) unless a descendant sets its own.
//! Matching is per segment: a value on `foo/bar` says nothing about `foo/barn`.

use std::collections::BTreeMap;

/// Path segment separator.
const SEPARATOR: char = '/';

/// A tree of values keyed by hierarchical path.
///
/// The default value is an empty tree where every lookup misses.
#[derive(Debug, Clone)]
pub struct PathTree<T> {
    /// Node for the empty path.
    root: Node<T>,
}

/// One level of the tree.
#[derive(Debug, Clone)]
struct Node<T> {
    /// Children keyed by segment. `BTreeMap` keeps snapshots ordered.
    children: BTreeMap<String, Node<T>>,
    /// Explicit value for this exact path, if one was set.
    value: Option<T>,
}

impl<T> Default for Node<T> {
    fn default() -> Self {
        return Self {
            children: BTreeMap::new(),
            value: None,
        };
    }
}

impl<T> Default for PathTree<T> {
    fn default() -> Self {
        return Self {
            root: Node::default(),
        };
    }
}

/// A point-in-time view of a [`PathTree`], shaped for display.
#[derive(Debug)]
pub struct Snapshot<'a, T> {
    /// Children of this node, ordered by path.
    pub children: Vec<Snapshot<'a, T>>,
    /// Full path of this node from the root.
    pub path: String,
    /// Explicit value on this node, if any. Never inherited.
    pub value: Option<&'a T>,
}

impl<T> PathTree<T> {
    /// Create an empty tree.
    pub fn new() -> Self {
        return Self::default();
    }

    /// Whether no value has been set anywhere in the tree.
    pub fn is_empty(&self) -> bool {
        return self.root.value.is_none() && self.root.children.is_empty();
    }

    /// Store `value` at `path`, replacing whatever was there.
    ///
    /// The empty path sets the root default. Repeated, leading, and trailing
    /// separators are ignored, so `a//b/` and `a/b` name the same node.
    pub fn set(&mut self, path: &str, value: T) {
        let mut node = &mut self.root;
        for segment in segments(path) {
            node = node.children.entry(segment.to_owned()).or_default();
        }
        node.value = Some(value);
    }

    /// Find the value for `path`, inheriting from the nearest ancestor
    /// (inclusive) that has one.
    pub fn lookup(&self, path: &str) -> Option<&T> {
        let mut node = &self.root;
        let mut found = node.value.as_ref();
        for segment in segments(path) {
            let Some(child) = node.children.get(segment) else {
                break;
            };
            node = child;
            if let Some(value) = node.value.as_ref() {
                found = Some(value);
            }
        }
        return found;
    }

    /// Build an ordered forest of the nodes under the root.
    ///
    /// A node without a value that has exactly one child is folded into that
    /// child: `a` -> `a/b` -> `a/b/c` with only `a/b/c` set yields a single
    /// node at `a/b/c`.
    pub fn snapshot(&self) -> Vec<Snapshot<'_, T>> {
        return self
            .root
            .children
            .iter()
            .map(|(name, child)| return child.snapshot(name.clone()))
            .collect();
    }
}

impl<T> Node<T> {
    /// Snapshot this node, which lives at `path`.
    fn snapshot(&self, path: String) -> Snapshot<'_, T> {
        if self.value.is_none() && self.children.len() == 1 {
            if let Some((name, only)) = self.children.iter().next() {
                return only.snapshot(join(&path, name));
            }
        }

        let children = self
            .children
            .iter()
            .map(|(name, child)| return child.snapshot(join(&path, name)))
            .collect();

        return Snapshot {
            children,
            path,
            value: self.value.as_ref(),
        };
    }
}

/// Non-empty segments of a path.
fn segments(path: &str) -> impl Iterator<Item = &str> {
    return path.split(SEPARATOR).filter(|s| return !s.is_empty());
}

/// Append a segment to a parent path.
fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        return name.to_owned();
    }
    return format!("{parent}{SEPARATOR}{name}");
}
