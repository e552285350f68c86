//! Text renderings of trees and the parser for the parentheses form.
use std::{fmt, str::FromStr};

use rustc_hash::FxHashMap;

use super::{NodeId, Tree, error::TreeError};

/// How [`Tree::format`] renders a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TreeFormat {
    /// `mul(div(cos(1.0),cos(π)),sin(z))`, which [`Tree::parse`] reads back.
    /// `(`, `)`, `,` and `\` inside values are escaped with `\`.
    #[default]
    Parentheses,
    /// One node per line, with box-drawing branches.
    ///
    /// ```text
    /// mul
    /// ├── div
    /// │   └── 1.0
    /// └── z
    /// ```
    Tree,
    /// `(mul (div (cos 1.0) (cos π)) (sin z))`
    Lisp,
    /// A Graphviz digraph named `Tree` with nodes `node_000`, `node_001`, …
    /// numbered in pre-order.
    Dot,
}

impl FromStr for TreeFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "parentheses" => Ok(TreeFormat::Parentheses),
            "tree" => Ok(TreeFormat::Tree),
            "lisp" => Ok(TreeFormat::Lisp),
            "dot" => Ok(TreeFormat::Dot),
            _ => Err(format!(
                "unknown tree format `{s}`, expected `parentheses`, `tree`, `lisp` or `dot`"
            )),
        }
    }
}

impl fmt::Display for TreeFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeFormat::Parentheses => write!(f, "parentheses"),
            TreeFormat::Tree => write!(f, "tree"),
            TreeFormat::Lisp => write!(f, "lisp"),
            TreeFormat::Dot => write!(f, "dot"),
        }
    }
}

impl TreeFormat {
    /// Renders `tree`, turning every value into text with `label`.
    pub fn format<V>(self, tree: &Tree<V>, mut label: impl FnMut(&V) -> String) -> String {
        match self {
            TreeFormat::Parentheses => nested(tree, |value| escape(&label(value)), Nesting::Parentheses),
            TreeFormat::Lisp => nested(tree, label, Nesting::Lisp),
            TreeFormat::Tree => branches(tree, label),
            TreeFormat::Dot => dot("Tree", tree, label),
        }
    }
}

impl<V: fmt::Display> Tree<V> {
    /// Renders the tree with the `Display` form of its values.
    pub fn format(&self, format: TreeFormat) -> String {
        format.format(self, |value| value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Nesting {
    Parentheses,
    Lisp,
}

enum Event {
    Enter(NodeId),
    Separator,
    Close,
}

fn nested<V>(tree: &Tree<V>, mut label: impl FnMut(&V) -> String, nesting: Nesting) -> String {
    let separator = match nesting {
        Nesting::Parentheses => ',',
        Nesting::Lisp => ' ',
    };
    let mut output = String::new();
    let mut events = vec![Event::Enter(tree.root())];

    while let Some(event) = events.pop() {
        match event {
            Event::Enter(id) => {
                let value = label(tree.value(id));
                let children = tree.children(id);

                if children.is_empty() {
                    output.push_str(&value);
                    continue;
                }

                match nesting {
                    Nesting::Parentheses => {
                        output.push_str(&value);
                        output.push('(');
                    }
                    Nesting::Lisp => {
                        output.push('(');
                        output.push_str(&value);
                        output.push(' ');
                    }
                }

                events.push(Event::Close);
                for (i, child) in children.iter().enumerate().rev() {
                    events.push(Event::Enter(*child));
                    if i > 0 {
                        events.push(Event::Separator);
                    }
                }
            }
            Event::Separator => output.push(separator),
            Event::Close => output.push(')'),
        }
    }

    output
}

fn branches<V>(tree: &Tree<V>, mut label: impl FnMut(&V) -> String) -> String {
    let mut lines = Vec::with_capacity(tree.len());
    // node, prefix of its own line, prefix of its children's lines
    let mut stack = vec![(tree.root(), String::new(), String::new())];

    while let Some((id, head, indent)) = stack.pop() {
        lines.push(format!("{}{}", head, label(tree.value(id))));

        let children = tree.children(id);
        for (i, child) in children.iter().enumerate().rev() {
            let (branch, rest) = if i + 1 == children.len() {
                ("└── ", "    ")
            } else {
                ("├── ", "│   ")
            };
            stack.push((*child, format!("{indent}{branch}"), format!("{indent}{rest}")));
        }
    }

    lines.join("\n")
}

fn dot<V>(name: &str, tree: &Tree<V>, mut label: impl FnMut(&V) -> String) -> String {
    let ids = tree.preorder(tree.root()).collect::<Vec<_>>();
    let indexes = ids
        .iter()
        .enumerate()
        .map(|(index, id)| (*id, index))
        .collect::<FxHashMap<_, _>>();
    let node = |id: NodeId| format!("node_{:03}", indexes[&id]);

    let mut output = format!("digraph {} {{\n", name);
    for id in &ids {
        let value = label(tree.value(*id)).replace('"', "\\\"");
        output.push_str(&format!("    {} [label=\"{}\"];\n", node(*id), value));
    }
    for id in &ids {
        if let Some(parent) = tree.parent(*id) {
            output.push_str(&format!("    {} -> {};\n", node(parent), node(*id)));
        }
    }
    output.push_str("}\n");

    output
}

fn escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '(' | ')' | ',' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl<V> Tree<V> {
    /// Parses the parentheses form, e.g. `0(1(4,5),2(6),3)`, converting
    /// every value with `mapper`.
    ///
    /// Values are taken verbatim, whitespace included; `\` escapes the next
    /// character.
    pub fn parse(text: &str, mut mapper: impl FnMut(&str) -> V) -> Result<Tree<V>, TreeError> {
        let mut tree: Option<Tree<V>> = None;
        let mut open: Vec<NodeId> = Vec::new();
        let mut value = String::new();
        // right after a closing bracket, where only `,` or `)` may follow
        let mut closed = false;
        let mut chars = text.char_indices();

        let unexpected = |found: char, offset: usize| TreeError::UnexpectedChar { found, offset };

        while let Some((offset, c)) = chars.next() {
            match c {
                '(' => {
                    if closed {
                        return Err(unexpected(c, offset));
                    }
                    let node = add(&mut tree, open.last().copied(), mapper(&value))
                        .ok_or_else(|| unexpected(c, offset))?;
                    value.clear();
                    open.push(node);
                }
                ',' | ')' => {
                    let Some(parent) = open.last().copied() else {
                        return Err(unexpected(c, offset));
                    };
                    if !closed {
                        add(&mut tree, Some(parent), mapper(&value)).ok_or_else(|| unexpected(c, offset))?;
                        value.clear();
                    }
                    closed = c == ')';
                    if closed {
                        open.pop();
                    }
                }
                _ if closed => return Err(unexpected(c, offset)),
                '\\' => match chars.next() {
                    Some((_, escaped)) => value.push(escaped),
                    None => return Err(TreeError::UnexpectedEnd),
                },
                _ => value.push(c),
            }
        }

        if !open.is_empty() {
            return Err(TreeError::UnexpectedEnd);
        }

        match tree {
            Some(tree) => Ok(tree),
            None => Ok(Tree::new(mapper(&value))),
        }
    }
}

// `None` when a second root would be created.
fn add<V>(tree: &mut Option<Tree<V>>, parent: Option<NodeId>, value: V) -> Option<NodeId> {
    match parent {
        Some(parent) => tree.as_mut().map(|tree| tree.push(parent, value)),
        None if tree.is_none() => Some(tree.insert(Tree::new(value)).root()),
        None => None,
    }
}
