use std::{fmt, str::FromStr};

use crate::{
    op::{
        Op, Operand,
        math::{ADD, DIV, MOD, MUL, POW, SUB},
    },
    tree::{NodeId, Tree},
};

/// How the formatter places parentheses around infix operations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Style {
    /// Only the parentheses the operator precedence requires.
    #[default]
    Minimal,
    /// Every infix operation except the root is parenthesized.
    Bracketed,
}

impl FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "minimal" => Ok(Style::Minimal),
            "bracketed" => Ok(Style::Bracketed),
            _ => Err(format!("unknown style `{s}`, expected `minimal` or `bracketed`")),
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Style::Minimal => write!(f, "minimal"),
            Style::Bracketed => write!(f, "bracketed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Assoc {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
struct Infix {
    symbol: &'static str,
    precedence: u8,
    assoc: Assoc,
}

impl Infix {
    fn of<T: Operand>(tree: &Tree<Op<T>>, id: NodeId) -> Option<Self> {
        let Op::Function(function) = tree.value(id) else {
            return None;
        };

        if tree.child_count(id) != 2 {
            return None;
        }

        let (symbol, precedence, assoc) = match function.name() {
            ADD => (" + ", 1, Assoc::Left),
            SUB => (" - ", 1, Assoc::Left),
            MUL => ("*", 2, Assoc::Left),
            DIV => ("/", 2, Assoc::Left),
            MOD => ("%", 2, Assoc::Left),
            POW => ("^", 3, Assoc::Right),
            _ => return None,
        };

        Some(Self {
            symbol,
            precedence,
            assoc,
        })
    }
}

/// Renders operation trees in infix notation.
///
/// `+` and `-` are surrounded by spaces, `* / % ^` are not. Functions
/// without an infix form print as `name(a, b)`.
#[derive(Debug, Clone)]
pub struct Formatter {
    style: Style,
    output: String,
}

impl Formatter {
    pub fn new(style: Style) -> Self {
        Self {
            style,
            output: String::new(),
        }
    }

    pub fn format<T: Operand>(mut self, tree: &Tree<Op<T>>) -> String {
        self.format_node(tree, tree.root());
        self.output
    }

    fn format_node<T: Operand>(&mut self, tree: &Tree<Op<T>>, id: NodeId) {
        if let Some(infix) = Infix::of(tree, id) {
            let (left, right) = (tree.children(id)[0], tree.children(id)[1]);
            self.format_operand(tree, left, infix, Assoc::Right);
            self.output.push_str(infix.symbol);
            self.format_operand(tree, right, infix, Assoc::Left);
            return;
        }

        let op = tree.value(id);
        self.output.push_str(&op.to_string());

        let children = tree.children(id);
        if !children.is_empty() {
            self.output.push('(');
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    self.output.push_str(", ");
                }
                self.format_child(tree, *child);
            }
            self.output.push(')');
        }
    }

    // Argument of a function call.
    fn format_child<T: Operand>(&mut self, tree: &Tree<Op<T>>, id: NodeId) {
        let bracket = self.style == Style::Bracketed && Infix::of(tree, id).is_some();
        self.bracketed(bracket, |formatter| formatter.format_node(tree, id));
    }

    // `grouping` is the associativity that would group without brackets on
    // this side: a left operand groups under a right-associative parent and
    // vice versa.
    fn format_operand<T: Operand>(&mut self, tree: &Tree<Op<T>>, id: NodeId, parent: Infix, grouping: Assoc) {
        let bracket = match Infix::of(tree, id) {
            Some(child) => match self.style {
                Style::Bracketed => true,
                Style::Minimal => {
                    child.precedence < parent.precedence
                        || (child.precedence == parent.precedence && parent.assoc == grouping)
                }
            },
            None => is_negative_literal(tree.value(id)),
        };

        self.bracketed(bracket, |formatter| formatter.format_node(tree, id));
    }

    fn bracketed(&mut self, bracket: bool, f: impl FnOnce(&mut Self)) {
        if bracket {
            self.output.push('(');
        }
        f(self);
        if bracket {
            self.output.push(')');
        }
    }
}

fn is_negative_literal<T: Operand>(op: &Op<T>) -> bool {
    match op {
        Op::Const(c) => c.name().is_none() && c.value().is_negative(),
        Op::Ephemeral(e) => e.name().is_none() && e.value().is_negative(),
        _ => false,
    }
}

/// Formats `tree` in the given style.
pub fn format<T: Operand>(tree: &Tree<Op<T>>, style: Style) -> String {
    Formatter::new(style).format(tree)
}
