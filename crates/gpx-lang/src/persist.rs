//! Serializable form of operations and operation trees.
//!
//! Functions are stored by name and arity and re-bound through a
//! [`Registry`] on restore. Ephemeral constants are stored with their
//! resolved value and come back as plain constants. Non-finite numbers are
//! stored as the strings `"NaN"`, `"inf"` and `"-inf"`.
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{self, Unexpected},
};
use smol_str::SmolStr;
use thiserror::Error;

use crate::{
    eval::error::EvalError,
    op::{
        Const, Op, Operand, Program, Var,
        math::{INF, NAN},
        registry::Registry,
    },
    tree::{NodeId, Tree},
};

/// Constant values that can be stored without loss.
pub trait PersistValue: Sized {
    fn serialize_value<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error>;

    fn deserialize_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error>;
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Number {
    Finite(f64),
    Text(SmolStr),
}

impl PersistValue for f64 {
    fn serialize_value<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.is_nan() {
            serializer.serialize_str(NAN)
        } else if self.is_infinite() {
            serializer.serialize_str(if self.is_sign_negative() { "-inf" } else { INF })
        } else {
            serializer.serialize_f64(*self)
        }
    }

    fn deserialize_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Number::deserialize(deserializer)? {
            Number::Finite(value) => Ok(value),
            Number::Text(text) => match text.as_str() {
                NAN => Ok(f64::NAN),
                INF => Ok(f64::INFINITY),
                "-inf" => Ok(f64::NEG_INFINITY),
                other => Err(de::Error::invalid_value(
                    Unexpected::Str(other),
                    &"a number, \"NaN\", \"inf\" or \"-inf\"",
                )),
            },
        }
    }
}

impl PersistValue for bool {
    fn serialize_value<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_bool(*self)
    }

    fn deserialize_value<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        bool::deserialize(deserializer)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PersistError {
    #[error("Unknown function `{0}`")]
    UnknownFunction(SmolStr),
    #[error("Function `{name}` has arity {actual}, but {expected} was stored")]
    ArityMismatch {
        name: SmolStr,
        expected: usize,
        actual: usize,
    },
    #[error("Stored tree ends before all children were read")]
    Truncated,
    #[error("Stored tree has {0} nodes after its root subtree")]
    TrailingNodes(usize),
    #[error("Stored tree is empty")]
    EmptyTree,
    #[error(transparent)]
    Structure(#[from] EvalError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case", bound = "T: PersistValue")]
pub enum Persisted<T> {
    Const {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<SmolStr>,
        #[serde(
            serialize_with = "PersistValue::serialize_value",
            deserialize_with = "PersistValue::deserialize_value"
        )]
        value: T,
    },
    Var {
        name: SmolStr,
        index: usize,
    },
    Function {
        name: SmolStr,
        arity: usize,
    },
    Program {
        name: SmolStr,
        body: PersistedTree<T>,
    },
}

impl<T: Operand> Persisted<T> {
    /// Captures `op`. An unresolved ephemeral is resolved first.
    pub fn of(op: &Op<T>) -> Self {
        match op {
            Op::Const(c) => Persisted::Const {
                name: c.name().map(SmolStr::new),
                value: c.value().clone(),
            },
            Op::Ephemeral(e) => Persisted::Const {
                name: e.name().map(SmolStr::new),
                value: e.value().clone(),
            },
            Op::Var(var) => Persisted::Var {
                name: SmolStr::new(var.name()),
                index: var.index(),
            },
            Op::Function(function) => Persisted::Function {
                name: SmolStr::new(function.name()),
                arity: function.arity(),
            },
            Op::Program(program) => Persisted::Program {
                name: SmolStr::new(program.name()),
                body: PersistedTree::of(program.body()),
            },
        }
    }

    pub fn restore(&self, registry: &Registry<T>) -> Result<Op<T>, PersistError> {
        match self {
            Persisted::Const { name, value } => Ok(Op::Const(match name {
                Some(name) => Const::named(name.clone(), value.clone()),
                None => Const::of(value.clone()),
            })),
            Persisted::Var { name, index } => Ok(Op::Var(Var::of(name.clone(), *index))),
            Persisted::Function { name, arity } => {
                let function = registry
                    .function(name)
                    .ok_or_else(|| PersistError::UnknownFunction(name.clone()))?;

                if function.arity() != *arity {
                    return Err(PersistError::ArityMismatch {
                        name: name.clone(),
                        expected: *arity,
                        actual: function.arity(),
                    });
                }

                Ok(Op::Function(function.clone()))
            }
            Persisted::Program { name, body } => {
                Ok(Op::Program(Program::new(name.clone(), body.restore(registry)?)?))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound = "T: PersistValue")]
pub struct PersistedNode<T> {
    pub op: Persisted<T>,
    pub children: usize,
}

/// A tree stored as its nodes in pre-order, each with its child count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent, bound = "T: PersistValue")]
pub struct PersistedTree<T> {
    nodes: Vec<PersistedNode<T>>,
}

impl<T: Operand> PersistedTree<T> {
    pub fn of(tree: &Tree<Op<T>>) -> Self {
        Self {
            nodes: tree
                .preorder(tree.root())
                .map(|id| PersistedNode {
                    op: Persisted::of(tree.value(id)),
                    children: tree.child_count(id),
                })
                .collect(),
        }
    }

    pub fn nodes(&self) -> &[PersistedNode<T>] {
        &self.nodes
    }

    pub fn restore(&self, registry: &Registry<T>) -> Result<Tree<Op<T>>, PersistError> {
        let (first, rest) = self.nodes.split_first().ok_or(PersistError::EmptyTree)?;

        let mut tree = Tree::new(first.op.restore(registry)?);
        // open nodes with the number of children still to read
        let mut stack: Vec<(NodeId, usize)> = vec![(tree.root(), first.children)];
        let mut nodes = rest.iter();

        while let Some((parent, remaining)) = stack.pop() {
            if remaining == 0 {
                continue;
            }
            stack.push((parent, remaining - 1));

            let node = nodes.next().ok_or(PersistError::Truncated)?;
            let child = tree.push(parent, node.op.restore(registry)?);
            stack.push((child, node.children));
        }

        match nodes.len() {
            0 => Ok(tree),
            trailing => Err(PersistError::TrailingNodes(trailing)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        op::{Ephemeral, Function},
        parse,
    };
    use rstest::rstest;

    fn math_program(code: &str) -> Program<f64> {
        Program::new("p", parse(code, &Registry::math()).unwrap()).unwrap()
    }

    #[rstest]
    #[case::literal(Op::constant(2.5), r#"{"kind":"const","value":2.5}"#)]
    #[case::named(Op::Const(Const::named("π", std::f64::consts::PI)), r#"{"kind":"const","name":"π","value":3.141592653589793}"#)]
    #[case::var(Op::var("x", 3), r#"{"kind":"var","name":"x","index":3}"#)]
    #[case::function(
        Op::Function(Registry::math().function("hypot").unwrap().clone()),
        r#"{"kind":"function","name":"hypot","arity":2}"#
    )]
    fn test_persist_json(#[case] op: Op<f64>, #[case] expected: &str) {
        let json = serde_json::to_string(&Persisted::of(&op)).unwrap();
        assert_eq!(json, expected);

        let persisted: Persisted<f64> = serde_json::from_str(&json).unwrap();
        assert_eq!(persisted.restore(&Registry::math()).unwrap(), op);
    }

    #[rstest]
    #[case::nan(f64::NAN, r#"{"kind":"const","value":"NaN"}"#)]
    #[case::infinity(f64::INFINITY, r#"{"kind":"const","value":"inf"}"#)]
    #[case::negative_infinity(f64::NEG_INFINITY, r#"{"kind":"const","value":"-inf"}"#)]
    #[case::negative_zero(-0.0, r#"{"kind":"const","value":-0.0}"#)]
    fn test_persist_non_finite(#[case] value: f64, #[case] expected: &str) {
        let json = serde_json::to_string(&Persisted::of(&Op::constant(value))).unwrap();
        assert_eq!(json, expected);

        let restored = serde_json::from_str::<Persisted<f64>>(&json)
            .unwrap()
            .restore(&Registry::math())
            .unwrap();
        let restored = *restored.const_value().unwrap();
        assert_eq!(restored.to_bits(), value.to_bits());
    }

    #[rstest]
    #[case::integer(r#"{"kind":"const","value":3}"#, Ok(3.0))]
    #[case::unknown_text(r#"{"kind":"const","value":"infinity"}"#, Err(()))]
    #[case::null(r#"{"kind":"const","value":null}"#, Err(()))]
    fn test_deserialize_value(#[case] json: &str, #[case] expected: Result<f64, ()>) {
        let persisted = serde_json::from_str::<Persisted<f64>>(json).map_err(|_| ());
        assert_eq!(
            persisted.map(|p| match p {
                Persisted::Const { value, .. } => value,
                other => panic!("expected a constant, got {other:?}"),
            }),
            expected
        );
    }

    #[test]
    fn test_ephemeral_nan_round_trip() {
        let mut body = Tree::new(Op::Function(Registry::math().function("add").unwrap().clone()));
        let root = body.root();
        body.push(root, Op::var("x", 0));
        body.push(root, Op::Ephemeral(Ephemeral::named("r", || f64::NAN)));

        let json = serde_json::to_string(&PersistedTree::of(&body)).unwrap();
        let restored = serde_json::from_str::<PersistedTree<f64>>(&json)
            .unwrap()
            .restore(&Registry::math())
            .unwrap();

        assert!(json.contains(r#""name":"r","value":"NaN""#), "{json}");
        assert!(restored.value(restored.children(restored.root())[1]).const_value().unwrap().is_nan());
    }

    #[test]
    fn test_ephemeral_restores_as_frozen_const() {
        let ephemeral = Ephemeral::named("r", || 0.75);
        assert!(!ephemeral.is_resolved());

        let persisted = Persisted::of(&Op::Ephemeral(ephemeral));
        assert_eq!(
            persisted,
            Persisted::Const {
                name: Some("r".into()),
                value: 0.75
            }
        );
        assert!(matches!(
            persisted.restore(&Registry::math()),
            Ok(Op::Const(c)) if *c.value() == 0.75 && c.name() == Some("r")
        ));
    }

    #[test]
    fn test_program() {
        let program = math_program("x*sin(y) + 1");
        let json = serde_json::to_string(&Persisted::of(&Op::Program(program.clone()))).unwrap();

        let restored = serde_json::from_str::<Persisted<f64>>(&json)
            .unwrap()
            .restore(&Registry::math())
            .unwrap();

        let Op::Program(restored) = restored else {
            panic!("expected a program, got {restored:?}");
        };
        assert_eq!(restored, program);
        assert_eq!(restored.arity(), 2);
        assert_eq!(restored.apply(&[2.0, 0.0]), Ok(1.0));
    }

    #[test]
    fn test_nested_program() {
        let inner = Op::Program(math_program("x + x"));
        let mut body = Tree::new(Op::Function(Registry::math().function("neg").unwrap().clone()));
        let root = body.root();
        let call = body.push(root, inner);
        body.push(call, Op::var("a", 0));
        let outer = Program::new("outer", body).unwrap();

        let persisted = Persisted::of(&Op::Program(outer.clone()));
        assert_eq!(
            persisted.restore(&Registry::math()),
            Ok(Op::Program(outer))
        );
    }

    #[rstest]
    #[case::unknown(Registry::new(), PersistError::UnknownFunction("add".into()))]
    #[case::arity(
        {
            let mut registry = Registry::new();
            registry.register(Function::of("add", 3, |v: &[f64]| v.iter().sum()));
            registry
        },
        PersistError::ArityMismatch { name: "add".into(), expected: 2, actual: 3 }
    )]
    fn test_restore_function_errors(#[case] registry: Registry<f64>, #[case] expected: PersistError) {
        let tree = PersistedTree::of(&parse("x + 1", &Registry::math()).unwrap());
        assert_eq!(tree.restore(&registry), Err(expected));
    }

    #[rstest]
    #[case::truncated(r#"[{"op":{"kind":"var","name":"x","index":0},"children":1}]"#, PersistError::Truncated)]
    #[case::trailing(
        r#"[{"op":{"kind":"var","name":"x","index":0},"children":0},{"op":{"kind":"var","name":"y","index":1},"children":0}]"#,
        PersistError::TrailingNodes(1)
    )]
    #[case::empty("[]", PersistError::EmptyTree)]
    fn test_restore_malformed(#[case] json: &str, #[case] expected: PersistError) {
        let tree: PersistedTree<f64> = serde_json::from_str(json).unwrap();
        assert_eq!(tree.restore(&Registry::math()), Err(expected));
    }

    #[test]
    fn test_restore_validates_structure() {
        let json = r#"[{"op":{"kind":"function","name":"neg","arity":1},"children":2},
            {"op":{"kind":"var","name":"x","index":0},"children":0},
            {"op":{"kind":"var","name":"y","index":1},"children":0}]"#;
        let tree: PersistedTree<f64> = serde_json::from_str(json).unwrap();
        let restored = tree.restore(&Registry::math()).unwrap();

        let program = Persisted::Program {
            name: "p".into(),
            body: PersistedTree::of(&restored),
        };
        assert!(matches!(
            program.restore(&Registry::math()),
            Err(PersistError::Structure(EvalError::Structure { arity: 1, children: 2, .. }))
        ));
    }
}
