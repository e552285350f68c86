use smol_str::SmolStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error(
        "Invalid tree structure at {path:?}: `{name}` has arity {arity} but {children} children"
    )]
    Structure {
        name: SmolStr,
        arity: usize,
        children: usize,
        path: Vec<usize>,
    },
    #[error("Invalid number of arguments for `{name}`: expected {expected}, got {actual}")]
    Argument {
        name: SmolStr,
        expected: usize,
        actual: usize,
    },
    #[error("Variable `{name}` reads argument {index}, but only {len} arguments were given")]
    IndexOutOfBounds { name: SmolStr, index: usize, len: usize },
    #[error("Tree is nested deeper than {0} levels")]
    TooDeep(usize),
}
