pub mod boolean;
pub mod math;
pub mod registry;

use std::{
    fmt::{self, Debug, Display},
    sync::{Arc, OnceLock},
};

use smol_str::SmolStr;

use crate::{
    eval::{self, error::EvalError},
    tree::Tree,
};

/// Values an operation tree computes with.
pub trait Operand: Clone + Debug + Send + Sync + 'static {
    /// Value equality as used by constants. Unlike IEEE comparison, NaN
    /// equals NaN.
    fn same_value(&self, other: &Self) -> bool;

    /// Writes the value as a source literal.
    fn fmt_literal(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;

    /// Whether the literal starts with a minus sign.
    fn is_negative(&self) -> bool {
        false
    }
}

impl Operand for f64 {
    fn same_value(&self, other: &Self) -> bool {
        self == other || (self.is_nan() && other.is_nan())
    }

    // Non-finite values print as the constants `Registry::math` defines.
    fn fmt_literal(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_nan() {
            write!(f, "{}", math::NAN)
        } else if self.is_infinite() {
            let sign = if self.is_sign_negative() { "-" } else { "" };
            write!(f, "{}{}", sign, math::INF)
        } else {
            write!(f, "{:?}", self)
        }
    }

    fn is_negative(&self) -> bool {
        self.is_sign_negative() && !self.is_nan()
    }
}

impl Operand for bool {
    fn same_value(&self, other: &Self) -> bool {
        self == other
    }

    fn fmt_literal(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

/// Displays a value through [`Operand::fmt_literal`].
pub struct Literal<'a, T>(pub &'a T);

impl<T: Operand> Display for Literal<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt_literal(f)
    }
}

#[derive(Debug, Clone)]
pub struct Const<T> {
    name: Option<SmolStr>,
    value: T,
}

impl<T: Operand> Const<T> {
    pub fn of(value: T) -> Self {
        Self { name: None, value }
    }

    pub fn named(name: impl Into<SmolStr>, value: T) -> Self {
        Self {
            name: Some(name.into()),
            value,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T: Operand> PartialEq for Const<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value.same_value(&other.value)
    }
}

impl<T: Operand> Display for Const<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => self.value.fmt_literal(f),
        }
    }
}

/// Projects argument `index` of the argument vector.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Var {
    name: SmolStr,
    index: usize,
}

impl Var {
    pub fn of(name: impl Into<SmolStr>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub(crate) fn set_index(&mut self, index: usize) {
        self.index = index;
    }

    pub fn apply<T: Clone>(&self, args: &[T]) -> Result<T, EvalError> {
        args.get(self.index)
            .cloned()
            .ok_or_else(|| EvalError::IndexOutOfBounds {
                name: self.name.clone(),
                index: self.index,
                len: args.len(),
            })
    }
}

impl Display for Var {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

type Generator<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// A constant drawn from a generator the first time it is read.
///
/// Each instance resolves at most once. Cloning yields a fresh, unresolved
/// instance sharing the same generator, so clones of a tree draw their own
/// values. Moving or copying a node within one tree instance goes through
/// [`Ephemeral::duplicate`], which keeps the value once it is resolved.
pub struct Ephemeral<T> {
    name: Option<SmolStr>,
    generator: Generator<T>,
    value: OnceLock<T>,
}

impl<T: Operand> Ephemeral<T> {
    pub fn of(generator: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            name: None,
            generator: Arc::new(generator),
            value: OnceLock::new(),
        }
    }

    pub fn named(name: impl Into<SmolStr>, generator: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::of(generator)
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The memoized value, drawn on first access.
    pub fn value(&self) -> &T {
        self.value.get_or_init(|| (self.generator)())
    }

    pub fn is_resolved(&self) -> bool {
        self.value.get().is_some()
    }

    /// Copy that shares the resolved value, if any, and the generator.
    pub fn duplicate(&self) -> Self {
        Self {
            name: self.name.clone(),
            generator: Arc::clone(&self.generator),
            value: self.value.clone(),
        }
    }

    /// Freezes the current value into a constant.
    pub fn to_const(&self) -> Const<T> {
        Const {
            name: self.name.clone(),
            value: self.value().clone(),
        }
    }
}

impl<T> Clone for Ephemeral<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            generator: Arc::clone(&self.generator),
            value: OnceLock::new(),
        }
    }
}

impl<T: Operand> PartialEq for Ephemeral<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.value().same_value(other.value())
    }
}

impl<T: Debug> Debug for Ephemeral<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ephemeral")
            .field("name", &self.name)
            .field("value", &self.value.get())
            .finish()
    }
}

impl<T: Operand> Display for Ephemeral<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => self.value().fmt_literal(f),
        }
    }
}

type Body<T> = Arc<dyn Fn(&[T]) -> T + Send + Sync>;

/// A pure n-ary function. Two functions are equal when their names and
/// arities are.
pub struct Function<T> {
    name: SmolStr,
    arity: usize,
    function: Body<T>,
}

impl<T: Operand> Function<T> {
    pub fn of(
        name: impl Into<SmolStr>,
        arity: usize,
        function: impl Fn(&[T]) -> T + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            function: Arc::new(function),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn apply(&self, args: &[T]) -> Result<T, EvalError> {
        if args.len() != self.arity {
            return Err(EvalError::Argument {
                name: self.name.clone(),
                expected: self.arity,
                actual: args.len(),
            });
        }

        Ok((self.function)(args))
    }
}

impl<T> Clone for Function<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            arity: self.arity,
            function: Arc::clone(&self.function),
        }
    }
}

impl<T> PartialEq for Function<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.arity == other.arity
    }
}

impl<T> Debug for Function<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function")
            .field("name", &self.name)
            .field("arity", &self.arity)
            .finish()
    }
}

/// One more than the largest variable index in `tree`, or 0 if it has no
/// variables.
pub fn var_arity<T>(tree: &Tree<Op<T>>) -> usize {
    tree.values()
        .filter_map(|op| match op {
            Op::Var(var) => Some(var.index() + 1),
            _ => None,
        })
        .max()
        .unwrap_or(0)
}

/// An operation defined by a tree of other operations.
#[derive(Debug)]
pub struct Program<T> {
    name: SmolStr,
    arity: usize,
    body: Arc<Tree<Op<T>>>,
}

impl<T: Operand> Program<T> {
    /// Wraps `body`, deriving the arity from its variables.
    pub fn new(name: impl Into<SmolStr>, body: Tree<Op<T>>) -> Result<Self, EvalError> {
        eval::validate(&body)?;

        Ok(Self {
            name: name.into(),
            arity: var_arity(&body),
            body: Arc::new(body),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    pub fn body(&self) -> &Tree<Op<T>> {
        &self.body
    }

    pub fn apply(&self, args: &[T]) -> Result<T, EvalError> {
        if args.len() < self.arity {
            return Err(EvalError::Argument {
                name: self.name.clone(),
                expected: self.arity,
                actual: args.len(),
            });
        }

        eval::eval(&self.body, args)
    }
}

impl<T> Clone for Program<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            arity: self.arity,
            body: Arc::clone(&self.body),
        }
    }
}

impl<T: Operand> PartialEq for Program<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.arity == other.arity && self.body == other.body
    }
}

/// An operation tree node.
#[derive(Debug, Clone)]
pub enum Op<T> {
    Const(Const<T>),
    Var(Var),
    Ephemeral(Ephemeral<T>),
    Function(Function<T>),
    Program(Program<T>),
}

impl<T: Operand> Op<T> {
    pub fn constant(value: T) -> Self {
        Op::Const(Const::of(value))
    }

    pub fn var(name: impl Into<SmolStr>, index: usize) -> Self {
        Op::Var(Var::of(name, index))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Op::Const(c) => c.name(),
            Op::Var(var) => Some(var.name()),
            Op::Ephemeral(e) => e.name(),
            Op::Function(function) => Some(function.name()),
            Op::Program(program) => Some(program.name()),
        }
    }

    pub fn arity(&self) -> usize {
        match self {
            Op::Const(_) | Op::Var(_) | Op::Ephemeral(_) => 0,
            Op::Function(function) => function.arity(),
            Op::Program(program) => program.arity(),
        }
    }

    #[inline(always)]
    pub fn is_terminal(&self) -> bool {
        self.arity() == 0
    }

    pub fn apply(&self, args: &[T]) -> Result<T, EvalError> {
        match self {
            Op::Const(c) => Ok(c.value().clone()),
            Op::Var(var) => var.apply(args),
            Op::Ephemeral(e) => Ok(e.value().clone()),
            Op::Function(function) => function.apply(args),
            Op::Program(program) => program.apply(args),
        }
    }

    /// Copy of this operation for another position of the same tree
    /// instance. Unlike `clone`, a resolved ephemeral keeps its value.
    pub fn duplicate(&self) -> Self {
        match self {
            Op::Ephemeral(e) => Op::Ephemeral(e.duplicate()),
            op => op.clone(),
        }
    }

    /// The constant value of a `Const` or `Ephemeral` node.
    pub fn const_value(&self) -> Option<&T> {
        match self {
            Op::Const(c) => Some(c.value()),
            Op::Ephemeral(e) => Some(e.value()),
            _ => None,
        }
    }
}

impl<T: Operand> PartialEq for Op<T> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Op::Const(a), Op::Const(b)) => a == b,
            (Op::Var(a), Op::Var(b)) => a == b,
            (Op::Ephemeral(a), Op::Ephemeral(b)) => a == b,
            (Op::Function(a), Op::Function(b)) => a == b,
            (Op::Program(a), Op::Program(b)) => a == b,
            _ => false,
        }
    }
}

impl<T: Operand> Display for Op<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Op::Const(c) => write!(f, "{}", c),
            Op::Var(var) => write!(f, "{}", var),
            Op::Ephemeral(e) => write!(f, "{}", e),
            Op::Function(function) => write!(f, "{}", function.name()),
            Op::Program(program) => write!(f, "{}", program.name()),
        }
    }
}

impl<T> From<Const<T>> for Op<T> {
    fn from(c: Const<T>) -> Self {
        Op::Const(c)
    }
}

impl<T> From<Var> for Op<T> {
    fn from(var: Var) -> Self {
        Op::Var(var)
    }
}

impl<T> From<Ephemeral<T>> for Op<T> {
    fn from(e: Ephemeral<T>) -> Self {
        Op::Ephemeral(e)
    }
}

impl<T> From<Function<T>> for Op<T> {
    fn from(function: Function<T>) -> Self {
        Op::Function(function)
    }
}

impl<T> From<Program<T>> for Op<T> {
    fn from(program: Program<T>) -> Self {
        Op::Program(program)
    }
}
