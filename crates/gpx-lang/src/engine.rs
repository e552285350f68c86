use crate::{
    Expression, GpxResult,
    error::{self, InnerError},
    format::Style,
    op::{Function, registry::Registry},
    rewrite::{RuleSet, rule::RewriteRule, simplify::Simplifier},
};

/// Rewrites allowed per simplification unless configured otherwise.
pub const DEFAULT_REWRITE_LIMIT: usize = 10_000;

#[derive(Debug, Clone)]
pub struct Options {
    /// Simplify expressions right after parsing.
    pub simplify: bool,
    pub rewrite_limit: usize,
    pub style: Style,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            simplify: false,
            rewrite_limit: DEFAULT_REWRITE_LIMIT,
            style: Style::Minimal,
        }
    }
}

/// Parses, simplifies, evaluates and formats expressions against one
/// function registry and one set of rewrite rules.
pub struct Engine {
    registry: Registry<f64>,
    rules: RuleSet<f64>,
    pub(crate) options: Options,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(Options::default())
    }
}

impl Engine {
    pub fn new(options: Options) -> Self {
        let registry = Registry::math();

        Self {
            rules: RuleSet::new().with(Simplifier::new(&registry)),
            registry,
            options,
        }
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn set_simplify(&mut self, simplify: bool) {
        self.options.simplify = simplify;
    }

    pub fn set_rewrite_limit(&mut self, limit: usize) {
        self.options.rewrite_limit = limit;
    }

    pub fn set_style(&mut self, style: Style) {
        self.options.style = style;
    }

    pub fn registry(&self) -> &Registry<f64> {
        &self.registry
    }

    /// Makes `function` available to expressions and rules parsed afterwards.
    pub fn register(&mut self, function: Function<f64>) -> &mut Self {
        self.registry.register(function);
        self
    }

    /// Replaces the rewriters used for simplification.
    pub fn set_rules(&mut self, rules: RuleSet<f64>) {
        self.rules = rules;
    }

    /// Compiles `rule` and runs it after the current rewriters.
    #[allow(clippy::result_large_err)]
    pub fn add_rule(&mut self, rule: &str) -> Result<(), error::Error> {
        let rule = RewriteRule::compile_with(rule, &self.registry)
            .map_err(|e| error::Error::from_error(rule, InnerError::Rule(e)))?;

        self.rules.push(rule);
        Ok(())
    }

    #[allow(clippy::result_large_err)]
    pub fn parse(&self, code: &str) -> Result<Expression, error::Error> {
        let mut expr = Expression::parse_with(code, &self.registry)?;

        if self.options.simplify {
            self.simplify(&mut expr);
        }

        Ok(expr)
    }

    /// Rewrites `expr` with the engine's rules and returns the number of
    /// rewrites.
    pub fn simplify(&self, expr: &mut Expression) -> usize {
        let count = expr.rewrite(&self.rules, self.options.rewrite_limit);
        tracing::debug!(count, limit = self.options.rewrite_limit, "simplified expression");
        count
    }

    #[allow(clippy::result_large_err)]
    pub fn eval(&self, code: &str, args: &[f64]) -> GpxResult {
        self.parse(code)?
            .eval(args)
            .map_err(|e| error::Error::from_error(code, InnerError::Eval(e)))
    }

    /// Parses `code` and prints it back in the configured style.
    #[allow(clippy::result_large_err)]
    pub fn format(&self, code: &str) -> Result<String, error::Error> {
        Ok(self.parse(code)?.format(self.options.style))
    }

    pub const fn version() -> &'static str {
        env!("CARGO_PKG_VERSION")
    }
}
