use std::fmt::{self, Display};

use smol_str::SmolStr;

use super::{
    RuleSet, Rewriter,
    error::RuleError,
    pattern::{Decl, TreePattern},
    simplify::ConstFolder,
};
use crate::{
    eval,
    lexer::{
        self, Lexer,
        token::{Token, TokenKind},
    },
    op::{Op, registry::Registry},
    parser::Parser,
    tree::Tree,
};

/// A declarative rewrite rule, `<lhs> -> <rhs>`.
///
/// Both sides use the expression grammar with `<name>` pattern variables,
/// e.g. `add(<x>, 0) -> <x>` or `<x> * <x> -> pow(<x>, 2)`.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    source: SmolStr,
    lhs: TreePattern<f64>,
    rhs: TreePattern<f64>,
}

impl RewriteRule {
    /// Compiles `rule` against the arithmetic functions.
    pub fn compile(rule: &str) -> Result<Self, RuleError> {
        Self::compile_with(rule, &Registry::math())
    }

    pub fn compile_with(rule: &str, registry: &Registry<f64>) -> Result<Self, RuleError> {
        let tokens = Lexer::new(lexer::Options { pattern_vars: true }).tokenize(rule, registry)?;

        let mut separators = tokens
            .iter()
            .enumerate()
            .filter(|(_, token)| token.kind == TokenKind::Arrow);
        let separator = match (separators.next(), separators.next()) {
            (None, _) => return Err(RuleError::MissingSeparator),
            (Some(_), Some((_, second))) => {
                return Err(RuleError::TooManySeparators(second.clone()));
            }
            (Some((index, _)), None) => index,
        };

        let mut lhs_tokens = tokens[..separator].to_vec();
        lhs_tokens.push(Token {
            range: tokens[separator].range,
            kind: TokenKind::Eof,
        });
        let rhs_tokens = &tokens[separator + 1..];

        let lhs = Self::compile_side(&lhs_tokens, registry)?;
        let rhs = Self::compile_side(rhs_tokens, registry)?;

        let bound = lhs.vars();
        if let Some(unbound) = rhs.vars().into_iter().find(|var| !bound.contains(var)) {
            return Err(RuleError::UndefinedVariable(unbound));
        }

        Ok(Self {
            source: SmolStr::new(rule.trim()),
            lhs,
            rhs,
        })
    }

    fn compile_side(tokens: &[Token], registry: &Registry<f64>) -> Result<TreePattern<f64>, RuleError> {
        let tree: Tree<Decl<f64>> = Parser::new(tokens.iter(), registry).parse()?;

        if let Some(Decl::Val(Op::Var(var))) = tree
            .values()
            .find(|decl| matches!(decl, Decl::Val(Op::Var(_))))
        {
            return Err(RuleError::PlainVariable(SmolStr::new(var.name())));
        }

        eval::validate(&tree)?;
        Ok(TreePattern::new(tree))
    }

    pub fn lhs(&self) -> &TreePattern<f64> {
        &self.lhs
    }

    pub fn rhs(&self) -> &TreePattern<f64> {
        &self.rhs
    }
}

impl Rewriter<f64> for RewriteRule {
    fn step(&self, tree: &mut Tree<Op<f64>>) -> bool {
        let found = tree
            .preorder(tree.root())
            .find_map(|id| self.lhs.matches(tree, id).map(|bindings| (id, bindings)));

        let Some((id, bindings)) = found else {
            return false;
        };

        match self.rhs.expand(tree, id, &bindings) {
            Some(replacement) => {
                tracing::debug!(rule = %self.source, node = %tree.value(id), "rewrite");
                tree.replace(id, replacement);
                true
            }
            None => false,
        }
    }
}

impl Display for RewriteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.lhs, self.rhs)
    }
}

const ARITHMETIC_RULES: &[&str] = &[
    "sub(<x>, <x>) -> 0",
    "add(<x>, <x>) -> mul(2, <x>)",
    "sub(<x>, 0) -> <x>",
    "add(<x>, 0) -> <x>",
    "add(0, <x>) -> <x>",
    "div(<x>, <x>) -> 1",
    "div(0, <x>) -> 0",
    "mul(<x>, 0) -> 0",
    "mul(0, <x>) -> 0",
    "mul(<x>, 1) -> <x>",
    "mul(1, <x>) -> <x>",
    "mul(<x>, <x>) -> pow(<x>, 2)",
    "pow(<x>, 0) -> 1",
    "pow(0, <x>) -> 0",
    "pow(1, <x>) -> 1",
    "pow(<x>, 1) -> <x>",
];

impl RuleSet<f64> {
    /// The algebraic identities as rewrite rules, followed by constant
    /// folding.
    pub fn arithmetic() -> Self {
        let registry = Registry::math();

        ARITHMETIC_RULES
            .iter()
            .fold(RuleSet::new(), |rules, rule| match RewriteRule::compile_with(rule, &registry) {
                Ok(compiled) => rules.with(compiled),
                Err(e) => unreachable!("invalid arithmetic rule `{rule}`: {e}"),
            })
            .with(ConstFolder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        format::{Style, format},
        parse,
        parser::error::ParseError,
    };
    use rstest::rstest;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    fn simplify(code: &str) -> String {
        let mut tree = parse(code, &Registry::math()).unwrap();
        RuleSet::arithmetic().rewrite(&mut tree, usize::MAX);
        format(&tree, Style::Minimal)
    }

    #[rstest]
    #[case::identity("add(<x>, 0) -> <x>", "x + 0", "x", 1)]
    #[case::infix_rule("<x> * <x> -> pow(<x>, 2)", "(a + 1)*(a + 1)", "(a + 1)^2.0", 1)]
    #[case::no_match("<x> * <x> -> pow(<x>, 2)", "(a + 1)*(a + 2)", "(a + 1)*(a + 2)", 0)]
    #[case::nested("sub(<x>, <x>) -> 0", "sin(y - y) + (z - z)", "sin(0.0) + 0.0", 2)]
    #[case::swap("add(<a>, <b>) -> add(<b>, <a>)", "x + y", "y + x", 1)]
    fn test_rule(#[case] rule: &str, #[case] code: &str, #[case] expected: &str, #[case] count: usize) {
        let rule = RewriteRule::compile(rule).unwrap();
        let mut tree = parse(code, &Registry::math()).unwrap();

        // swapping never reaches a fixpoint
        assert_eq!(rule.rewrite(&mut tree, count.max(1)), count);
        assert_eq!(format(&tree, Style::Minimal), expected);
    }

    #[rstest]
    #[case::missing("add(<x>, 0)", "MissingSeparator")]
    #[case::twice("<x> -> <x> -> <x>", "TooManySeparators")]
    #[case::unbound("add(<x>, 0) -> <y>", "UndefinedVariable")]
    #[case::plain_variable("add(x, 0) -> x", "PlainVariable")]
    #[case::lexer("add(<x>, 0) -> <x>~", "Lexer")]
    #[case::malformed_lhs("add(<x>, ) -> <x>", "Parse")]
    #[case::empty_rhs("add(<x>, 0) ->", "Parse")]
    #[case::arity("add(<x>) -> <x>", "Structure")]
    fn test_compile_error(#[case] rule: &str, #[case] expected: &str) {
        let error = RewriteRule::compile(rule).unwrap_err();
        let name = format!("{:?}", error);
        assert!(name.starts_with(expected), "{name}");
    }

    #[test]
    fn test_empty_lhs_points_at_separator() {
        let error = RewriteRule::compile("-> 0").unwrap_err();
        match error {
            RuleError::Parse(ParseError::EmptyExpression(token)) => {
                assert_eq!(token.range.start.column, 1)
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[rstest]
    #[case::moved_and_copied("add(<x>, <x>) -> mul(<x>, <x>)", "mul(5.0,5.0)", 25.0)]
    #[case::anchor("<x> -> neg(neg(<x>))", "neg(neg(add(5.0,5.0)))", 10.0)]
    fn test_rule_keeps_resolved_ephemeral(#[case] rule: &str, #[case] expected: &str, #[case] value: f64) {
        let draws = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&draws);
        let ephemeral = crate::op::Ephemeral::of(move || [5.0, 5.0, 7.0][counter.fetch_add(1, Ordering::SeqCst).min(2)]);

        let mut tree = Tree::new(Op::Function(Registry::math().function("add").unwrap().clone()));
        let root = tree.root();
        tree.push(root, Op::Ephemeral(ephemeral.clone()));
        tree.push(root, Op::Ephemeral(ephemeral));
        assert_eq!(eval::eval(&tree, &[]), Ok(10.0));

        assert_eq!(RewriteRule::compile(rule).unwrap().rewrite(&mut tree, 1), 1);
        assert_eq!(tree.to_string(), expected);
        assert_eq!(eval::eval(&tree, &[]), Ok(value));
        assert_eq!(draws.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_display() {
        let rule = RewriteRule::compile("mul(<x>, <x>) -> pow(<x>, 2)").unwrap();
        assert_eq!(rule.to_string(), "mul(<x>,<x>) -> pow(<x>,2.0)");
    }

    #[rstest]
    #[case::add_zero("x + 0", "x")]
    #[case::sub_self("x - x", "0.0")]
    #[case::div_zero("0/(x + y)", "0.0")]
    #[case::pow_zero_base("0^x", "0.0")]
    #[case::pow_one_base("1^x", "1.0")]
    #[case::square("y*y", "y^2.0")]
    #[case::double("z + z", "2.0*z")]
    #[case::folding("1 + 2 + 3 + 4", "10.0")]
    #[case::mixed("4.0 + 4.0 + x*(5.0 + 13.0)", "8.0 + x*18.0")]
    fn test_arithmetic_rules(#[case] code: &str, #[case] expected: &str) {
        assert_eq!(simplify(code), expected);
    }

    #[test]
    fn test_arithmetic_rules_reach_fixpoint() {
        let mut tree = parse("x*1 + (y - y)*z + 0*w", &Registry::math()).unwrap();
        let rules = RuleSet::arithmetic();
        assert!(rules.rewrite(&mut tree, usize::MAX) > 0);
        assert_eq!(rules.rewrite(&mut tree, usize::MAX), 0);
        assert_eq!(format(&tree, Style::Minimal), "x");
    }
}
