use gpx_lang::{
    Engine, Expression, GpxResult, Op, Options, Persisted, PersistedTree, Program, Registry, RewriteRule, Rewriter,
    RuleSet, Style, TerminalPool, Tree, flatten, rebuild,
};
use rand::{SeedableRng, rngs::StdRng};
use rstest::{fixture, rstest};

#[fixture]
fn engine() -> Engine {
    Engine::default()
}

#[fixture]
fn simplifying_engine() -> Engine {
    Engine::new(Options {
        simplify: true,
        ..Options::default()
    })
}

#[rstest]
#[case::precedence("1 + 2*3", vec![], Ok(7.0))]
#[case::power_is_right_associative("2^3^2", vec![], Ok(512.0))]
#[case::power_alias("2**3**2", vec![], Ok(512.0))]
#[case::unary_minus("-x^2", vec![3.0], Ok(-9.0))]
#[case::sorted_variables("2*z + 3*x - y", vec![3.0, 2.0, 1.0], Ok(9.0))]
#[case::named_constant("cos(PI)", vec![], Ok(-1.0))]
#[case::euler_alias("max(e, E)", vec![], Ok(std::f64::consts::E))]
#[case::infinity("min(inf, x)", vec![3.0], Ok(3.0))]
#[case::negative_infinity("-inf", vec![], Ok(f64::NEG_INFINITY))]
#[case::nan_constant("NaN + x", vec![1.0], Ok(f64::NAN))]
#[case::nested_calls("max(min(x, y), hypot(3, 4))", vec![1.0, 2.0], Ok(5.0))]
#[case::modulo("x % 3", vec![7.0], Ok(1.0))]
#[case::nan("sqrt(x)", vec![-1.0], Ok(f64::NAN))]
fn test_eval(engine: Engine, #[case] code: &str, #[case] args: Vec<f64>, #[case] expected: GpxResult) {
    let actual = engine.eval(code, &args);

    match (actual, expected) {
        (Ok(actual), Ok(expected)) if expected.is_nan() => assert!(actual.is_nan()),
        (actual, expected) => assert_eq!(actual, expected),
    }
}

#[rstest]
#[case::folding("1+2+3+4", "10.0")]
#[case::sine("sin(0)", "0.0")]
#[case::identities("(x + 0)*1 - 0", "x")]
#[case::cancellation("y*(x - x) + z", "z")]
#[case::doubling("x + x", "2.0*x")]
#[case::squaring("(a + b)*(a + b)", "(a + b)^2.0")]
#[case::partial_folding("4.0+4.0+x*(5.0+13.0)", "8.0 + x*18.0")]
fn test_simplify(simplifying_engine: Engine, #[case] code: &str, #[case] expected: &str) {
    assert_eq!(simplifying_engine.format(code).unwrap(), expected);
}

#[rstest]
fn test_rules_extend_simplifier(mut simplifying_engine: Engine) {
    simplifying_engine.add_rule("sin(<x>)^2 + cos(<x>)^2 -> 1").unwrap();
    simplifying_engine.add_rule("exp(log(<x>)) -> <x>").unwrap();

    let expr = simplifying_engine.parse("exp(log(y)) * (sin(x)^2 + cos(x)^2)").unwrap();
    assert_eq!(expr.format(Style::Minimal), "y");
    assert_eq!(expr.arity(), 2);
}

#[test]
fn test_rule_set_combines_rules() {
    let rules = RuleSet::new()
        .with(RewriteRule::compile("neg(neg(<x>)) -> <x>").unwrap())
        .with(RewriteRule::compile("abs(neg(<x>)) -> abs(<x>)").unwrap());

    let mut tree = gpx_lang::parse("abs(neg(neg(neg(x))))", &Registry::math()).unwrap();
    assert_eq!(rules.rewrite(&mut tree, 100), 2);
    assert_eq!(gpx_lang::format::format(&tree, Style::Minimal), "abs(x)");
}

#[rstest]
#[case::minimal(Style::Minimal, "x - (y - z) + x*(y + z)^2.0")]
#[case::bracketed(Style::Bracketed, "(x - (y - z)) + (x*((y + z)^2.0))")]
fn test_format_styles(engine: Engine, #[case] style: Style, #[case] expected: &str) {
    let expr = engine.parse("x-(y-z)+x*(y+z)^2").unwrap();
    assert_eq!(expr.format(style), expected);
    assert_eq!(Expression::parse(expected).unwrap(), expr);
}

/// Splices two flattened parents and repairs the child into a valid tree.
#[test]
fn test_crossover_by_splicing() {
    let registry = Registry::math();
    let left = flatten(&gpx_lang::parse("mul(add(a, b), sub(a, b))", &registry).unwrap());
    let right = flatten(&gpx_lang::parse("sin(cos(max(a, b)))", &registry).unwrap());

    let mut child = left[..2].to_vec();
    child.extend_from_slice(&right[1..]);

    let pool = TerminalPool::new([Op::var("a", 0), Op::var("b", 1)]).unwrap();
    let tree = rebuild(&child, &pool, &mut StdRng::seed_from_u64(1));

    assert_eq!(gpx_lang::eval::validate(&tree), Ok(()));
    assert_eq!(tree.root_value().name(), Some("mul"));
    assert!(Expression::new(tree).unwrap().eval(&[1.0, 2.0]).is_ok());
}

#[test]
fn test_generate_persist_restore() {
    let registry = Registry::math();
    let operations = ["add", "mul", "sin"]
        .iter()
        .map(|name| Op::Function(registry.function(name).unwrap().clone()))
        .collect::<Vec<_>>();
    let terminals = [Op::var("x", 0), Op::constant(0.5)];

    let program = Program::generate("individual", 3, &operations, &terminals, &mut StdRng::seed_from_u64(9)).unwrap();
    let json = serde_json::to_string(&Persisted::of(&Op::Program(program.clone()))).unwrap();

    let restored = serde_json::from_str::<Persisted<f64>>(&json)
        .unwrap()
        .restore(&registry)
        .unwrap();

    let Op::Program(restored) = restored else {
        panic!("expected a program, got {restored:?}");
    };
    assert_eq!(restored, program);
    assert_eq!(restored.apply(&[0.25]), program.apply(&[0.25]));
}

#[test]
fn test_persisted_tree_json_shape() {
    let tree = gpx_lang::parse("x*2", &Registry::math()).unwrap();
    let json = serde_json::to_value(PersistedTree::of(&tree)).unwrap();

    assert_eq!(
        json,
        serde_json::json!([
            {"op": {"kind": "function", "name": "mul", "arity": 2}, "children": 2},
            {"op": {"kind": "var", "name": "x", "index": 0}, "children": 0},
            {"op": {"kind": "const", "value": 2.0}, "children": 0},
        ])
    );
}

#[test]
fn test_boolean_trees() {
    let registry = Registry::<bool>::boolean();
    let and = Op::Function(registry.function("and").unwrap().clone());
    let not = Op::Function(registry.function("not").unwrap().clone());

    let mut tree = Tree::new(and);
    let root = tree.root();
    tree.push(root, Op::var("p", 0));
    let negation = tree.push(root, not);
    tree.push(negation, Op::var("q", 1));

    assert_eq!(gpx_lang::eval::eval(&tree, &[true, false]), Ok(true));
    assert_eq!(gpx_lang::eval::eval(&tree, &[true, true]), Ok(false));
    assert_eq!(gpx_lang::format::format(&tree, Style::Minimal), "and(p, not(q))");
}

#[test]
fn test_custom_function() {
    let mut engine = Engine::default();
    engine.register(gpx_lang::Function::of("clamp", 3, |v: &[f64]| v[0].max(v[1]).min(v[2])));

    assert_eq!(engine.eval("clamp(x, 0, 1)", &[2.5]), Ok(1.0));
    assert!(engine.eval("clamp(x, 0)", &[2.5]).is_err());
}
