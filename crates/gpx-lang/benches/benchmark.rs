use gpx_lang::{Expression, Op, Registry, RuleSet, Style, TerminalPool, Tree, flatten, generate, rebuild};
use rand::{SeedableRng, rngs::StdRng};

fn main() {
    divan::main();
}

const EXPRESSION: &str = "x*sin(y)^2 + (x - y)/(1 + hypot(x, y)) - max(x, y)^3 % 7";

fn random_tree(depth: usize) -> Tree<Op<f64>> {
    let registry = Registry::math();
    let operations = ["add", "sub", "mul", "div", "sin", "max"]
        .iter()
        .filter_map(|name| registry.function(name).cloned().map(Op::Function))
        .collect::<Vec<_>>();
    let terminals = [Op::var("x", 0), Op::var("y", 1), Op::constant(1.0), Op::constant(0.0)];

    generate::full(depth, &operations, &terminals, &mut StdRng::seed_from_u64(0)).unwrap()
}

#[divan::bench(name = "parse")]
fn parse() -> Expression {
    Expression::parse(divan::black_box(EXPRESSION)).unwrap()
}

#[divan::bench(name = "eval")]
fn eval(bencher: divan::Bencher) {
    let expr = Expression::parse(EXPRESSION).unwrap();
    bencher.bench_local(|| expr.eval(divan::black_box(&[0.5, 2.0])).unwrap());
}

#[divan::bench(args = [4, 8])]
fn simplify_random(bencher: divan::Bencher, depth: usize) {
    let tree = random_tree(depth);
    bencher.bench_local(|| Expression::new(tree.clone()).unwrap().simplified());
}

#[divan::bench(args = [4, 8])]
fn arithmetic_rules(bencher: divan::Bencher, depth: usize) {
    let rules = RuleSet::arithmetic();
    let tree = random_tree(depth);

    bencher.bench_local(|| {
        let mut expr = Expression::new(tree.clone()).unwrap();
        expr.rewrite(&rules, 10_000)
    });
}

#[divan::bench(args = [Style::Minimal, Style::Bracketed])]
fn format(bencher: divan::Bencher, style: Style) {
    let tree = random_tree(8);
    bencher.bench_local(|| gpx_lang::format::format(&tree, style));
}

#[divan::bench(args = [8, 12])]
fn flatten_rebuild(bencher: divan::Bencher, depth: usize) {
    let seq = flatten(&random_tree(depth));
    let pool = TerminalPool::new([Op::var("x", 0)]).unwrap();
    let mut rng = StdRng::seed_from_u64(1);

    bencher.bench_local(|| rebuild(&seq[..seq.len() / 2], &pool, &mut rng));
}
