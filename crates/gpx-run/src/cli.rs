use std::io::{self, BufWriter, Write};
use std::{fs, path::PathBuf};

use clap::{Parser, Subcommand};
use gpx_lang::{Engine, Expression, Op, Options, Persisted, Program, Registry, Style, TreeFormat};
use miette::{IntoDiagnostic, miette};
use rand::{SeedableRng, rngs::StdRng};
use tabled::{builder::Builder, settings::Style as TableStyle};
use tracing_subscriber::EnvFilter;

use crate::config::Config;

#[derive(Parser, Debug)]
#[command(name = "gpx")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = "# Examples:\n\n\
    ## To evaluate an expression (arguments follow the sorted variable names):\n\
    gpx eval '2*z + 3*x - y' 3 2 1\n\n\
    ## To simplify an expression:\n\
    gpx simplify '4.0+4.0+x*(5.0+13.0)'\n\n\
    ## To generate a random program:\n\
    gpx generate --depth 3 --seed 42")]
#[command(
    about = "gpx parses, evaluates, simplifies and generates the expression trees of genetic programs.",
    long_about = None
)]
pub struct Cli {
    /// Log debug events to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[clap(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Evaluate an expression
    Eval {
        expr: String,
        /// Argument values, ordered by variable name
        #[arg(allow_negative_numbers = true)]
        args: Vec<f64>,
    },
    /// Simplify an expression until no rule applies
    Simplify {
        expr: String,
        /// Maximum number of rewrites
        #[arg(short, long)]
        limit: Option<usize>,
        /// Load additional `<lhs> -> <rhs>` rules, one per line
        #[arg(short, long, value_name = "FILE")]
        rules: Option<PathBuf>,
        #[arg(short, long)]
        style: Option<Style>,
    },
    /// Print an expression in the given style
    Format {
        expr: String,
        #[arg(short, long)]
        style: Option<Style>,
    },
    /// Show the breadth-first linear form of an expression
    Flatten { expr: String },
    /// Print the operation tree of an expression
    Tree {
        expr: String,
        /// `parentheses`, `tree`, `lisp` or `dot`
        #[arg(short, long, default_value_t)]
        format: TreeFormat,
    },
    /// Generate a random full tree
    Generate {
        /// Number of levels below the root
        #[arg(short, long)]
        depth: usize,
        /// Seed for reproducible output
        #[arg(long)]
        seed: Option<u64>,
        /// Functions to build the tree from
        #[arg(long, value_delimiter = ',', default_value = "add,sub,mul,div")]
        ops: Vec<String>,
        /// Variable names used as terminals
        #[arg(long, value_delimiter = ',', default_value = "x")]
        vars: Vec<String>,
        /// Constants used as terminals
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        constants: Vec<f64>,
        #[arg(short, long)]
        style: Option<Style>,
        /// Print the program as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Cli {
    pub fn run(&self) -> miette::Result<()> {
        let config = Config::from_env();
        self.init_tracing(&config);

        let stdout = io::stdout();
        let mut handle = BufWriter::new(stdout.lock());

        match &self.commands {
            Commands::Eval { expr, args } => {
                let value = Engine::default().eval(expr, args)?;
                writeln!(handle, "{}", value).into_diagnostic()?;
            }
            Commands::Simplify {
                expr,
                limit,
                rules,
                style,
            } => {
                let mut engine = Engine::new(Options {
                    simplify: false,
                    rewrite_limit: limit.unwrap_or(config.rewrite_limit),
                    style: style.unwrap_or(config.style),
                });

                if let Some(path) = rules {
                    if !path.exists() {
                        return Err(miette!("File not found: {}", path.display()));
                    }

                    let content = fs::read_to_string(path).into_diagnostic()?;
                    for rule in content
                        .lines()
                        .map(str::trim)
                        .filter(|line| !line.is_empty() && !line.starts_with('#'))
                    {
                        engine.add_rule(rule)?;
                    }
                }

                let mut expression = engine.parse(expr)?;
                let count = engine.simplify(&mut expression);
                tracing::info!(count, "simplification finished");

                writeln!(handle, "{}", expression.format(engine.options().style)).into_diagnostic()?;
            }
            Commands::Format { expr, style } => {
                let expression = Expression::parse(expr)?;
                writeln!(handle, "{}", expression.format(style.unwrap_or(config.style)))
                    .into_diagnostic()?;
            }
            Commands::Flatten { expr } => {
                let expression = Expression::parse(expr)?;
                writeln!(handle, "{}", flat_table(&expression)).into_diagnostic()?;
            }
            Commands::Tree { expr, format } => {
                let expression = Expression::parse(expr)?;
                writeln!(handle, "{}", expression.tree().format(*format)).into_diagnostic()?;
            }
            Commands::Generate {
                depth,
                seed,
                ops,
                vars,
                constants,
                style,
                json,
            } => {
                let registry = Registry::math();
                let operations = ops
                    .iter()
                    .map(|name| {
                        registry
                            .function(name.trim())
                            .cloned()
                            .map(Op::Function)
                            .ok_or_else(|| miette!("Unknown function `{}`", name))
                    })
                    .collect::<miette::Result<Vec<_>>>()?;
                let terminals = terminals(vars, constants);

                let mut rng = match seed {
                    Some(seed) => StdRng::seed_from_u64(*seed),
                    None => StdRng::from_entropy(),
                };
                let program =
                    Program::generate("main", *depth, &operations, &terminals, &mut rng).into_diagnostic()?;

                if *json {
                    let persisted = Persisted::of(&Op::Program(program));
                    writeln!(handle, "{}", serde_json::to_string_pretty(&persisted).into_diagnostic()?)
                        .into_diagnostic()?;
                } else {
                    let formatted = gpx_lang::format::format(program.body(), style.unwrap_or(config.style));
                    writeln!(handle, "{}", formatted).into_diagnostic()?;
                }
            }
        }

        handle.flush().into_diagnostic()
    }

    fn init_tracing(&self, config: &Config) {
        let filter = if self.verbose {
            EnvFilter::new("debug")
        } else {
            EnvFilter::new(&config.log_level)
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .try_init();
    }
}

/// Variables indexed by the sorted order of their names, followed by the
/// constants.
fn terminals(vars: &[String], constants: &[f64]) -> Vec<Op<f64>> {
    let mut names = vars
        .iter()
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .collect::<Vec<_>>();
    names.sort_unstable();
    names.dedup();

    names
        .into_iter()
        .enumerate()
        .map(|(index, name)| Op::var(name, index))
        .chain(constants.iter().map(|value| Op::constant(*value)))
        .collect()
}

fn flat_table(expression: &Expression) -> String {
    let mut builder = Builder::default();
    builder.push_record(["#", "op", "children", "offset"]);

    for (index, node) in gpx_lang::flatten(expression.tree()).iter().enumerate() {
        builder.push_record([
            index.to_string(),
            node.value.to_string(),
            node.child_count.to_string(),
            node.child_offset.map_or_else(|| "-".to_string(), |offset| offset.to_string()),
        ]);
    }

    builder.build().with(TableStyle::sharp()).to_string()
}
