use assert_cmd::cargo;
use rstest::rstest;
use scopeguard::defer;
use std::io::Write;
use std::{fs::File, path::PathBuf};

const CONFIG_VARS: [&str; 4] = ["GPX_LOG", "RUST_LOG", "GPX_STYLE", "GPX_REWRITE_LIMIT"];

pub fn create_file(name: &str, content: &str) -> (PathBuf, PathBuf) {
    let temp_dir = std::env::temp_dir();
    let temp_file_path = temp_dir.join(name);
    let mut file = File::create(&temp_file_path).expect("Failed to create temp file");
    file.write_all(content.as_bytes())
        .expect("Failed to write to temp file");

    (temp_dir, temp_file_path)
}

fn gpx() -> assert_cmd::Command {
    let mut cmd = cargo::cargo_bin_cmd!("gpx");
    for var in CONFIG_VARS {
        cmd.env_remove(var);
    }
    cmd
}

#[rstest]
#[case::eval(vec!["eval", "2*z + 3*x - y", "3", "2", "1"], "9\n")]
#[case::eval_negative_args(vec!["eval", "x - 1", "-2"], "-3\n")]
#[case::eval_constant(vec!["eval", "hypot(3, 4)"], "5\n")]
#[case::simplify(vec!["simplify", "4.0+4.0+x*(5.0+13.0)"], "8.0 + x*18.0\n")]
#[case::simplify_bracketed(vec!["simplify", "4.0+4.0+x*(5.0+13.0)", "--style", "bracketed"], "8.0 + (x*18.0)\n")]
#[case::simplify_limit(vec!["simplify", "x*1*1", "--limit", "1"], "x*1.0\n")]
#[case::simplify_fold(vec!["simplify", "1+2+3+4"], "10.0\n")]
#[case::format_minimal(vec!["format", "(x+y)+z"], "x + y + z\n")]
#[case::format_bracketed(vec!["format", "(x+y)+z", "-s", "bracketed"], "(x + y) + z\n")]
#[case::format_power(vec!["format", "x^y^z"], "x^y^z\n")]
#[case::tree_parentheses(vec!["tree", "x*2"], "mul(x,2.0)\n")]
#[case::tree_lisp(vec!["tree", "x*sin(1)", "--format", "lisp"], "(mul x (sin 1.0))\n")]
#[case::tree_branches(vec!["tree", "x*2", "-f", "tree"], "mul\n├── x\n└── 2.0\n")]
fn test_cli_commands(#[case] args: Vec<&str>, #[case] expected_output: &str) -> Result<(), Box<dyn std::error::Error>> {
    let assert = gpx().args(args).assert();
    assert.success().code(0).stdout(expected_output.to_owned());

    Ok(())
}

#[rstest]
#[case::lexer(vec!["eval", "x~y"], "UnexpectedCharacter")]
#[case::syntax(vec!["format", "xy***g"], "UnexpectedToken")]
#[case::arguments(vec!["eval", "x + y", "1"], "EvalError::Argument")]
#[case::unknown_function(vec!["eval", "foo(1)"], "UnknownFunction")]
#[case::generate_unknown_op(vec!["generate", "--depth", "2", "--ops", "add,frobnicate"], "frobnicate")]
#[case::generate_no_terminals(vec!["generate", "--depth", "2", "--vars", ""], "Terminal pool is empty")]
#[case::tree_unknown_format(vec!["tree", "x", "--format", "svg"], "unknown tree format")]
#[case::missing_rules(vec!["simplify", "x", "--rules", "/nonexistent/gpx.rules"], "File not found")]
fn test_cli_errors(#[case] args: Vec<&str>, #[case] expected_stderr: &str) -> Result<(), Box<dyn std::error::Error>> {
    let output = gpx().args(args).output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains(expected_stderr), "unexpected stderr: {stderr}");

    Ok(())
}

#[test]
fn test_cli_style_from_env() -> Result<(), Box<dyn std::error::Error>> {
    gpx()
        .env("GPX_STYLE", "bracketed")
        .args(["format", "(x+y)+z"])
        .assert()
        .success()
        .stdout("(x + y) + z\n");

    // the flag overrides the environment
    gpx()
        .env("GPX_STYLE", "bracketed")
        .args(["format", "(x+y)+z", "--style", "minimal"])
        .assert()
        .success()
        .stdout("x + y + z\n");

    Ok(())
}

#[test]
fn test_cli_invalid_env_falls_back() -> Result<(), Box<dyn std::error::Error>> {
    let output = gpx()
        .env("GPX_STYLE", "fancy")
        .env("GPX_REWRITE_LIMIT", "many")
        .args(["simplify", "x*1*1"])
        .output()?;

    assert!(output.status.success());
    assert_eq!(String::from_utf8(output.stdout)?, "x\n");

    let stderr = String::from_utf8(output.stderr)?;
    assert!(stderr.contains("Invalid GPX_STYLE value 'fancy'"));
    assert!(stderr.contains("Invalid GPX_REWRITE_LIMIT value 'many'"));

    Ok(())
}

#[test]
fn test_cli_simplify_with_rules_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_, temp_file_path) = create_file(
        "test_cli_simplify_with_rules_file.rules",
        "# trigonometry\nsin(<x>)^2 + cos(<x>)^2 -> 1\n\nmul(<x>, 2) -> add(<x>, <x>)\n",
    );
    let temp_file_path_clone = temp_file_path.clone();

    defer! {
        if temp_file_path_clone.exists() {
            std::fs::remove_file(&temp_file_path_clone).expect("Failed to delete temp file");
        }
    }

    gpx()
        .arg("simplify")
        .arg("sin(a*b)^2 + cos(a*b)^2")
        .arg("--rules")
        .arg(temp_file_path.to_string_lossy().to_string())
        .assert()
        .success()
        .stdout("1.0\n");

    Ok(())
}

#[test]
fn test_cli_invalid_rules_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_, temp_file_path) = create_file("test_cli_invalid_rules_file.rules", "add(<x>, 0) <x>\n");
    let temp_file_path_clone = temp_file_path.clone();

    defer! {
        if temp_file_path_clone.exists() {
            std::fs::remove_file(&temp_file_path_clone).expect("Failed to delete temp file");
        }
    }

    let output = gpx()
        .arg("simplify")
        .arg("x")
        .arg("--rules")
        .arg(temp_file_path.to_string_lossy().to_string())
        .output()?;

    assert!(!output.status.success());
    assert!(String::from_utf8(output.stderr)?.contains("MissingSeparator"));

    Ok(())
}

#[test]
fn test_cli_flatten() -> Result<(), Box<dyn std::error::Error>> {
    let output = gpx().args(["flatten", "x + sin(y)"]).output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    let ops = stdout
        .lines()
        .filter_map(|line| line.split('│').nth(2))
        .map(str::trim)
        .collect::<Vec<_>>();

    assert_eq!(ops, vec!["op", "add", "x", "sin", "y"]);
    Ok(())
}

#[test]
fn test_cli_generate_is_reproducible() -> Result<(), Box<dyn std::error::Error>> {
    let args = ["generate", "--depth", "3", "--seed", "42", "--vars", "x,y", "--constants", "1,-1"];

    let first = gpx().args(args).output()?;
    let second = gpx().args(args).output()?;

    assert!(first.status.success());
    assert!(!first.stdout.is_empty());
    assert_eq!(first.stdout, second.stdout);

    Ok(())
}

#[test]
fn test_cli_generate_json() -> Result<(), Box<dyn std::error::Error>> {
    let output = gpx()
        .args(["generate", "--depth", "1", "--seed", "7", "--ops", "add", "--json"])
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.contains(r#""kind": "program""#));
    assert!(stdout.contains(r#""name": "add""#));
    assert!(stdout.contains(r#""name": "x""#));

    Ok(())
}
