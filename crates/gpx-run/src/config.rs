use std::env;

use colored::Colorize;
use gpx_lang::{DEFAULT_REWRITE_LIMIT, Style};

/// Settings read from the environment. Command-line flags take precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub log_level: String,
    pub style: Style,
    pub rewrite_limit: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
            style: Style::Minimal,
            rewrite_limit: DEFAULT_REWRITE_LIMIT,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds a config from `var`, which looks up one variable by name.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(log_level) = var("GPX_LOG").or_else(|| var("RUST_LOG")) {
            config.log_level = log_level;
        }

        if let Some(style) = var("GPX_STYLE") {
            match style.parse::<Style>() {
                Ok(style) => config.style = style,
                Err(_) => warn(&format!(
                    "Invalid GPX_STYLE value '{}', using default {}",
                    style, config.style
                )),
            }
        }

        if let Some(limit) = var("GPX_REWRITE_LIMIT") {
            match limit.parse::<usize>() {
                Ok(limit) => config.rewrite_limit = limit,
                Err(_) => warn(&format!(
                    "Invalid GPX_REWRITE_LIMIT value '{}', using default {}",
                    limit, config.rewrite_limit
                )),
            }
        }

        config
    }
}

fn warn(message: &str) {
    eprintln!("{} {}", "Warning:".yellow().bold(), message);
}
