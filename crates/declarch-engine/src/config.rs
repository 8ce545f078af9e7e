//! Baseline configuration.
//!
//! Read from the environment (`TEST_MODE`, `BASELINE_REF`, `AUTO_BACKTRACK`,
//! `MAX_BACKTRACK`) through an injectable lookup, so callers and tests can
//! supply values without touching the process environment.

#![allow(clippy::result_large_err)]

use declarch_core::errors::{ExError, ExErrorKind};
use declarch_store::Result;
use std::path::{Path, PathBuf};

pub const ENV_TEST_MODE: &str = "TEST_MODE";
pub const ENV_BASELINE_REF: &str = "BASELINE_REF";
pub const ENV_AUTO_BACKTRACK: &str = "AUTO_BACKTRACK";
pub const ENV_MAX_BACKTRACK: &str = "MAX_BACKTRACK";

/// Revision used when nothing else is configured
pub const DEFAULT_BASELINE_REF: &str = "HEAD";
pub const DEFAULT_MAX_BACKTRACK: u32 = 10;

/// How the baseline snapshot is chosen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BaselineMode {
    /// The local latest file
    Local,
    /// The latest file at one named revision; absent there is an error
    ExplicitRef(String),
    /// The latest file at `HEAD`, or an empty baseline if it was never
    /// committed
    DefaultHead,
    /// The first usable latest file walking back from `HEAD`
    AutoBacktrack { max_steps: u32 },
}

impl std::fmt::Display for BaselineMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BaselineMode::Local => f.write_str("local"),
            BaselineMode::ExplicitRef(rev) => write!(f, "ref:{}", rev),
            BaselineMode::DefaultHead => write!(f, "default:{}", DEFAULT_BASELINE_REF),
            BaselineMode::AutoBacktrack { max_steps } => write!(f, "auto-backtrack:{}", max_steps),
        }
    }
}

/// Raw baseline settings before precedence is applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaselineSettings {
    pub test_mode: bool,
    pub baseline_ref: Option<String>,
    pub auto_backtrack: bool,
    pub max_backtrack: u32,
}

impl Default for BaselineSettings {
    fn default() -> Self {
        Self {
            test_mode: false,
            baseline_ref: None,
            auto_backtrack: false,
            max_backtrack: DEFAULT_MAX_BACKTRACK,
        }
    }
}

impl BaselineSettings {
    /// Settings from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Settings from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// `InvalidInput` if `MAX_BACKTRACK` is set but not a positive integer.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |name: &str| lookup(name).map(|v| is_truthy(&v)).unwrap_or(false);

        let baseline_ref = lookup(ENV_BASELINE_REF)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());

        let max_backtrack = match lookup(ENV_MAX_BACKTRACK) {
            Some(raw) if !raw.trim().is_empty() => parse_max_backtrack(&raw)?,
            _ => DEFAULT_MAX_BACKTRACK,
        };

        Ok(Self {
            test_mode: flag(ENV_TEST_MODE),
            baseline_ref,
            auto_backtrack: flag(ENV_AUTO_BACKTRACK),
            max_backtrack,
        })
    }

    /// Apply precedence: test mode, then explicit ref, then auto-backtrack,
    /// then the default `HEAD` lookup.
    pub fn mode(&self) -> BaselineMode {
        if self.test_mode {
            BaselineMode::Local
        } else if let Some(rev) = &self.baseline_ref {
            BaselineMode::ExplicitRef(rev.clone())
        } else if self.auto_backtrack {
            BaselineMode::AutoBacktrack {
                max_steps: self.max_backtrack,
            }
        } else {
            BaselineMode::DefaultHead
        }
    }
}

/// `1`, `true`, `yes` or `on`, case-insensitive
pub fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse a backtrack budget; zero and non-numbers are rejected.
pub fn parse_max_backtrack(raw: &str) -> Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ExError::new(ExErrorKind::InvalidInput)
            .with_op("parse_config")
            .with_entity_id(ENV_MAX_BACKTRACK)
            .with_message(format!("expected a positive integer, got {:?}", raw))),
    }
}

/// Path of `file` relative to `repo_dir`, `/`-separated, as history
/// readers expect.
///
/// Paths are resolved through their nearest existing ancestor, so relative
/// and absolute spellings agree even before the data directory exists.
pub fn repo_relative_path(repo_dir: &Path, file: &Path) -> Result<String> {
    let repo = resolve_path(repo_dir);
    let file = resolve_path(file);

    let relative = file.strip_prefix(&repo).map_err(|_| {
        ExError::new(ExErrorKind::InvalidInput)
            .with_op("repo_relative_path")
            .with_entity_id(file.display().to_string())
            .with_message(format!("not inside repository {}", repo.display()))
    })?;

    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

fn resolve_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(cwd) => cwd.join(path),
            Err(_) => return path.to_path_buf(),
        }
    };

    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }
}
