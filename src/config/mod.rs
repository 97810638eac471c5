//! Site configuration management for `marksite.toml`.
//!
//! # Keys
//!
//! | Key / Section | Purpose                                       |
//! |---------------|-----------------------------------------------|
//! | `outputDir`   | Where the generated site is written           |
//! | `baseURL`     | Absolute site URL exposed to templates        |
//! | `siteTitle`   | Site title exposed to templates               |
//! | `[serve]`     | Development server (port, interface, watch)   |
//! | `[extra]`     | User-defined values exposed to templates      |
//!
//! # Example
//!
//! ```toml
//! outputDir = "public"
//! baseURL = "https://example.com"
//! siteTitle = "My Blog"
//!
//! [serve]
//! port = 1313
//!
//! [extra]
//! analytics_id = "UA-12345"
//! ```
//!
//! # Precedence
//!
//! defaults < config file < `MARKSITE_*` environment variables < CLI flags

mod defaults;
mod error;
pub mod paths;
mod serve;

pub use error::ConfigError;
pub use paths::SitePaths;
pub use serve::ServeConfig;

use crate::{
    cli::{Cli, Commands},
    log,
};
use anyhow::Result;
use educe::Educe;
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::{Component, Path, PathBuf},
};

/// Environment variable overriding `outputDir`.
pub const ENV_OUTPUT_DIR: &str = "MARKSITE_OUTPUT_DIR";
/// Environment variable overriding `baseURL`.
pub const ENV_BASE_URL: &str = "MARKSITE_BASE_URL";
/// Environment variable overriding `siteTitle`.
pub const ENV_SITE_TITLE: &str = "MARKSITE_SITE_TITLE";

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure representing marksite.toml
#[derive(Debug, Clone, Educe, Serialize, Deserialize)]
#[educe(Default)]
#[serde(deny_unknown_fields)]
pub struct SiteConfig {
    /// Absolute project root (set after loading)
    #[serde(skip)]
    #[educe(Default = PathBuf::from("./"))]
    pub root: PathBuf,

    /// Path of the config file that was read, if any
    #[serde(skip)]
    pub config_path: Option<PathBuf>,

    /// Output directory, relative to the root unless absolute.
    #[serde(rename = "outputDir", default = "defaults::output_dir")]
    #[educe(Default = defaults::output_dir())]
    pub output_dir: PathBuf,

    /// Absolute site URL, empty for root-relative links.
    #[serde(rename = "baseURL", default)]
    pub base_url: String,

    /// Site title.
    #[serde(rename = "siteTitle", default = "defaults::site_title")]
    #[educe(Default = defaults::site_title())]
    pub site_title: String,

    /// Development server settings
    #[serde(default)]
    pub serve: ServeConfig,

    /// User-defined extra fields
    #[serde(default)]
    pub extra: BTreeMap<String, toml::Value>,
}

impl SiteConfig {
    /// Parse configuration from TOML string
    pub fn from_str(content: &str) -> Result<Self> {
        let config: SiteConfig = toml::from_str(content).map_err(ConfigError::Toml)?;
        Ok(config)
    }

    /// Load configuration from file path
    pub fn from_path(path: &Path) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let mut config = Self::from_str(&content)?;
        config.config_path = Some(path.to_path_buf());
        Ok(config)
    }

    /// Resolve the full configuration for a CLI invocation.
    ///
    /// A missing default config file is not an error (defaults apply); a
    /// missing file passed with `--config` is.
    pub fn load(cli: &Cli) -> Result<Self> {
        let root = normalize_path(cli.root.as_deref().unwrap_or(Path::new("./")));

        let mut config = match &cli.config {
            Some(explicit) => {
                let path = root.join(explicit);
                if !path.exists() {
                    return Err(ConfigError::NotFound(path).into());
                }
                Self::from_path(&path)?
            }
            None => {
                let path = root.join(defaults::config_file());
                if path.exists() {
                    Self::from_path(&path)?
                } else {
                    log!("config"; "no config file found, using defaults");
                    Self::default()
                }
            }
        };

        if let Some(path) = &config.config_path {
            log!("config"; "using {}", path.display());
        }

        config.root = root;
        config.update_with_env(|key| std::env::var(key).ok());
        config.update_with_cli(cli);
        config.output_dir = normalize_path(&config.root.join(&config.output_dir));
        config.validate()?;

        Ok(config)
    }

    /// Apply `MARKSITE_*` environment overrides through `lookup`.
    pub fn update_with_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(output) = lookup(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(output);
        }
        Self::update_option(&mut self.base_url, lookup(ENV_BASE_URL).as_ref());
        Self::update_option(&mut self.site_title, lookup(ENV_SITE_TITLE).as_ref());
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        if let Commands::Serve {
            interface,
            port,
            watch,
        } = &cli.command
        {
            Self::update_option(&mut self.serve.interface, interface.as_ref());
            Self::update_option(&mut self.serve.port, port.as_ref());
            Self::update_option(&mut self.serve.watch, watch.as_ref());
        }
    }

    /// Update config option if a new value is provided
    fn update_option<T: Clone>(config_option: &mut T, new_option: Option<&T>) {
        if let Some(option) = new_option {
            *config_option = option.clone();
        }
    }

    /// Directory layout resolved against the root.
    pub fn paths(&self) -> SitePaths<'_> {
        SitePaths::new(&self.root, &self.output_dir)
    }

    /// Reject settings that would make a build destroy its own sources.
    pub fn validate(&self) -> Result<()> {
        let root = lexical_normalize(&self.root);
        let output = lexical_normalize(&self.output_dir);
        let paths = SitePaths::new(&root, &output);

        if output == root {
            return Err(ConfigError::Validation(
                "[outputDir] must not be the project root".into(),
            )
            .into());
        }

        for source in paths.sources() {
            if output.starts_with(&source) || source.starts_with(&output) {
                return Err(ConfigError::Validation(format!(
                    "[outputDir] `{}` overlaps source directory `{}`",
                    output.display(),
                    source.display()
                ))
                .into());
            }
        }

        if self.serve.debounce_ms == 0 {
            return Err(
                ConfigError::Validation("[serve.debounce_ms] must be positive".into()).into(),
            );
        }

        Ok(())
    }
}

/// Make a path absolute with every `.` and `..` resolved.
///
/// The deepest existing ancestor is canonicalized so symlinks resolve; the
/// part that does not exist yet is appended as is.
fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };
    let lexical = lexical_normalize(&absolute);

    let mut existing = lexical.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |acc, name| acc.join(name));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name);
                existing = parent;
            }
            _ => return lexical.clone(),
        }
    }
}

/// Resolve `.` and `..` components without touching the filesystem.
fn lexical_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else if !out.has_root() {
                    out.push(component);
                }
            }
            other => out.push(other),
        }
    }
    out
}

// ============================================================================
// Tests
// ============================================================================
