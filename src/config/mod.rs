//! Generator configuration.
//!
//! There is no configuration file: every value has a built-in default (see
//! [`defaults`]) and a few can be overridden from the command line.
//!
//! | Group     | Purpose                                          |
//! |-----------|--------------------------------------------------|
//! | top level | portfolio root and public base URL               |
//! | `qr`      | QR image size, module size, quiet zone           |
//! | `latex`   | engine name, nix provisioning, failure excerpts  |

pub mod defaults;
mod error;

pub use error::ConfigError;

use crate::cli::{Cli, ToolchainArg};
use anyhow::{Result, bail};
use educe::Educe;
use std::path::{Path, PathBuf};

// ============================================================================
// Root Configuration
// ============================================================================

/// Everything a generation run needs to know.
#[derive(Debug, Clone, Educe)]
#[educe(Default)]
pub struct GeneratorConfig {
    /// Directory holding the site folders (absolute after `update_with_cli`).
    #[educe(Default = defaults::site::root())]
    pub root: PathBuf,

    /// Public base URL, without trailing slash.
    #[educe(Default = defaults::site::base_url())]
    pub base_url: String,

    pub qr: QrConfig,

    pub latex: LatexConfig,
}

/// QR image parameters.
#[derive(Debug, Clone, Copy, Educe)]
#[educe(Default)]
pub struct QrConfig {
    /// Final edge length in pixels.
    #[educe(Default = defaults::qr::size())]
    pub size: u32,

    /// Pixels per module when rendering, before resizing.
    #[educe(Default = defaults::qr::module_px())]
    pub module_px: u32,

    /// Quiet zone width in modules.
    #[educe(Default = defaults::qr::border())]
    pub border: u32,
}

/// How the TeX toolchain is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainMode {
    /// Prefer nix-shell, then a native engine, then nix-shell anyway.
    Auto,
    Nix,
    Native,
}

impl From<ToolchainArg> for ToolchainMode {
    fn from(arg: ToolchainArg) -> Self {
        match arg {
            ToolchainArg::Auto => Self::Auto,
            ToolchainArg::Nix => Self::Nix,
            ToolchainArg::Native => Self::Native,
        }
    }
}

/// Resume compilation parameters.
#[derive(Debug, Clone, Educe)]
#[educe(Default)]
pub struct LatexConfig {
    /// Engine binary, invoked as `<engine> -interaction=nonstopmode <file>`.
    #[educe(Default = defaults::latex::engine())]
    pub engine: String,

    #[educe(Default = defaults::latex::nix_shell())]
    pub nix_shell: String,

    /// Nix package providing the engine.
    #[educe(Default = defaults::latex::nix_package())]
    pub nix_package: String,

    #[educe(Default = defaults::latex::toolchain())]
    pub toolchain: ToolchainMode,

    /// Tail length of stdout/stderr reported on failure.
    #[educe(Default = defaults::latex::excerpt_len())]
    pub excerpt_len: usize,
}

impl GeneratorConfig {
    /// Build a validated configuration from CLI arguments.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = Self::default();
        config.update_with_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Full public URL for a site's URL path (`""` or `/<name>`).
    pub fn site_url(&self, url_path: &str) -> String {
        format!("{}{url_path}", self.base_url)
    }

    /// Path of the root-level copy of the main resume.
    pub fn root_resume(&self) -> PathBuf {
        self.root.join("resume.pdf")
    }

    /// Update configuration with CLI arguments
    pub fn update_with_cli(&mut self, cli: &Cli) {
        if let Some(root) = &cli.root {
            let expanded = shellexpand::tilde(&root.to_string_lossy()).into_owned();
            self.root = PathBuf::from(expanded);
        }
        self.root = Self::normalize_path(&self.root);

        Self::update_option(&mut self.base_url, cli.base_url.as_ref());
        self.base_url = self.base_url.trim_end_matches('/').to_owned();

        Self::update_option(&mut self.qr.size, cli.qr_size.as_ref());

        if let Some(toolchain) = cli.toolchain {
            self.latex.toolchain = toolchain.into();
        }
    }

    /// Update config option if CLI value is provided
    fn update_option<T: Clone>(config_option: &mut T, cli_option: Option<&T>) {
        if let Some(option) = cli_option {
            *config_option = option.clone();
        }
    }

    /// Normalize a path to absolute, using canonicalize if the path exists
    fn normalize_path(path: &Path) -> PathBuf {
        path.canonicalize().unwrap_or_else(|_| {
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                std::env::current_dir()
                    .map(|cwd| cwd.join(path))
                    .unwrap_or_else(|_| path.to_path_buf())
            }
        })
    }

    /// Validate configuration before a run
    pub fn validate(&self) -> Result<()> {
        let meta = std::fs::metadata(&self.root).map_err(|e| ConfigError::Io(self.root.clone(), e))?;
        if !meta.is_dir() {
            bail!(ConfigError::Validation(format!(
                "root `{}` is not a directory",
                self.root.display()
            )));
        }

        if !(self.base_url.starts_with("http://") || self.base_url.starts_with("https://")) {
            bail!(ConfigError::Validation(
                "base url must start with http:// or https://".into()
            ));
        }

        if self.qr.size == 0 || self.qr.module_px == 0 {
            bail!(ConfigError::Validation(
                "qr size and module size must be positive".into()
            ));
        }

        if self.qr.size > defaults::qr::MAX_SIZE {
            bail!(ConfigError::Validation(format!(
                "qr size {} exceeds the maximum of {}",
                self.qr.size,
                defaults::qr::MAX_SIZE
            )));
        }

        if self.latex.engine.is_empty() {
            bail!(ConfigError::Validation("latex engine must not be empty".into()));
        }

        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
