//! Command-line interface definitions.
//!
//! Running `folio` with no arguments processes every site under the current
//! directory with the built-in defaults. Every flag is an optional override.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Generate QR codes and resume PDFs for every site of a personal portfolio
#[derive(Parser, Debug, Clone, Default)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Portfolio root containing the site directories (default: current directory)
    #[arg(short, long)]
    pub root: Option<PathBuf>,

    /// Public base URL; each site is served at `<base-url>/<site>`
    #[arg(long = "base-url")]
    pub base_url: Option<String>,

    /// Edge length of the generated QR code image, in pixels (1-4096)
    #[arg(long = "qr-size")]
    pub qr_size: Option<u32>,

    /// How to obtain the XeLaTeX toolchain
    #[arg(long, value_enum)]
    pub toolchain: Option<ToolchainArg>,
}

/// Toolchain selection as given on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolchainArg {
    /// Use nix-shell when available, else a native xelatex, else nix-shell
    Auto,
    /// Always provision TeX Live through nix-shell
    Nix,
    /// Always call xelatex from PATH
    Native,
}
