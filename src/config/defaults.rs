//! Default values for configuration fields.

// ============================================================================
// Site Defaults
// ============================================================================

pub mod site {
    use std::path::PathBuf;

    /// Public address of the portfolio; sites hang off it as `/<name>`.
    pub fn base_url() -> String {
        "https://ivan-nizamov.github.io".into()
    }

    pub fn root() -> PathBuf {
        "./".into()
    }
}

// ============================================================================
// QR Defaults
// ============================================================================

pub mod qr {
    pub const fn size() -> u32 {
        150
    }

    /// Largest accepted output edge; the bitmap is allocated as `size`².
    pub const MAX_SIZE: u32 = 4096;

    /// Pixels per QR module before the final resize.
    pub const fn module_px() -> u32 {
        10
    }

    /// Quiet zone around the symbol, in modules.
    pub const fn border() -> u32 {
        1
    }
}

// ============================================================================
// LaTeX Defaults
// ============================================================================

pub mod latex {
    use crate::config::ToolchainMode;

    pub fn engine() -> String {
        "xelatex".into()
    }

    pub fn nix_shell() -> String {
        "nix-shell".into()
    }

    pub fn nix_package() -> String {
        "texlive.combined.scheme-full".into()
    }

    pub const fn toolchain() -> ToolchainMode {
        ToolchainMode::Auto
    }

    /// Bytes of captured stdout/stderr shown when a compilation fails.
    pub const fn excerpt_len() -> usize {
        500
    }
}
