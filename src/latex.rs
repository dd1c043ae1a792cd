//! Resume compilation with XeLaTeX.
//!
//! # Flow
//!
//! ```text
//! compile_resume(engine, foo.tex, site/)
//!     │
//!     ├── remove stale site/foo.pdf
//!     ├── cd site/  ──► engine.run("foo.tex")  ──► cd back (always)
//!     ├── site/foo.pdf exists?  no ──► NoOutput (exit code ignored)
//!     ├── foo.pdf ──rename──► resume.pdf
//!     └── remove foo.aux, foo.log, foo.out
//! ```
//!
//! The engine's exit status is never used to decide success: XeLaTeX in
//! nonstop mode exits non-zero on recoverable warnings and can exit zero
//! without writing a PDF when wrapped in `nix-shell`.

use crate::{
    config::{LatexConfig, ToolchainMode},
    exec, log,
    logger::{log_fail, log_ok},
    site::{RESUME_PDF, Site},
    utils::{
        exec::tail_excerpt,
        fs::remove_if_exists,
        workdir::WorkdirGuard,
    },
};
use anyhow::Result;
use std::{
    ffi::{OsStr, OsString},
    fs, io,
    path::{Path, PathBuf},
    process::{ExitStatus, Output},
};
use thiserror::Error;

/// Extensions of compiler by-products removed after a successful build.
pub const AUX_EXTENSIONS: &[&str] = &["aux", "log", "out"];

const NONSTOP: &str = "-interaction=nonstopmode";

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("resume source `{}` not found", .0.display())]
    MissingSource(PathBuf),

    #[error("cannot remove stale `{}`", .path.display())]
    Stale {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot enter output directory: {0:#}")]
    Workdir(anyhow::Error),

    #[error("cannot run TeX engine: {0:#}")]
    Spawn(anyhow::Error),

    #[error("LaTeX compilation failed for `{}` ({status})", .source_file.display())]
    NoOutput {
        source_file: PathBuf,
        status: ExitStatus,
        stdout: String,
        stderr: String,
    },

    #[error("cannot rename `{}` to `{}`", .from.display(), .to.display())]
    Normalize {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot remove auxiliary file `{}`", .path.display())]
    Cleanup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ============================================================================
// Engines
// ============================================================================

/// Something that turns a `.tex` file in the current directory into a PDF.
pub trait TexEngine {
    /// Short human-readable description for log lines.
    fn label(&self) -> String;

    /// Run the engine on `source` (relative to the current directory).
    ///
    /// Returns the captured output whatever the exit status; only failing
    /// to start the process is an error.
    fn run(&self, source: &OsStr) -> Result<Output>;
}

/// Where the XeLaTeX binary comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toolchain {
    /// Provisioned on the fly: `nix-shell -p <package> --run "<engine> ..."`.
    Nix { shell: String, package: String },
    /// Taken from `PATH`.
    Native,
}

impl Toolchain {
    /// Pick a toolchain; `Auto` probes `PATH` with `which`.
    pub fn resolve(config: &LatexConfig) -> Self {
        let nix = || Self::Nix {
            shell: config.nix_shell.clone(),
            package: config.nix_package.clone(),
        };

        match config.toolchain {
            ToolchainMode::Nix => nix(),
            ToolchainMode::Native => Self::Native,
            ToolchainMode::Auto if which::which(&config.nix_shell).is_ok() => nix(),
            ToolchainMode::Auto if which::which(&config.engine).is_ok() => Self::Native,
            ToolchainMode::Auto => nix(),
        }
    }
}

/// The production engine: XeLaTeX in nonstop mode.
#[derive(Debug, Clone)]
pub struct XelatexEngine {
    engine: String,
    toolchain: Toolchain,
}

impl XelatexEngine {
    pub fn new(engine: impl Into<String>, toolchain: Toolchain) -> Self {
        Self {
            engine: engine.into(),
            toolchain,
        }
    }

    pub fn from_config(config: &LatexConfig) -> Self {
        Self::new(config.engine.clone(), Toolchain::resolve(config))
    }

    /// Command prefix and final argument for the configured toolchain.
    fn command_line(&self, source: &OsStr) -> (Vec<OsString>, OsString) {
        match &self.toolchain {
            Toolchain::Nix { shell, package } => {
                let script = format!(
                    "{} {NONSTOP} {}",
                    self.engine,
                    shell_quote(&source.to_string_lossy())
                );
                let cmd = [shell.as_str(), "-p", package.as_str(), "--run"]
                    .into_iter()
                    .map(OsString::from)
                    .collect();
                (cmd, OsString::from(script))
            }
            Toolchain::Native => (
                vec![OsString::from(&self.engine), OsString::from(NONSTOP)],
                source.to_os_string(),
            ),
        }
    }
}

impl TexEngine for XelatexEngine {
    fn label(&self) -> String {
        match &self.toolchain {
            Toolchain::Nix { package, .. } => format!("{} via nix ({package})", self.engine),
            Toolchain::Native => self.engine.clone(),
        }
    }

    fn run(&self, source: &OsStr) -> Result<Output> {
        let (cmd, arg) = self.command_line(source);
        exec!(cmd.as_slice(); arg)
    }
}

/// Single-quote `s` for `sh`.
fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

// ============================================================================
// Compilation
// ============================================================================

/// Compile `tex_file` inside `out_dir` and leave the result at `out_dir/resume.pdf`.
///
/// The process working directory is switched to `out_dir` for the engine
/// run and restored on every exit path.
pub fn compile_resume(
    engine: &dyn TexEngine,
    tex_file: &Path,
    out_dir: &Path,
    excerpt_len: usize,
) -> Result<PathBuf, CompileError> {
    let Some(stem) = tex_file.file_stem().filter(|_| tex_file.is_file()) else {
        return Err(CompileError::MissingSource(tex_file.to_path_buf()));
    };

    let produced = out_dir.join(sibling(stem, "pdf"));
    let target = out_dir.join(RESUME_PDF);

    // A leftover PDF would make the existence check below meaningless.
    remove_if_exists(&produced).map_err(|source| CompileError::Stale {
        path: produced.clone(),
        source,
    })?;

    let source_arg = tex_file.strip_prefix(out_dir).unwrap_or(tex_file);
    let output = {
        let _guard = WorkdirGuard::enter(out_dir).map_err(CompileError::Workdir)?;
        engine
            .run(source_arg.as_os_str())
            .map_err(CompileError::Spawn)?
    };

    if !produced.is_file() {
        return Err(CompileError::NoOutput {
            source_file: tex_file.to_path_buf(),
            status: output.status,
            stdout: tail_excerpt(&output.stdout, excerpt_len),
            stderr: tail_excerpt(&output.stderr, excerpt_len),
        });
    }

    if produced != target {
        remove_if_exists(&target).map_err(|source| CompileError::Stale {
            path: target.clone(),
            source,
        })?;
        fs::rename(&produced, &target).map_err(|source| CompileError::Normalize {
            from: produced.clone(),
            to: target.clone(),
            source,
        })?;
    }

    for ext in AUX_EXTENSIONS {
        let path = out_dir.join(sibling(stem, ext));
        remove_if_exists(&path).map_err(|source| CompileError::Cleanup { path, source })?;
    }

    Ok(target)
}

/// `<stem>.<ext>`, keeping any dots already in the stem.
fn sibling(stem: &OsStr, ext: &str) -> OsString {
    let mut name = stem.to_os_string();
    name.push(".");
    name.push(ext);
    name
}

/// Compile a site's resume, reporting the outcome on the console.
///
/// Never propagates: every failure is logged and turned into `false`.
pub fn compile_site_resume(engine: &dyn TexEngine, site: &Site, excerpt_len: usize) -> bool {
    let tex_file = site.resume_source();
    log!("latex"; "compiling {} with {}", tex_file.display(), engine.label());

    match compile_resume(engine, &tex_file, &site.dir, excerpt_len) {
        Ok(pdf) => {
            log_ok(&format!("Generated PDF: {}", pdf.display()));
            true
        }
        Err(CompileError::NoOutput {
            source_file,
            status,
            stdout,
            stderr,
        }) => {
            log_fail(&format!(
                "LaTeX compilation failed for {}",
                source_file.display()
            ));
            log!("latex"; "Return code: {status}");
            log!("latex"; "STDOUT: {stdout}");
            log!("latex"; "STDERR: {stderr}");
            false
        }
        Err(e) => {
            log_fail(&format!("Exception during LaTeX compilation: {:#}", anyhow::Error::new(e)));
            false
        }
    }
}


#[cfg(all(test, unix))]
mod tests {
    use super::testing::{PRODUCE_ALL, ShellEngine};
    use super::*;
    use crate::utils::workdir;
    use std::env;

    fn site_with_source(name: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let tex = dir.path().join(name);
        fs::write(&tex, r"\documentclass{article}\begin{document}hi\end{document}").unwrap();
        (dir, tex)
    }

    #[test]
    fn test_renames_and_cleans_up() {
        let (dir, tex) = site_with_source("foo.tex");
        let pdf = compile_resume(&ShellEngine(PRODUCE_ALL), &tex, dir.path(), 500).unwrap();

        assert_eq!(pdf, dir.path().join("resume.pdf"));
        assert!(pdf.is_file());
        for name in ["foo.pdf", "foo.aux", "foo.log", "foo.out"] {
            assert!(!dir.path().join(name).exists(), "{name} should be gone");
        }
        assert!(tex.exists());
    }

    #[test]
    fn test_resume_tex_keeps_name() {
        let (dir, tex) = site_with_source("resume.tex");
        compile_resume(&ShellEngine(PRODUCE_ALL), &tex, dir.path(), 500).unwrap();

        assert!(dir.path().join("resume.pdf").is_file());
        assert!(!dir.path().join("resume.log").exists());
        assert!(!dir.path().join("resume.aux").exists());
    }

    #[test]
    fn test_replaces_existing_resume_pdf() {
        let (dir, tex) = site_with_source("cv.tex");
        fs::write(dir.path().join("resume.pdf"), "old").unwrap();

        let script = r#"echo fresh > "${1%.tex}.pdf""#;
        compile_resume(&ShellEngine(script), &tex, dir.path(), 500).unwrap();

        let content = fs::read_to_string(dir.path().join("resume.pdf")).unwrap();
        assert_eq!(content.trim(), "fresh");
        assert!(!dir.path().join("cv.pdf").exists());
    }

    #[test]
    fn test_success_exit_without_pdf_is_failure() {
        let (dir, tex) = site_with_source("resume.tex");
        let script = "echo 'Emergency stop.'; echo 'missing font' >&2; exit 0";

        let err = compile_resume(&ShellEngine(script), &tex, dir.path(), 500).unwrap_err();
        match err {
            CompileError::NoOutput {
                status,
                stdout,
                stderr,
                ..
            } => {
                assert!(status.success());
                assert!(stdout.contains("Emergency stop."));
                assert!(stderr.contains("missing font"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_failure_exit_with_pdf_is_success() {
        let (dir, tex) = site_with_source("resume.tex");
        let script = r#"touch "${1%.tex}.pdf"; exit 1"#;

        let pdf = compile_resume(&ShellEngine(script), &tex, dir.path(), 500).unwrap();
        assert!(pdf.is_file());
    }

    #[test]
    fn test_stale_pdf_does_not_count() {
        let (dir, tex) = site_with_source("resume.tex");
        fs::write(dir.path().join("resume.pdf"), "from last week").unwrap();

        let err = compile_resume(&ShellEngine("exit 1"), &tex, dir.path(), 500).unwrap_err();
        assert!(matches!(err, CompileError::NoOutput { .. }));
        assert!(!dir.path().join("resume.pdf").exists());
    }

    #[test]
    fn test_empty_streams_reported_as_none() {
        let (dir, tex) = site_with_source("resume.tex");
        let err = compile_resume(&ShellEngine("exit 2"), &tex, dir.path(), 500).unwrap_err();
        let CompileError::NoOutput { stdout, stderr, status, .. } = err else {
            panic!("expected NoOutput");
        };
        assert_eq!(stdout, "None");
        assert_eq!(stderr, "None");
        assert_eq!(status.code(), Some(2));
    }

    #[test]
    fn test_excerpt_is_truncated() {
        let (dir, tex) = site_with_source("resume.tex");
        let script = r#"i=0; while [ $i -lt 200 ]; do echo "line $i"; i=$((i+1)); done"#;

        let err = compile_resume(&ShellEngine(script), &tex, dir.path(), 500).unwrap_err();
        let CompileError::NoOutput { stdout, .. } = err else {
            panic!("expected NoOutput");
        };
        assert!(stdout.len() <= 500);
        assert!(stdout.trim_end().ends_with("line 199"));
    }

    #[test]
    fn test_working_directory_restored() {
        let (dir, tex) = site_with_source("resume.tex");
        let before = workdir::with_lock(|| env::current_dir().unwrap());

        compile_resume(&ShellEngine(PRODUCE_ALL), &tex, dir.path(), 500).unwrap();
        assert_eq!(workdir::with_lock(|| env::current_dir().unwrap()), before);

        compile_resume(&ShellEngine("exit 1"), &tex, dir.path(), 500).unwrap_err();
        assert_eq!(workdir::with_lock(|| env::current_dir().unwrap()), before);
    }

    #[test]
    fn test_engine_runs_inside_output_directory() {
        let (dir, tex) = site_with_source("resume.tex");
        // Only a relative write proves the engine ran in the site directory.
        let script = r#"pwd -P > where.txt; touch resume.pdf"#;
        compile_resume(&ShellEngine(script), &tex, dir.path(), 500).unwrap();

        let recorded = fs::read_to_string(dir.path().join("where.txt")).unwrap();
        assert_eq!(
            PathBuf::from(recorded.trim()).canonicalize().unwrap(),
            dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let err = compile_resume(
            &ShellEngine(PRODUCE_ALL),
            &dir.path().join("resume.tex"),
            dir.path(),
            500,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::MissingSource(_)));
    }

    #[test]
    fn test_missing_output_directory() {
        let (dir, tex) = site_with_source("resume.tex");
        let err = compile_resume(
            &ShellEngine(PRODUCE_ALL),
            &tex,
            &dir.path().join("gone"),
            500,
        )
        .unwrap_err();
        assert!(matches!(err, CompileError::Workdir(_)));
    }

    #[test]
    fn test_unspawnable_engine() {
        let (dir, tex) = site_with_source("resume.tex");
        let engine = XelatexEngine::new("definitely-not-xelatex-folio", Toolchain::Native);
        let err = compile_resume(&engine, &tex, dir.path(), 500).unwrap_err();
        assert!(matches!(err, CompileError::Spawn(_)));
    }

    fn argv(engine: &XelatexEngine, source: &str) -> Vec<String> {
        let (mut cmd, arg) = engine.command_line(OsStr::new(source));
        cmd.push(arg);
        cmd.into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect()
    }

    #[test]
    fn test_command_line_native() {
        let engine = XelatexEngine::new("xelatex", Toolchain::Native);
        assert_eq!(
            argv(&engine, "resume.tex"),
            ["xelatex", "-interaction=nonstopmode", "resume.tex"]
        );
        assert_eq!(engine.label(), "xelatex");
    }

    #[test]
    fn test_command_line_nix() {
        let engine = XelatexEngine::new(
            "xelatex",
            Toolchain::Nix {
                shell: "nix-shell".into(),
                package: "texlive.combined.scheme-full".into(),
            },
        );
        assert_eq!(
            argv(&engine, "resume.tex"),
            [
                "nix-shell",
                "-p",
                "texlive.combined.scheme-full",
                "--run",
                "xelatex -interaction=nonstopmode 'resume.tex'",
            ]
        );
        assert!(engine.label().contains("nix"));
    }

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("resume.tex"), "'resume.tex'");
        assert_eq!(shell_quote("it's.tex"), r"'it'\''s.tex'");
    }

    #[test]
    fn test_toolchain_resolve_explicit() {
        let mut config = LatexConfig::default();
        config.toolchain = ToolchainMode::Native;
        assert_eq!(Toolchain::resolve(&config), Toolchain::Native);

        config.toolchain = ToolchainMode::Nix;
        assert!(matches!(Toolchain::resolve(&config), Toolchain::Nix { .. }));
    }

    #[test]
    fn test_toolchain_auto_falls_back_to_nix() {
        let config = LatexConfig {
            nix_shell: "no-such-nix-shell-folio".into(),
            engine: "no-such-xelatex-folio".into(),
            ..LatexConfig::default()
        };
        assert_eq!(
            Toolchain::resolve(&config),
            Toolchain::Nix {
                shell: "no-such-nix-shell-folio".into(),
                package: "texlive.combined.scheme-full".into(),
            }
        );
    }

    #[test]
    fn test_sibling_keeps_dots() {
        assert_eq!(sibling(OsStr::new("my.cv"), "pdf"), OsString::from("my.cv.pdf"));
    }

    #[test]
    fn test_compile_site_resume_reports_bool() {
        let (dir, _) = site_with_source("resume.tex");
        let site = Site {
            name: "main".into(),
            url_path: String::new(),
            dir: dir.path().to_path_buf(),
            has_resume: true,
            has_index: false,
        };
        assert!(!compile_site_resume(&ShellEngine("exit 1"), &site, 500));
        assert!(compile_site_resume(&ShellEngine(PRODUCE_ALL), &site, 500));
    }
}
