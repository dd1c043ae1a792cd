//! External command execution utilities.
//!
//! Runs a command to completion and hands back the captured output without
//! judging the exit status. Callers decide what counts as success, since
//! some tools (notably TeX engines) report failure codes for usable output
//! and vice versa.

use anyhow::{Context, Result};
use regex::Regex;
use std::{
    borrow::Cow,
    ffi::OsString,
    process::{Command, Output},
    sync::OnceLock,
};

// ============================================================================
// Macros
// ============================================================================

/// Run an external command with arguments, capturing stdout and stderr.
///
/// Runs in the current working directory; see `WorkdirGuard`.
///
/// # Examples
/// ```ignore
/// exec!(cmd.as_slice(); "resume.tex")?;
/// ```
#[macro_export]
macro_rules! exec {
    ($cmd:expr; $($arg:expr),* $(,)?) => {{
        $crate::utils::exec::exec(
            &$crate::utils::exec::to_cmd_vec($cmd),
            &$crate::utils::exec::filter_args(&[$($crate::utils::exec::to_os($arg)),*]),
        )
    }};
}

// ============================================================================
// Argument Conversion
// ============================================================================

/// Convert to `OsString`.
#[inline]
pub fn to_os<S: Into<OsString>>(s: S) -> OsString {
    s.into()
}

/// Trait for converting to command vector.
pub trait ToCmd {
    fn to_cmd(self) -> Vec<OsString>;
}

#[cfg(test)]
impl<const N: usize> ToCmd for [&str; N] {
    #[inline]
    fn to_cmd(self) -> Vec<OsString> {
        self.into_iter().map(OsString::from).collect()
    }
}

impl ToCmd for &[OsString] {
    #[inline]
    fn to_cmd(self) -> Vec<OsString> {
        self.to_vec()
    }
}

/// Convert command to `Vec<OsString>`.
#[inline]
pub fn to_cmd_vec<C: ToCmd>(cmd: C) -> Vec<OsString> {
    cmd.to_cmd()
}

/// Filter out empty args.
#[inline]
pub fn filter_args(args: &[OsString]) -> Vec<OsString> {
    args.iter().filter(|a| !a.is_empty()).cloned().collect()
}

// ============================================================================
// Command Execution
// ============================================================================

/// Execute a command and capture its output.
///
/// # Errors
/// Returns error only if the command cannot be spawned or waited on.
/// A non-zero exit status is *not* an error here.
pub fn exec(cmd: &[OsString], args: &[OsString]) -> Result<Output> {
    let (name, mut command) = prepare(cmd, args)?;

    command
        .output()
        .with_context(|| format!("Failed to execute `{name}`"))
}

/// Prepare a Command from components.
fn prepare(cmd: &[OsString], args: &[OsString]) -> Result<(String, Command)> {
    let name = cmd
        .first()
        .and_then(|s| s.to_str())
        .context("Empty command")?
        .to_owned();

    let mut command = Command::new(&cmd[0]);
    command.args(&cmd[1..]).args(args);

    Ok((name, command))
}

// ============================================================================
// Output Excerpts
// ============================================================================

fn strip_ansi(s: &str) -> Cow<'_, str> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    match RE.get_or_init(|| Regex::new(r"\x1b\[[0-9;]*m").ok()) {
        Some(re) => re.replace_all(s, ""),
        None => Cow::Borrowed(s),
    }
}

/// Last `max_len` bytes of a captured stream, ANSI-free.
///
/// Returns `"None"` for an empty stream so log lines stay readable.
pub fn tail_excerpt(bytes: &[u8], max_len: usize) -> String {
    let text = String::from_utf8_lossy(bytes);
    let text = strip_ansi(&text);
    if text.is_empty() {
        return "None".into();
    }

    let mut start = text.len().saturating_sub(max_len);
    while start < text.len() && !text.is_char_boundary(start) {
        start += 1;
    }
    text[start..].to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_os() {
        assert_eq!(to_os("hello"), OsString::from("hello"));
        assert_eq!(to_os(String::from("world")), OsString::from("world"));
    }

    #[test]
    fn test_to_cmd_vec() {
        let cmd = to_cmd_vec(["nix-shell", "-p"]);
        assert_eq!(cmd, vec![OsString::from("nix-shell"), OsString::from("-p")]);

        let owned = vec![OsString::from("xelatex")];
        let cmd = to_cmd_vec(owned.as_slice());
        assert_eq!(cmd, owned);
    }

    #[test]
    fn test_filter_args() {
        let args = [OsString::from("a"), OsString::from(""), OsString::from("b")];
        assert_eq!(filter_args(&args), vec![OsString::from("a"), OsString::from("b")]);
    }

    #[test]
    fn test_prepare_empty() {
        assert!(prepare(&[], &[]).is_err());
    }

    #[test]
    fn test_prepare_valid() {
        let cmd = to_cmd_vec(["echo"]);
        let (name, _) = prepare(&cmd, &[OsString::from("hi")]).unwrap();
        assert_eq!(name, "echo");
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_nonzero_status_is_not_error() {
        let output = exec!(["sh", "-c"]; "echo out; echo err >&2; exit 3").unwrap();
        assert_eq!(output.status.code(), Some(3));
        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "out");
        assert_eq!(String::from_utf8_lossy(&output.stderr).trim(), "err");
    }

    #[cfg(unix)]
    #[test]
    fn test_exec_owned_prefix_and_arg() {
        let cmd = vec![OsString::from("sh"), OsString::from("-c")];
        let script = OsString::from("printf %s \"$0\"");
        let output = exec!(cmd.as_slice(); script, "resume.tex").unwrap();
        assert_eq!(String::from_utf8_lossy(&output.stdout), "resume.tex");
    }

    #[test]
    fn test_exec_missing_binary() {
        let result = exec!(["definitely-not-a-real-binary-folio"];);
        assert!(result.is_err());
    }

    #[test]
    fn test_strip_ansi() {
        assert_eq!(strip_ansi("\x1b[31mRed\x1b[0m"), "Red");
        assert_eq!(strip_ansi("Plain text"), "Plain text");
    }

    #[test]
    fn test_tail_excerpt_empty() {
        assert_eq!(tail_excerpt(b"", 500), "None");
    }

    #[test]
    fn test_tail_excerpt_keeps_end() {
        let long = "x".repeat(600) + "END";
        let tail = tail_excerpt(long.as_bytes(), 500);
        assert_eq!(tail.len(), 500);
        assert!(tail.ends_with("END"));
    }

    #[test]
    fn test_tail_excerpt_char_boundary() {
        // "é" is 2 bytes; cutting at 3 bytes from the end would split one
        let tail = tail_excerpt("éé".as_bytes(), 3);
        assert_eq!(tail, "é");
    }
}
