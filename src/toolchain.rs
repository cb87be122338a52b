//! External compiler toolchain
//!
//! The resolver only sees the two traits below. `CompilerToolchain`
//! implements them by running a gcc-compatible compiler:
//!
//! - `<cc> -xc++ -M -MG <flags> <hints> <file>` lists a file's headers as a
//!   make rule; `-MG` keeps missing headers in the list instead of failing.
//! - `<cc> -xc++ -E -v -` prints the built-in `#include <...>` search list.

use crate::config::ExtensionSet;
use crate::error::{ToolchainError, ToolchainResult};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::trace;

const SEARCH_LIST_START: &str = "#include <...> search starts here:";
const SEARCH_LIST_END: &str = "End of search list.";

/// Lists the headers a source file references
pub trait HeaderListProvider: Send + Sync {
    /// Headers referenced by `file`, filtered to accepted header extensions,
    /// excluding headers the toolchain already resolved to absolute paths.
    /// `hints` are `-I` flags for directories discovered so far.
    fn list_headers(&self, file: &Path, hints: &[String]) -> ToolchainResult<Vec<String>>;
}

/// Reports the toolchain's built-in header search directories
pub trait SystemSearchPathProvider {
    fn system_search_paths(&self) -> ToolchainResult<Vec<PathBuf>>;
}

/// gcc/clang driven through the command line
#[derive(Debug, Clone)]
pub struct CompilerToolchain {
    /// Compiler program
    cc: String,

    /// Extra flags placed before the search hints
    extra_flags: Vec<String>,

    /// Accepted header extensions
    header_exts: ExtensionSet,
}

impl CompilerToolchain {
    pub fn new(cc: impl Into<String>, extra_flags: Vec<String>, header_exts: ExtensionSet) -> Self {
        Self {
            cc: cc.into(),
            extra_flags,
            header_exts,
        }
    }

    pub fn program(&self) -> &str {
        &self.cc
    }

    fn dependency_command(&self, file: &Path, hints: &[String]) -> Command {
        let mut cmd = Command::new(&self.cc);
        cmd.args(["-xc++", "-M", "-MG"])
            .args(&self.extra_flags)
            .args(hints)
            .arg(file)
            .stdin(Stdio::null());
        cmd
    }
}

impl HeaderListProvider for CompilerToolchain {
    fn list_headers(&self, file: &Path, hints: &[String]) -> ToolchainResult<Vec<String>> {
        let output = self
            .dependency_command(file, hints)
            .output()
            .map_err(|e| ToolchainError::SpawnFailed {
                program: self.cc.clone(),
                reason: e.to_string(),
            })?;

        // With -MG a failing compile can still print a usable rule
        if output.stdout.is_empty() {
            return Err(ToolchainError::NoOutput {
                file: file.to_path_buf(),
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let headers = parse_dependency_rule(&stdout, &self.header_exts);
        trace!(file = %file.display(), headers = headers.len(), "Dependency rule parsed");
        Ok(headers)
    }
}

impl SystemSearchPathProvider for CompilerToolchain {
    fn system_search_paths(&self) -> ToolchainResult<Vec<PathBuf>> {
        let output = Command::new(&self.cc)
            .args(["-xc++", "-E", "-v", "-"])
            .stdin(Stdio::null())
            .output()
            .map_err(|e| ToolchainError::ProbeFailed {
                program: self.cc.clone(),
                reason: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(ToolchainError::ProbeFailed {
                program: self.cc.clone(),
                reason: output.status.to_string(),
            });
        }

        // The search list goes to stderr; read both streams like a terminal would
        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(parse_search_list(&combined))
    }
}

/// Parse a make rule (`main.o: main.c a.h \` + newline + ` b/c.h`) into the
/// header prerequisites, in order
///
/// The target and the first prerequisite's colon are dropped, line
/// continuations are joined, and only tokens with an accepted header
/// extension that are not absolute paths are kept.
pub fn parse_dependency_rule(rule: &str, header_exts: &ExtensionSet) -> Vec<String> {
    let joined = rule.replace("\\\r\n", " ").replace("\\\n", " ");
    let prerequisites = match joined.split_once(": ") {
        Some((_, rest)) => rest,
        None => joined.trim_start().split_once(char::is_whitespace).map_or("", |(_, rest)| rest),
    };

    prerequisites
        .split_whitespace()
        .filter(|token| header_exts.matches(token))
        .filter(|token| !Path::new(token).is_absolute())
        .map(str::to_string)
        .collect()
}

/// Extract the directories between the `#include <...>` marker and the end
/// of the search list, in the order printed
pub fn parse_search_list(verbose_output: &str) -> Vec<PathBuf> {
    verbose_output
        .lines()
        .map(str::trim)
        .skip_while(|line| !line.starts_with(SEARCH_LIST_START))
        .skip(1)
        .take_while(|line| !line.starts_with(SEARCH_LIST_END))
        .filter(|line| !line.is_empty())
        // Darwin marks framework directories with a suffix
        .map(|line| line.trim_end_matches(" (framework directory)"))
        .map(PathBuf::from)
        .collect()
}

/// Check whether a header is already resolved without our help: absolute,
/// or present under one of the toolchain's built-in directories
pub fn is_known_location(header: &str, system_dirs: &[PathBuf]) -> bool {
    let path = Path::new(header);
    path.is_absolute() || system_dirs.iter().any(|dir| dir.join(path).is_file())
}
