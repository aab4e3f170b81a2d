//! I/O boundary traits for testability
//!
//! These traits abstract external I/O operations, allowing services
//! to be tested with mock implementations. The terminal front-end of the
//! tree builder lives here as well.

use std::io::{self, BufRead, Write};
use std::path::Path;

use colored::Colorize;
use tracing::trace;

use crate::domain::{BuildCollaborator, BuildObserver, Condition, DomainError};

/// Filesystem abstraction for testability.
pub trait FileSystem: Send + Sync {
    /// Read file contents to string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write string content to file.
    fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Create directory and all parent directories.
    fn create_dir_all(&self, path: &Path) -> io::Result<()>;

    /// Create parent directories if needed.
    fn ensure_parent(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                self.create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

// ============================================================
// REAL IMPLEMENTATIONS
// ============================================================

/// Real filesystem implementation.
#[derive(Debug, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        std::fs::write(path, content)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        std::fs::create_dir_all(path)
    }
}

/// Answers typed at the terminal that cancel the build.
pub const CANCEL_WORDS: [&str; 2] = [":q", ":cancel"];

/// Line-oriented prompter over any reader/writer pair.
///
/// End of input or a cancel word aborts the build. Unknown condition
/// tokens are asked again.
pub struct ConsolePrompter<R, W> {
    input: R,
    output: W,
    leaf_sentinel: String,
}

impl ConsolePrompter<io::StdinLock<'static>, io::Stdout> {
    /// Prompter on the process terminal.
    pub fn stdio(leaf_sentinel: impl Into<String>) -> Self {
        Self::new(io::stdin().lock(), io::stdout(), leaf_sentinel)
    }
}

impl<R: BufRead, W: Write> ConsolePrompter<R, W> {
    pub fn new(input: R, output: W, leaf_sentinel: impl Into<String>) -> Self {
        Self {
            input,
            output,
            leaf_sentinel: leaf_sentinel.into(),
        }
    }

    /// Release the writer, e.g. to inspect a transcript.
    pub fn into_output(self) -> W {
        self.output
    }

    /// Print `question`, read one line. None on EOF or cancel word.
    fn ask(&mut self, question: &str) -> Result<Option<String>, String> {
        write!(self.output, "{} ", question.cyan()).map_err(|e| e.to_string())?;
        self.output.flush().map_err(|e| e.to_string())?;

        let mut line = String::new();
        let read = self.input.read_line(&mut line).map_err(|e| e.to_string())?;
        if read == 0 {
            return Ok(None);
        }
        let answer = line.trim().to_string();
        if CANCEL_WORDS.contains(&answer.as_str()) {
            return Ok(None);
        }
        Ok(Some(answer))
    }
}

fn at(path: &str) -> String {
    if path.is_empty() {
        "[root]".to_string()
    } else {
        format!("[{}]", path)
    }
}

impl<R: BufRead, W: Write> BuildCollaborator for ConsolePrompter<R, W> {
    fn ask_attribute_or_leaf(&mut self, path: &str) -> Result<Option<String>, String> {
        let question = format!(
            "{} Attribute to split on (or '{}' to mark as leaf):",
            at(path),
            self.leaf_sentinel
        );
        self.ask(&question)
    }

    fn ask_leaf_label(&mut self, path: &str) -> Result<Option<String>, String> {
        self.ask(&format!("{} Result (Fraud/Not Fraud):", at(path)))
    }

    fn ask_split(&mut self, attribute: &str, path: &str) -> Result<Option<(String, Condition)>, String> {
        let Some(value) = self.ask(&format!("{} Value to compare for {}:", at(path), attribute))? else {
            return Ok(None);
        };
        loop {
            let Some(token) = self.ask(&format!(
                "{} Condition for {} (choose from >=, <=, ==):",
                at(path),
                attribute
            ))?
            else {
                return Ok(None);
            };
            match token.parse::<Condition>() {
                Ok(condition) => return Ok(Some((value, condition))),
                Err(e) => {
                    writeln!(self.output, "{}: {}", "Warning".yellow(), e).map_err(|e| e.to_string())?;
                }
            }
        }
    }
}

/// Prints build progress: the current path and the tree after every added node.
pub struct ConsoleObserver<W> {
    output: W,
}

impl ConsoleObserver<io::Stderr> {
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write> ConsoleObserver<W> {
    pub fn new(output: W) -> Self {
        Self { output }
    }

    pub fn into_inner(self) -> W {
        self.output
    }
}

/// Progress output is best effort, a closed terminal must not end the build.
fn best_effort(written: io::Result<()>) {
    if let Err(e) = written {
        trace!("observer write failed: {}", e);
    }
}

impl<W: Write> BuildObserver for ConsoleObserver<W> {
    fn on_path(&mut self, path: &str) {
        let shown = if path.is_empty() { "(root)" } else { path };
        best_effort(writeln!(self.output, "{} {}", "Current Path:".green(), shown));
    }

    fn on_tree(&mut self, rendered: &str) {
        best_effort(writeln!(self.output, "{}", rendered.trim_end()));
    }

    fn on_rejected(&mut self, error: &DomainError) {
        best_effort(writeln!(self.output, "{}: {}", "Warning".yellow(), error));
    }
}
