//! Error types for configuration loading, decoding and persistence.

use std::{
    cmp::{max, min},
    fmt::Write as _,
    path::{Path, PathBuf},
};

use thiserror::Error;

#[derive(Debug, Error, Clone)]
/// Errors produced while loading, decoding, writing or watching a configuration.
pub enum Error {
    #[error("{message}")]
    /// I/O or filesystem read error.
    Read {
        /// Optional path associated with the read error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// Malformed or incomplete JSON document.
    Decode {
        /// Optional path associated with the decode error.
        path: Option<PathBuf>,
        /// 1-based line number.
        line: usize,
        /// 1-based column number.
        col: usize,
        /// Human-readable error message.
        message: String,
        /// Rendered excerpt including a caret at the error location.
        excerpt: String,
    },
    #[error("{message}")]
    /// Failure writing a document back to disk.
    Write {
        /// Optional path associated with the write error.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
    #[error("{message}")]
    /// The file watcher could not be started.
    Watch {
        /// Optional path being watched.
        path: Option<PathBuf>,
        /// Human-readable error message.
        message: String,
    },
}

impl Error {
    /// Build a decode error from a `serde_json` failure against `source`.
    pub(crate) fn decode(err: &serde_json::Error, source: &str) -> Self {
        let (line, col) = (err.line().max(1), err.column().max(1));
        Self::Decode {
            path: None,
            line,
            col,
            message: err.to_string(),
            excerpt: excerpt_at(source, line, col),
        }
    }

    /// Attach a path to this error, replacing any existing one.
    pub fn with_path(mut self, p: &Path) -> Self {
        match &mut self {
            Self::Read { path, .. }
            | Self::Decode { path, .. }
            | Self::Write { path, .. }
            | Self::Watch { path, .. } => *path = Some(p.to_path_buf()),
        }
        self
    }

    /// True for malformed-document errors (as opposed to I/O failures).
    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode { .. })
    }

    /// Render a human-friendly error message including location and an excerpt when available.
    pub fn pretty(&self) -> String {
        match self {
            Self::Read { path, message } => match path {
                Some(p) => format!("Read error at {}: {}", p.display(), message),
                None => format!("Read error: {}", message),
            },
            Self::Write { path, message } => match path {
                Some(p) => format!("Write error at {}: {}", p.display(), message),
                None => format!("Write error: {}", message),
            },
            Self::Watch { path, message } => match path {
                Some(p) => format!("Cannot watch {}: {}", p.display(), message),
                None => format!("Watch error: {}", message),
            },
            Self::Decode {
                path,
                line,
                col,
                message,
                excerpt,
            } => match path {
                Some(p) => format!(
                    "Config decode error at {}:{}:{}\n{}\n{}",
                    p.display(),
                    line,
                    col,
                    message,
                    excerpt
                ),
                None => format!(
                    "Config decode error at line {}, column {}\n{}\n{}",
                    line, col, message, excerpt
                ),
            },
        }
    }

    /// Access the optional path attached to this error.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::Read { path, .. }
            | Self::Decode { path, .. }
            | Self::Write { path, .. }
            | Self::Watch { path, .. } => path.as_deref(),
        }
    }
}

/// Build a small 2-3 line excerpt with a caret at `(line_no, col_no)`.
pub fn excerpt_at(source: &str, line_no: usize, col_no: usize) -> String {
    let lines: Vec<&str> = source.lines().collect();
    let total = lines.len();
    let start = max(1usize, line_no.saturating_sub(2));
    let end = min(total, line_no + 1);

    let mut out = String::new();
    for n in start..=end {
        let text = lines.get(n - 1).copied().unwrap_or("");
        let _ignored = writeln!(out, " {:>4} | {}", n, text);
        if n == line_no {
            let prefix = format!(" {:>4} | ", n);
            let _ignored = writeln!(
                out,
                "{}{}^",
                " ".repeat(prefix.len()),
                " ".repeat(col_no.saturating_sub(1))
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excerpt_marks_column() {
        let src = "{\n  \"actions\": [\n    oops\n  ]\n}";
        let ex = excerpt_at(src, 3, 5);
        assert!(ex.contains("   3 |     oops"));
        let caret = ex.lines().find(|l| l.trim_end().ends_with('^')).unwrap();
        // gutter is 8 wide, then col - 1 spaces
        assert_eq!(caret.find('^'), Some(12));
    }

    #[test]
    fn pretty_includes_path() {
        let err = Error::Read {
            path: None,
            message: "denied".into(),
        }
        .with_path(Path::new("/tmp/config.json"));
        assert_eq!(err.pretty(), "Read error at /tmp/config.json: denied");
        assert_eq!(err.path(), Some(Path::new("/tmp/config.json")));
        assert!(!err.is_decode());
    }
}
