use thiserror::Error;

use crate::token::Token;

/// Errors from every stage of the pipeline. Each variant carries the source
/// position it was raised at so the driver can render an excerpt.
#[derive(Debug, Error, PartialEq, Clone)]
pub enum Error {
    #[error("[line {line}:{col}] scan error: {msg}")]
    ScanError { line: usize, col: usize, msg: String },

    #[error("[line {line}:{col}] parse error: {msg}")]
    ParseError { line: usize, col: usize, msg: String },

    #[error("[line {line}:{col}] resolution error: {msg}")]
    ResolutionError { line: usize, col: usize, msg: String },

    #[error("[line {line}:{col}] runtime error: {msg}")]
    RuntimeError { line: usize, col: usize, msg: String },
}

impl Error {
    pub fn scan(line: usize, col: usize, msg: impl Into<String>) -> Self {
        Error::ScanError {
            line,
            col,
            msg: msg.into(),
        }
    }

    pub fn parse(token: &Token, msg: impl Into<String>) -> Self {
        Error::ParseError {
            line: token.line,
            col: token.col,
            msg: msg.into(),
        }
    }

    pub fn resolution(token: &Token, msg: impl Into<String>) -> Self {
        Error::ResolutionError {
            line: token.line,
            col: token.col,
            msg: msg.into(),
        }
    }

    pub fn runtime(token: &Token, msg: impl Into<String>) -> Self {
        Error::RuntimeError {
            line: token.line,
            col: token.col,
            msg: msg.into(),
        }
    }

    pub fn line(&self) -> usize {
        match self {
            Error::ScanError { line, .. }
            | Error::ParseError { line, .. }
            | Error::ResolutionError { line, .. }
            | Error::RuntimeError { line, .. } => *line,
        }
    }

    pub fn col(&self) -> usize {
        match self {
            Error::ScanError { col, .. }
            | Error::ParseError { col, .. }
            | Error::ResolutionError { col, .. }
            | Error::RuntimeError { col, .. } => *col,
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Error::ScanError { msg, .. }
            | Error::ParseError { msg, .. }
            | Error::ResolutionError { msg, .. }
            | Error::RuntimeError { msg, .. } => msg,
        }
    }

    pub fn is_runtime(&self) -> bool {
        matches!(self, Error::RuntimeError { .. })
    }

    /// Render the error with the offending source line and a caret under the
    /// column it points at.
    pub fn render(&self, source: &str) -> String {
        let mut out = format!("{}\n", self);
        if let Some(excerpt) = source.lines().nth(self.line().saturating_sub(1)) {
            out.push_str(excerpt);
            out.push('\n');
            for ch in excerpt.chars().take(self.col().saturating_sub(1)) {
                out.push(if ch == '\t' { '\t' } else { ' ' });
            }
            out.push('^');
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;

    #[test]
    fn test_render_points_at_column() {
        let source = "var x = 1;\nprint y;\n";
        let err = Error::RuntimeError {
            line: 2,
            col: 7,
            msg: String::from("Undefined variable 'y'."),
        };

        assert_eq!(
            err.render(source),
            "[line 2:7] runtime error: Undefined variable 'y'.\nprint y;\n      ^\n"
        );
    }

    #[test]
    fn test_render_without_matching_line() {
        let err = Error::scan(9, 1, "Unterminated string.");
        assert_eq!(err.render(""), "[line 9:1] scan error: Unterminated string.\n");
    }
}
