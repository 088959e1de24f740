//! Template errors carry line/column so an editor can point at the failure.

pub use wf_contracts::ExpressionError as TemplateError;

pub type Result<T> = std::result::Result<T, TemplateError>;

pub(crate) fn parse_error(line: usize, column: usize, message: impl Into<String>) -> TemplateError {
    TemplateError::ParseError {
        line,
        column,
        message: message.into(),
    }
}

pub(crate) fn render_error(line: usize, column: usize, message: impl Into<String>) -> TemplateError {
    TemplateError::RenderError {
        line,
        column,
        message: message.into(),
    }
}

/// 1-indexed (line, column) for a byte offset into `source`.
pub(crate) fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1usize;
    let mut col = 1usize;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            col = 1;
        } else {
            col += 1;
        }
    }
    (line, col)
}
