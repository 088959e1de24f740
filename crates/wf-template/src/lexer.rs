//! Splits raw template source into text / `{{ expr }}` / `{% tag %}` spans.

use crate::error::{parse_error, Result};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RawToken {
    Text { content: String },
    Expr { content: String, offset: usize },
    Tag { content: String, offset: usize },
}

pub(crate) fn lex(source: &str) -> Result<Vec<RawToken>> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut consumed = 0usize;

    loop {
        let next_expr = rest.find("{{");
        let next_tag = rest.find("{%");

        let next = match (next_expr, next_tag) {
            (None, None) => None,
            (Some(a), None) => Some((a, true)),
            (None, Some(b)) => Some((b, false)),
            (Some(a), Some(b)) => Some(if a <= b { (a, true) } else { (b, false) }),
        };

        let Some((rel_start, is_expr)) = next else {
            if !rest.is_empty() {
                tokens.push(RawToken::Text { content: rest.to_string() });
            }
            break;
        };

        if rel_start > 0 {
            tokens.push(RawToken::Text {
                content: rest[..rel_start].to_string(),
            });
        }

        let tag_start_abs = consumed + rel_start;
        let (open, close) = if is_expr { ("{{", "}}") } else { ("{%", "%}") };
        let after_open = &rest[rel_start + open.len()..];
        let Some(close_rel) = after_open.find(close) else {
            let (line, column) = crate::error::line_col(source, tag_start_abs);
            return Err(parse_error(line, column, format!("unterminated '{open}' tag")));
        };

        let content = after_open[..close_rel].trim().to_string();
        tokens.push(if is_expr {
            RawToken::Expr {
                content,
                offset: tag_start_abs,
            }
        } else {
            RawToken::Tag {
                content,
                offset: tag_start_abs,
            }
        });

        let advance = rel_start + open.len() + close_rel + close.len();
        consumed += advance;
        rest = &rest[advance..];
    }

    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_text_and_expr() {
        let tokens = lex("hello {{ name }}!").unwrap();
        assert_eq!(
            tokens,
            vec![
                RawToken::Text { content: "hello ".into() },
                RawToken::Expr { content: "name".into(), offset: 6 },
                RawToken::Text { content: "!".into() },
            ]
        );
    }

    #[test]
    fn unterminated_tag_is_a_parse_error() {
        let err = lex("{{ name").unwrap_err();
        match err {
            wf_contracts::ExpressionError::ParseError { .. } => {}
            _ => panic!("expected parse error"),
        }
    }
}
