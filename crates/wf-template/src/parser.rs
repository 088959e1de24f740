//! Turns lexer output into a `Vec<Node>` tree, and parses the small
//! expression grammar used inside `{{ }}` and `{% %}` tags.
//!
//! Expression grammar:
//!   pipeline   := comparison ('|' filter_call)*
//!   comparison := primary (cmpop primary)?
//!   filter_call:= ident (':' arg (',' arg)*)?
//!   arg        := literal | path
//!   primary    := path | literal
//!   path       := ident ('.' ident)*
//!   literal    := string | number | bool | nil
//!   cmpop      := '==' | '!=' | '>=' | '<=' | '>' | '<'

use serde_json::Value;

use crate::ast::{CmpOp, Expr, FilterCall, Node};
use crate::error::{parse_error, Result};
use crate::lexer::{lex, RawToken};

pub(crate) fn parse(source: &str) -> Result<Vec<Node>> {
    let tokens = lex(source)?;
    let mut cursor = Cursor {
        tokens: &tokens,
        pos: 0,
        source,
    };
    let nodes = cursor.parse_block(&[])?;
    if cursor.pos != cursor.tokens.len() {
        let offset = cursor.current_offset();
        let (line, column) = crate::error::line_col(source, offset);
        return Err(parse_error(line, column, "unexpected block terminator"));
    }
    Ok(nodes)
}

struct Cursor<'a> {
    tokens: &'a [RawToken],
    pos: usize,
    source: &'a str,
}

/// Tag keywords that close or continue a block; `parse_block` stops when it
/// sees one of `terminators` and leaves it unconsumed for the caller.
impl<'a> Cursor<'a> {
    fn current_offset(&self) -> usize {
        match self.tokens.get(self.pos) {
            Some(RawToken::Expr { offset, .. }) | Some(RawToken::Tag { offset, .. }) => *offset,
            _ => self.source.len(),
        }
    }

    fn parse_block(&mut self, terminators: &[&str]) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        while let Some(tok) = self.tokens.get(self.pos) {
            match tok {
                RawToken::Text { content } => {
                    nodes.push(Node::Text(content.clone()));
                    self.pos += 1;
                }
                RawToken::Expr { content, offset } => {
                    let expr = parse_expr(content, *offset, self.source)?;
                    nodes.push(Node::Expr(expr));
                    self.pos += 1;
                }
                RawToken::Tag { content, offset } => {
                    let keyword = content.split_whitespace().next().unwrap_or("");
                    if terminators.contains(&keyword) {
                        return Ok(nodes);
                    }
                    match keyword {
                        "if" => nodes.push(self.parse_if(content, *offset)?),
                        "for" => nodes.push(self.parse_for(content, *offset)?),
                        _ => {
                            let (line, column) = crate::error::line_col(self.source, *offset);
                            return Err(parse_error(line, column, format!("unknown tag '{keyword}'")));
                        }
                    }
                }
            }
        }
        if !terminators.is_empty() {
            let (line, column) = crate::error::line_col(self.source, self.source.len());
            return Err(parse_error(
                line,
                column,
                format!("unclosed block, expected one of {terminators:?}"),
            ));
        }
        Ok(nodes)
    }

    fn parse_if(&mut self, content: &str, offset: usize) -> Result<Node> {
        let cond_src = content.strip_prefix("if").unwrap_or(content).trim();
        let cond = parse_expr(cond_src, offset, self.source)?;
        self.pos += 1;

        let then_branch = self.parse_block(&["else", "endif"])?;

        let mut else_branch = Vec::new();
        if let Some(RawToken::Tag { content, .. }) = self.tokens.get(self.pos) {
            if content.split_whitespace().next() == Some("else") {
                self.pos += 1;
                else_branch = self.parse_block(&["endif"])?;
            }
        }

        match self.tokens.get(self.pos) {
            Some(RawToken::Tag { content, .. }) if content.split_whitespace().next() == Some("endif") => {
                self.pos += 1;
            }
            _ => {
                let (line, column) = crate::error::line_col(self.source, offset);
                return Err(parse_error(line, column, "missing 'endif' for 'if'"));
            }
        }

        Ok(Node::If {
            cond,
            then_branch,
            else_branch,
        })
    }

    fn parse_for(&mut self, content: &str, offset: usize) -> Result<Node> {
        let rest = content.strip_prefix("for").unwrap_or(content).trim();
        let (line, column) = crate::error::line_col(self.source, offset);
        let mut parts = rest.splitn(2, " in ");
        let var = parts
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| parse_error(line, column, "malformed 'for' tag, expected 'for x in list'"))?
            .to_string();
        let list_src = parts
            .next()
            .ok_or_else(|| parse_error(line, column, "malformed 'for' tag, expected 'for x in list'"))?;
        let list = parse_expr(list_src, offset, self.source)?;
        self.pos += 1;

        let body = self.parse_block(&["endfor"])?;

        match self.tokens.get(self.pos) {
            Some(RawToken::Tag { content, .. }) if content.split_whitespace().next() == Some("endfor") => {
                self.pos += 1;
            }
            _ => return Err(parse_error(line, column, "missing 'endfor' for 'for'")),
        }

        Ok(Node::For { var, list, body })
    }
}

fn parse_expr(content: &str, tag_offset: usize, source: &str) -> Result<Expr> {
    let toks = tokenize_expr(content, tag_offset, source)?;
    let mut p = ExprParser {
        toks: &toks,
        pos: 0,
        tag_offset,
        source,
    };
    let expr = p.pipeline()?;
    if p.pos != p.toks.len() {
        return Err(p.err("trailing tokens in expression"));
    }
    Ok(expr)
}

#[derive(Debug, Clone, PartialEq)]
enum ETok {
    Ident(String),
    Dot,
    Pipe,
    Colon,
    Comma,
    Op(CmpOp),
    Str(String),
    Num(f64),
    Bool(bool),
    Nil,
}

fn tokenize_expr(content: &str, tag_offset: usize, source: &str) -> Result<Vec<ETok>> {
    let mut out = Vec::new();
    let chars: Vec<char> = content.chars().collect();
    let mut i = 0;
    let err = |msg: &str| {
        let (line, column) = crate::error::line_col(source, tag_offset);
        parse_error(line, column, msg.to_string())
    };

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        match c {
            '.' => {
                out.push(ETok::Dot);
                i += 1;
            }
            '|' => {
                out.push(ETok::Pipe);
                i += 1;
            }
            ':' => {
                out.push(ETok::Colon);
                i += 1;
            }
            ',' => {
                out.push(ETok::Comma);
                i += 1;
            }
            '=' | '!' | '>' | '<' => {
                let two: String = chars[i..(i + 2).min(chars.len())].iter().collect();
                let op = match two.as_str() {
                    "==" => Some((CmpOp::Eq, 2)),
                    "!=" => Some((CmpOp::Ne, 2)),
                    ">=" => Some((CmpOp::Ge, 2)),
                    "<=" => Some((CmpOp::Le, 2)),
                    _ => None,
                };
                if let Some((op, len)) = op {
                    out.push(ETok::Op(op));
                    i += len;
                } else if c == '>' {
                    out.push(ETok::Op(CmpOp::Gt));
                    i += 1;
                } else if c == '<' {
                    out.push(ETok::Op(CmpOp::Lt));
                    i += 1;
                } else {
                    return Err(err(&format!("unexpected character '{c}'")));
                }
            }
            '\'' | '"' => {
                let quote = c;
                i += 1;
                let mut s = String::new();
                let mut closed = false;
                while i < chars.len() {
                    if chars[i] == quote {
                        closed = true;
                        i += 1;
                        break;
                    }
                    s.push(chars[i]);
                    i += 1;
                }
                if !closed {
                    return Err(err("unterminated string literal"));
                }
                out.push(ETok::Str(s));
            }
            _ if c.is_ascii_digit() || (c == '-' && chars.get(i + 1).is_some_and(|n| n.is_ascii_digit())) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let n: f64 = text.parse().map_err(|_| err(&format!("invalid number '{text}'")))?;
                out.push(ETok::Num(n));
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                out.push(match text.as_str() {
                    "true" => ETok::Bool(true),
                    "false" => ETok::Bool(false),
                    "nil" | "null" => ETok::Nil,
                    _ => ETok::Ident(text),
                });
            }
            _ => return Err(err(&format!("unexpected character '{c}'"))),
        }
    }
    Ok(out)
}

struct ExprParser<'a> {
    toks: &'a [ETok],
    pos: usize,
    tag_offset: usize,
    source: &'a str,
}

impl<'a> ExprParser<'a> {
    fn err(&self, msg: &str) -> wf_contracts::ExpressionError {
        let (line, column) = crate::error::line_col(self.source, self.tag_offset);
        parse_error(line, column, msg.to_string())
    }

    fn peek(&self) -> Option<&ETok> {
        self.toks.get(self.pos)
    }

    fn pipeline(&mut self) -> Result<Expr> {
        let base = self.comparison()?;
        let mut filters = Vec::new();
        while matches!(self.peek(), Some(ETok::Pipe)) {
            self.pos += 1;
            filters.push(self.filter_call()?);
        }
        if filters.is_empty() {
            Ok(base)
        } else {
            Ok(Expr::Pipeline {
                base: Box::new(base),
                filters,
            })
        }
    }

    fn comparison(&mut self) -> Result<Expr> {
        let left = self.primary()?;
        if let Some(ETok::Op(op)) = self.peek().cloned() {
            self.pos += 1;
            let right = self.primary()?;
            Ok(Expr::Compare {
                left: Box::new(left),
                op,
                right: Box::new(right),
            })
        } else {
            Ok(left)
        }
    }

    fn filter_call(&mut self) -> Result<FilterCall> {
        let name = match self.peek() {
            Some(ETok::Ident(s)) => s.clone(),
            _ => return Err(self.err("expected filter name")),
        };
        self.pos += 1;
        let mut args = Vec::new();
        if matches!(self.peek(), Some(ETok::Colon)) {
            self.pos += 1;
            args.push(self.primary()?);
            while matches!(self.peek(), Some(ETok::Comma)) {
                self.pos += 1;
                args.push(self.primary()?);
            }
        }
        Ok(FilterCall { name, args })
    }

    fn primary(&mut self) -> Result<Expr> {
        match self.peek().cloned() {
            Some(ETok::Str(s)) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::String(s)))
            }
            Some(ETok::Num(n)) => {
                self.pos += 1;
                Ok(Expr::Literal(
                    serde_json::Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null),
                ))
            }
            Some(ETok::Bool(b)) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Bool(b)))
            }
            Some(ETok::Nil) => {
                self.pos += 1;
                Ok(Expr::Literal(Value::Null))
            }
            Some(ETok::Ident(first)) => {
                self.pos += 1;
                let mut segments = vec![first];
                while matches!(self.peek(), Some(ETok::Dot)) {
                    self.pos += 1;
                    match self.peek().cloned() {
                        Some(ETok::Ident(seg)) => {
                            segments.push(seg);
                            self.pos += 1;
                        }
                        _ => return Err(self.err("expected identifier after '.'")),
                    }
                }
                Ok(Expr::Path(segments))
            }
            _ => Err(self.err("expected a value, path, or literal")),
        }
    }
}
