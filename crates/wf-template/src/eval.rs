//! Walks a parsed `Node` tree against a `Context`, producing rendered text
//! or (for `evaluate_deep`) typed JSON values.

use serde_json::Value;

use crate::ast::{CmpOp, Expr, FilterCall, Node};
use crate::context::Context;
use crate::error::Result;
use crate::filters;

pub(crate) fn render_nodes(nodes: &[Node], ctx: &Context) -> Result<String> {
    let mut out = String::new();
    for node in nodes {
        render_node(node, ctx, &mut out)?;
    }
    Ok(out)
}

fn render_node(node: &Node, ctx: &Context, out: &mut String) -> Result<()> {
    match node {
        Node::Text(text) => {
            out.push_str(text);
            Ok(())
        }
        Node::Expr(expr) => {
            let value = eval_expr(expr, ctx)?;
            out.push_str(&value_to_text(&value));
            Ok(())
        }
        Node::If {
            cond,
            then_branch,
            else_branch,
        } => {
            let branch = if is_truthy(&eval_expr(cond, ctx)?) {
                then_branch
            } else {
                else_branch
            };
            out.push_str(&render_nodes(branch, ctx)?);
            Ok(())
        }
        Node::For { var, list, body } => {
            let items = match eval_expr(list, ctx)? {
                Value::Array(items) => items,
                Value::Null => Vec::new(),
                other => vec![other],
            };
            for item in items {
                let scoped = ctx.with_var(var, item);
                out.push_str(&render_nodes(body, &scoped)?);
            }
            Ok(())
        }
    }
}

/// Renders a `{{ }}`-only string as its typed value rather than text, so a
/// config field like `"{{ json.price }}"` resolves to a number, not a string.
pub(crate) fn eval_string_leaf(nodes: &[Node], ctx: &Context) -> Result<Value> {
    if let [Node::Expr(expr)] = nodes {
        eval_expr(expr, ctx)
    } else {
        Ok(Value::String(render_nodes(nodes, ctx)?))
    }
}

pub(crate) fn eval_expr(expr: &Expr, ctx: &Context) -> Result<Value> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Path(segments) => Ok(ctx.resolve(segments)),
        Expr::Compare { left, op, right } => {
            let l = eval_expr(left, ctx)?;
            let r = eval_expr(right, ctx)?;
            Ok(Value::Bool(compare(&l, op, &r)))
        }
        Expr::Pipeline { base, filters: calls } => {
            let mut value = eval_expr(base, ctx)?;
            for call in calls {
                value = apply_filter(call, value, ctx)?;
            }
            Ok(value)
        }
    }
}

fn apply_filter(call: &FilterCall, input: Value, ctx: &Context) -> Result<Value> {
    let mut args = Vec::with_capacity(call.args.len());
    for arg in &call.args {
        args.push(eval_expr(arg, ctx)?);
    }
    filters::apply(&call.name, input, &args, 1, 1)
}

fn compare(l: &Value, op: &CmpOp, r: &Value) -> bool {
    match op {
        CmpOp::Eq => l == r,
        CmpOp::Ne => l != r,
        _ => {
            let (lf, rf) = match (l.as_f64(), r.as_f64()) {
                (Some(a), Some(b)) => (a, b),
                _ => {
                    let ls = value_to_text(l);
                    let rs = value_to_text(r);
                    return match op {
                        CmpOp::Ge => ls >= rs,
                        CmpOp::Le => ls <= rs,
                        CmpOp::Gt => ls > rs,
                        CmpOp::Lt => ls < rs,
                        CmpOp::Eq | CmpOp::Ne => unreachable!(),
                    };
                }
            };
            match op {
                CmpOp::Ge => lf >= rf,
                CmpOp::Le => lf <= rf,
                CmpOp::Gt => lf > rf,
                CmpOp::Lt => lf < rf,
                CmpOp::Eq | CmpOp::Ne => unreachable!(),
            }
        }
    }
}

/// Falsy: `null`, `false`, `0`, `""`, empty array, empty object. Everything
/// else is truthy.
pub(crate) fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn value_to_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use serde_json::json;

    #[test]
    fn renders_plain_text_and_expr() {
        let ctx = Context::new(json!({ "json": { "name": "Ada" } }));
        let nodes = parse("hi {{ json.name }}!").unwrap();
        assert_eq!(render_nodes(&nodes, &ctx).unwrap(), "hi Ada!");
    }

    #[test]
    fn if_else_picks_branch_by_truthiness() {
        let ctx = Context::new(json!({ "json": { "status": 404 } }));
        let nodes = parse("{% if json.status >= 400 %}bad{% else %}ok{% endif %}").unwrap();
        assert_eq!(render_nodes(&nodes, &ctx).unwrap(), "bad");
    }

    #[test]
    fn for_loop_binds_each_item() {
        let ctx = Context::new(json!({ "json": { "users": [{ "name": "A" }, { "name": "B" }] } }));
        let nodes = parse("{% for u in json.users %}{{ u.name }},{% endfor %}").unwrap();
        assert_eq!(render_nodes(&nodes, &ctx).unwrap(), "A,B,");
    }

    #[test]
    fn pipeline_applies_filters_left_to_right() {
        let ctx = Context::new(json!({ "json": { "name": "ada" } }));
        let nodes = parse("{{ json.name | upcase }}").unwrap();
        assert_eq!(render_nodes(&nodes, &ctx).unwrap(), "ADA");
    }

    #[test]
    fn eval_string_leaf_preserves_numeric_type() {
        let ctx = Context::new(json!({ "json": { "price": 12.5 } }));
        let nodes = parse("{{ json.price }}").unwrap();
        assert_eq!(eval_string_leaf(&nodes, &ctx).unwrap(), json!(12.5));
    }

    #[test]
    fn eval_string_leaf_with_surrounding_text_is_a_string() {
        let ctx = Context::new(json!({ "json": { "price": 12.5 } }));
        let nodes = parse("total: {{ json.price }}").unwrap();
        assert_eq!(eval_string_leaf(&nodes, &ctx).unwrap(), json!("total: 12.5"));
    }

    #[test]
    fn empty_array_and_object_are_falsy() {
        assert!(!is_truthy(&json!([])));
        assert!(!is_truthy(&json!({})));
        assert!(is_truthy(&json!([1])));
    }
}
