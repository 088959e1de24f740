//! The closed filter library. Every name here is the complete set a template
//! may call — there is no escape hatch to arbitrary code.

use base64::Engine;
use hmac::{Hmac, Mac};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{render_error, Result};

pub(crate) fn apply(name: &str, input: Value, args: &[Value], line: usize, column: usize) -> Result<Value> {
    let err = |msg: String| render_error(line, column, msg);
    match name {
        "json" => Ok(Value::String(serde_json::to_string(&input).unwrap_or_default())),
        "dig" => {
            let mut cur = input;
            for a in args {
                let seg = as_str(a);
                cur = match &cur {
                    Value::Object(m) => m.get(&seg).cloned().unwrap_or(Value::Null),
                    Value::Array(items) => seg.parse::<usize>().ok().and_then(|i| items.get(i)).cloned().unwrap_or(Value::Null),
                    _ => Value::Null,
                };
            }
            Ok(cur)
        }
        "pluck" => {
            let field = args.first().map(as_str).unwrap_or_default();
            let items = as_array(&input);
            Ok(Value::Array(
                items
                    .iter()
                    .map(|it| it.get(&field).cloned().unwrap_or(Value::Null))
                    .collect(),
            ))
        }
        "where_eq" => {
            let field = args.first().map(as_str).unwrap_or_default();
            let expected = args.get(1).cloned().unwrap_or(Value::Null);
            let items = as_array(&input);
            Ok(Value::Array(
                items
                    .into_iter()
                    .filter(|it| it.get(&field).cloned().unwrap_or(Value::Null) == expected)
                    .collect(),
            ))
        }
        "sort_by" => {
            let field = args.first().map(as_str).unwrap_or_default();
            let mut items = as_array(&input);
            items.sort_by(|a, b| compare_values(a.get(&field), b.get(&field)));
            Ok(Value::Array(items))
        }
        "group_by" => {
            let field = args.first().map(as_str).unwrap_or_default();
            let items = as_array(&input);
            let mut groups: Map<String, Value> = Map::new();
            for item in items {
                let key = item.get(&field).map(value_as_key).unwrap_or_default();
                match groups.entry(key).or_insert_with(|| Value::Array(Vec::new())) {
                    Value::Array(arr) => arr.push(item),
                    _ => unreachable!(),
                }
            }
            Ok(Value::Object(groups))
        }
        "index_by" => {
            let field = args.first().map(as_str).unwrap_or_default();
            let items = as_array(&input);
            let mut map = Map::new();
            for item in items {
                let key = item.get(&field).map(value_as_key).unwrap_or_default();
                map.insert(key, item);
            }
            Ok(Value::Object(map))
        }
        "sha256" => {
            let mut hasher = Sha256::new();
            hasher.update(as_str(&input).as_bytes());
            Ok(Value::String(hex::encode(hasher.finalize())))
        }
        "hmac_sha256" => {
            let key = args.first().map(as_str).unwrap_or_default();
            let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
                .map_err(|e| err(format!("invalid hmac key: {e}")))?;
            mac.update(as_str(&input).as_bytes());
            Ok(Value::String(hex::encode(mac.finalize().into_bytes())))
        }
        "base64_encode" => Ok(Value::String(
            base64::engine::general_purpose::STANDARD.encode(as_str(&input).as_bytes()),
        )),
        "base64_decode" => {
            let bytes = base64::engine::general_purpose::STANDARD
                .decode(as_str(&input).as_bytes())
                .map_err(|e| err(format!("invalid base64: {e}")))?;
            String::from_utf8(bytes)
                .map(Value::String)
                .map_err(|e| err(format!("decoded bytes are not utf-8: {e}")))
        }
        "default" => {
            if input.is_null() {
                Ok(args.first().cloned().unwrap_or(Value::Null))
            } else {
                Ok(input)
            }
        }
        "to_int" => {
            let n = match &input {
                Value::Number(n) => n.as_f64().unwrap_or(0.0),
                Value::String(s) => s.trim().parse::<f64>().map_err(|e| err(format!("not a number: {e}")))?,
                Value::Bool(b) => if *b { 1.0 } else { 0.0 },
                _ => return Err(err("cannot convert to int".into())),
            };
            Ok(Value::from(n.trunc() as i64))
        }
        "slugify" => Ok(Value::String(slugify(&as_str(&input)))),
        "format_date" => {
            let fmt = args.first().map(as_str).unwrap_or_else(|| "%Y-%m-%d".into());
            let dt = parse_datetime(&as_str(&input)).map_err(|e| err(e))?;
            Ok(Value::String(dt.format(&fmt).to_string()))
        }
        "add_days" => {
            let n = args.first().map(as_f64).unwrap_or(0.0) as i64;
            let dt = parse_datetime(&as_str(&input)).map_err(|e| err(e))?;
            let shifted = dt + chrono::Duration::days(n);
            Ok(Value::String(shifted.to_rfc3339()))
        }
        "abs" => Ok(Value::from(as_f64(&input).abs())),
        "ceil" => Ok(Value::from(as_f64(&input).ceil() as i64)),
        "floor" => Ok(Value::from(as_f64(&input).floor() as i64)),
        "clamp" => {
            let lo = args.first().map(as_f64).unwrap_or(f64::MIN);
            let hi = args.get(1).map(as_f64).unwrap_or(f64::MAX);
            Ok(Value::from(as_f64(&input).clamp(lo, hi)))
        }
        "match" => {
            let pattern = args.first().map(as_str).unwrap_or_default();
            let re = regex::Regex::new(&pattern).map_err(|e| err(format!("invalid regex: {e}")))?;
            Ok(Value::Bool(re.is_match(&as_str(&input))))
        }
        "extract" => {
            let pattern = args.first().map(as_str).unwrap_or_default();
            let re = regex::Regex::new(&pattern).map_err(|e| err(format!("invalid regex: {e}")))?;
            let text = as_str(&input);
            Ok(re
                .captures(&text)
                .and_then(|c| c.get(1).or_else(|| c.get(0)))
                .map(|m| Value::String(m.as_str().to_string()))
                .unwrap_or(Value::Null))
        }
        "first" => Ok(as_array(&input).into_iter().next().unwrap_or(Value::Null)),
        "last" => Ok(as_array(&input).into_iter().last().unwrap_or(Value::Null)),
        "downcase" => Ok(Value::String(as_str(&input).to_lowercase())),
        "upcase" => Ok(Value::String(as_str(&input).to_uppercase())),
        other => Err(err(format!("unknown filter '{other}'"))),
    }
}

fn as_str(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn as_f64(v: &Value) -> f64 {
    match v {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => s.trim().parse().unwrap_or(0.0),
        Value::Bool(b) => if *b { 1.0 } else { 0.0 },
        _ => 0.0,
    }
}

fn as_array(v: &Value) -> Vec<Value> {
    match v {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        other => vec![other.clone()],
    }
}

fn value_as_key(v: &Value) -> String {
    as_str(v)
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> std::cmp::Ordering {
    let a = a.cloned().unwrap_or(Value::Null);
    let b = b.cloned().unwrap_or(Value::Null);
    match (&a, &b) {
        (Value::Number(_), Value::Number(_)) => as_f64(&a).partial_cmp(&as_f64(&b)).unwrap_or(std::cmp::Ordering::Equal),
        _ => as_str(&a).cmp(&as_str(&b)),
    }
}

fn slugify(input: &str) -> String {
    let mut out = String::new();
    let mut last_was_hyphen = true;
    for ch in input.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            out.push(ch);
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            out.push('-');
            last_was_hyphen = true;
        }
    }
    out.trim_end_matches('-').to_string()
}

fn parse_datetime(s: &str) -> std::result::Result<chrono::DateTime<chrono::Utc>, String> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&chrono::Utc))
        .map_err(|e| format!("invalid date '{s}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upcase_and_downcase() {
        assert_eq!(apply("upcase", json!("abc"), &[], 1, 1).unwrap(), json!("ABC"));
        assert_eq!(apply("downcase", json!("ABC"), &[], 1, 1).unwrap(), json!("abc"));
    }

    #[test]
    fn default_only_applies_to_null() {
        assert_eq!(apply("default", Value::Null, &[json!("fallback")], 1, 1).unwrap(), json!("fallback"));
        assert_eq!(apply("default", json!("x"), &[json!("fallback")], 1, 1).unwrap(), json!("x"));
    }

    #[test]
    fn slugify_collapses_separators() {
        assert_eq!(slugify("Hello, World!!  Foo"), "hello-world-foo");
    }

    #[test]
    fn sha256_is_deterministic() {
        let a = apply("sha256", json!("hello"), &[], 1, 1).unwrap();
        let b = apply("sha256", json!("hello"), &[], 1, 1).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, json!("hello"));
    }

    #[test]
    fn where_eq_filters_array_of_objects() {
        let input = json!([{ "status": 200 }, { "status": 404 }]);
        let out = apply("where_eq", input, &[json!("status"), json!(404)], 1, 1).unwrap();
        assert_eq!(out, json!([{ "status": 404 }]));
    }

    #[test]
    fn group_by_buckets_items() {
        let input = json!([{ "kind": "a", "v": 1 }, { "kind": "b", "v": 2 }, { "kind": "a", "v": 3 }]);
        let out = apply("group_by", input, &[json!("kind")], 1, 1).unwrap();
        assert_eq!(out["a"], json!([{ "kind": "a", "v": 1 }, { "kind": "a", "v": 3 }]));
    }

    #[test]
    fn base64_round_trips() {
        let encoded = apply("base64_encode", json!("hello"), &[], 1, 1).unwrap();
        let decoded = apply("base64_decode", encoded, &[], 1, 1).unwrap();
        assert_eq!(decoded, json!("hello"));
    }

    #[test]
    fn unknown_filter_is_a_render_error() {
        let err = apply("not_a_real_filter", json!("x"), &[], 1, 1).unwrap_err();
        assert!(matches!(err, wf_contracts::ExpressionError::RenderError { .. }));
    }
}
