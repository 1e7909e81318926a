//! Conversion between JSON on the command line and MessagePack values

use std::io::Read;

use anyhow::{Context, Result};
use rmpv::Value;
use serde_json::{Map, Number, Value as Json};

/// Parse a JSON argument; `-` reads it from stdin
pub fn parse_json_arg(arg: &str) -> Result<Value> {
    let text = if arg == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read JSON from stdin")?;
        buf
    } else {
        arg.to_string()
    };
    let json: Json = serde_json::from_str(&text).context("Invalid JSON")?;
    json_to_value(&json)
}

pub fn json_to_value(json: &Json) -> Result<Value> {
    rmpv::ext::to_value(json).context("JSON not representable as MessagePack")
}

/// Render a MessagePack value as JSON
///
/// Non-string map keys are stringified and blobs become arrays of bytes.
pub fn value_to_json(value: &Value) -> Json {
    match value {
        Value::Nil => Json::Null,
        Value::Boolean(b) => Json::Bool(*b),
        Value::Integer(i) => i
            .as_i64()
            .map(Number::from)
            .or_else(|| i.as_u64().map(Number::from))
            .map_or(Json::Null, Json::Number),
        Value::F32(f) => Number::from_f64(f64::from(*f)).map_or(Json::Null, Json::Number),
        Value::F64(f) => Number::from_f64(*f).map_or(Json::Null, Json::Number),
        Value::String(s) => Json::String(s.as_str().map_or_else(
            || String::from_utf8_lossy(s.as_bytes()).into_owned(),
            str::to_string,
        )),
        Value::Binary(bytes) => Json::Array(bytes.iter().map(|b| Json::from(*b)).collect()),
        Value::Array(items) => Json::Array(items.iter().map(value_to_json).collect()),
        Value::Map(entries) => {
            let mut map = Map::with_capacity(entries.len());
            for (key, value) in entries {
                let key = match key.as_str() {
                    Some(s) => s.to_string(),
                    None => key.to_string(),
                };
                map.insert(key, value_to_json(value));
            }
            Json::Object(map)
        }
        Value::Ext(tag, data) => serde_json::json!({ "ext": tag, "data": data }),
    }
}

pub fn print_value(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&value_to_json(value))?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_to_value() {
        let value = json_to_value(&json!({"value": [1, -2, 2.5, "x", null, true]})).unwrap();
        let Value::Map(entries) = &value else {
            panic!("expected a map");
        };
        assert_eq!(entries[0].0, Value::from("value"));
        let items = entries[0].1.as_array().unwrap();
        assert_eq!(items[0], Value::from(1));
        assert_eq!(items[1], Value::from(-2));
        assert_eq!(items[2], Value::F64(2.5));
        assert_eq!(items[4], Value::Nil);
    }

    #[test]
    fn test_value_to_json() {
        let value = Value::Map(vec![
            (Value::from("blob"), Value::Binary(vec![1, 2])),
            (Value::from(7), Value::from("seven")),
            (Value::from("big"), Value::from(u64::MAX)),
        ]);
        assert_eq!(
            value_to_json(&value),
            json!({"blob": [1, 2], "7": "seven", "big": u64::MAX})
        );
    }

    #[test]
    fn test_parse_json_arg() {
        assert_eq!(parse_json_arg("\"abc\"").unwrap(), Value::from("abc"));
        assert!(parse_json_arg("{not json").is_err());
    }
}
