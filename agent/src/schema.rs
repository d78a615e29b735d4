use serde_json::{Map, Value};

/// Checks `arguments` against a tool's parameter schema and returns the
/// argument object the handler should receive.
///
/// A string payload is parsed as JSON first. Every `required` key must be
/// present and non-null, and every declared key must match its `type`.
/// `additionalProperties` with a `type` applies to each value of an object.
/// Keys the schema does not declare are passed through untouched.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Result<Value, String> {
    let arguments = match arguments {
        Value::String(raw) => serde_json::from_str(raw)
            .map_err(|e| format!("arguments are not valid JSON: {e}"))?,
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };

    let Value::Object(fields) = &arguments else {
        return Err(format!(
            "arguments must be a JSON object, got {}",
            type_name(&arguments)
        ));
    };

    for name in required(schema) {
        match fields.get(name) {
            None | Some(Value::Null) => return Err(format!("missing required field `{name}`")),
            Some(_) => {}
        }
    }

    if let Some(properties) = schema.get("properties").and_then(Value::as_object) {
        for (key, value) in fields {
            if value.is_null() {
                continue;
            }
            if let Some(declared) = properties.get(key) {
                check_value(key, declared, value)?;
            }
        }
    }

    Ok(arguments)
}

fn required(schema: &Value) -> impl Iterator<Item = &str> {
    schema
        .get("required")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

fn check_value(path: &str, declared: &Value, value: &Value) -> Result<(), String> {
    if let Some(expected) = declared.get("type").and_then(Value::as_str)
        && !matches_type(expected, value)
    {
        return Err(format!(
            "`{path}` should be {} {expected}, got {}",
            article(expected),
            type_name(value)
        ));
    }

    if let (Some(entries), Some(each)) = (value.as_object(), declared.get("additionalProperties"))
        && each.is_object()
    {
        for (key, entry) in entries {
            check_value(&format!("{path}.{key}"), each, entry)?;
        }
    }

    Ok(())
}

fn matches_type(expected: &str, value: &Value) -> bool {
    match expected {
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => value.is_i64() || value.is_u64(),
        "boolean" => value.is_boolean(),
        "object" => value.is_object(),
        "array" => value.is_array(),
        "null" => value.is_null(),
        _ => true,
    }
}

fn article(type_name: &str) -> &'static str {
    match type_name {
        "integer" | "object" | "array" => "an",
        _ => "a",
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
