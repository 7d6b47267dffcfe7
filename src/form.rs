// Form encoding for credential payloads
//
// The token endpoint expects application/x-www-form-urlencoded bodies, so the
// caller's credential object is flattened into key/value pairs before posting.

use reqwest::RequestBuilder;
use serde_json::Value;

use crate::error::{AuthError, Result};

/// Flatten a JSON object into form fields
///
/// Strings are sent verbatim, numbers and booleans stringified, `null` as an
/// empty value. Nested arrays and objects have no form representation.
pub fn form_pairs(data: &Value) -> Result<Vec<(String, String)>> {
    let object = data
        .as_object()
        .ok_or_else(|| AuthError::Encoding(format!("expected an object, got {}", kind(data))))?;

    object
        .iter()
        .map(|(key, value)| {
            let value = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                Value::Null => String::new(),
                Value::Array(_) | Value::Object(_) => {
                    return Err(AuthError::Encoding(format!(
                        "nested {} for field '{}'",
                        kind(value),
                        key
                    )))
                }
            };
            Ok((key.clone(), value))
        })
        .collect()
}

/// Attach `data` to the request as a form-encoded body
pub fn form_post(request: RequestBuilder, data: &Value) -> Result<RequestBuilder> {
    let pairs = form_pairs(data)?;
    Ok(request.form(&pairs))
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
