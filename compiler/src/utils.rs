use serde_json;

/// Quotes and escapes a string for use in error messages and generated
/// Thrift output.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap()
}
