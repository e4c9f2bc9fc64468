//! Request body validation
//!
//! Bodies are parsed as JSON objects and then checked field by field so
//! that each kind of problem (missing field, wrong type, out of range) keeps
//! its own error message.

use serde_json::{Map, Value};

use super::error::{ApiError, ApiResult};
use crate::models::{has_reserved_chars, Tier};

pub const INVALID_JSON: &str = "Invalid JSON format";
pub const INVALID_TIER: &str = "Invalid key type. Must be 0-3";

/// Validated body of `POST /api/keys`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateKeyRequest {
    pub value: String,
    pub tier: Tier,
}

/// Validated body of `PUT /api/keys/{id}/use`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UseKeyRequest {
    pub discord_username: String,
}

impl CreateKeyRequest {
    pub fn from_body(body: &[u8]) -> ApiResult<Self> {
        let fields = parse_object(body)?;

        let value = string_field(&fields, "value")?;
        if value.is_empty() {
            return Err(ApiError::bad_request("'value' cannot be empty"));
        }
        if has_reserved_chars(&value) {
            return Err(ApiError::bad_request("'value' contains reserved characters"));
        }

        let tier = match fields.get("type") {
            None => return Err(ApiError::bad_request("Missing 'type' parameter")),
            Some(Value::Number(n)) => n
                .as_i64()
                .and_then(Tier::from_ordinal)
                .ok_or_else(|| ApiError::bad_request(INVALID_TIER))?,
            Some(_) => return Err(ApiError::bad_request("'type' must be a number")),
        };

        Ok(Self { value, tier })
    }
}

impl UseKeyRequest {
    pub fn from_body(body: &[u8]) -> ApiResult<Self> {
        let fields = parse_object(body)?;

        let discord_username = string_field(&fields, "discordUsername")?;
        if has_line_break(&discord_username) {
            return Err(ApiError::bad_request(
                "'discordUsername' cannot contain line breaks",
            ));
        }

        Ok(Self { discord_username })
    }
}

/// Parse a tier from a path segment
pub fn parse_tier_segment(segment: &str) -> ApiResult<Tier> {
    segment
        .parse::<i64>()
        .ok()
        .and_then(Tier::from_ordinal)
        .ok_or_else(|| ApiError::bad_request(INVALID_TIER))
}

fn parse_object(body: &[u8]) -> ApiResult<Map<String, Value>> {
    match serde_json::from_slice(body) {
        Ok(Value::Object(fields)) => Ok(fields),
        _ => Err(ApiError::bad_request(INVALID_JSON)),
    }
}

fn string_field(fields: &Map<String, Value>, name: &str) -> ApiResult<String> {
    match fields.get(name) {
        None => Err(ApiError::bad_request(format!("Missing '{}' parameter", name))),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(ApiError::bad_request(format!("'{}' must be a string", name))),
    }
}

fn has_line_break(s: &str) -> bool {
    s.contains(['\n', '\r'])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_error(body: &str) -> String {
        CreateKeyRequest::from_body(body.as_bytes())
            .unwrap_err()
            .to_string()
    }

    fn use_error(body: &str) -> String {
        UseKeyRequest::from_body(body.as_bytes())
            .unwrap_err()
            .to_string()
    }

    #[test]
    fn test_create_valid() {
        let req = CreateKeyRequest::from_body(br#"{"type": 2, "value": "K1"}"#).unwrap();
        assert_eq!(
            req,
            CreateKeyRequest {
                value: "K1".to_string(),
                tier: Tier::Month
            }
        );
    }

    #[test]
    fn test_create_errors() {
        assert_eq!(create_error("not json"), INVALID_JSON);
        assert_eq!(create_error("[1,2]"), INVALID_JSON);
        assert_eq!(create_error(""), INVALID_JSON);
        assert_eq!(create_error(r#"{"type":0}"#), "Missing 'value' parameter");
        assert_eq!(create_error(r#"{"value":5,"type":0}"#), "'value' must be a string");
        assert_eq!(create_error(r#"{"value":null,"type":0}"#), "'value' must be a string");
        assert_eq!(create_error(r#"{"value":"","type":0}"#), "'value' cannot be empty");
        assert_eq!(create_error(r#"{"value":"K1"}"#), "Missing 'type' parameter");
        assert_eq!(create_error(r#"{"value":"K1","type":"1"}"#), "'type' must be a number");
        assert_eq!(create_error(r#"{"value":"K1","type":4}"#), INVALID_TIER);
        assert_eq!(create_error(r#"{"value":"K1","type":-1}"#), INVALID_TIER);
        assert_eq!(create_error(r#"{"value":"K1","type":1.5}"#), INVALID_TIER);
    }

    #[test]
    fn test_create_rejects_reserved_characters() {
        assert_eq!(
            create_error(r#"{"value":"A|B","type":0}"#),
            "'value' contains reserved characters"
        );
        assert_eq!(
            create_error(r#"{"value":"A\nB","type":0}"#),
            "'value' contains reserved characters"
        );
        // Commas survive the current line format
        assert!(CreateKeyRequest::from_body(br#"{"value":"A,B","type":0}"#).is_ok());
    }

    #[test]
    fn test_use_valid() {
        let req = UseKeyRequest::from_body(br#"{"discordUsername":"bob|the|builder"}"#).unwrap();
        assert_eq!(req.discord_username, "bob|the|builder");

        // Empty usernames are allowed
        assert!(UseKeyRequest::from_body(br#"{"discordUsername":""}"#).is_ok());
    }

    #[test]
    fn test_use_errors() {
        assert_eq!(use_error("{}"), "Missing 'discordUsername' parameter");
        assert_eq!(use_error(r#"{"discordUsername":1}"#), "'discordUsername' must be a string");
        assert_eq!(
            use_error(r#"{"discordUsername":"a\r\nb"}"#),
            "'discordUsername' cannot contain line breaks"
        );
        assert_eq!(use_error("{"), INVALID_JSON);
    }

    #[test]
    fn test_parse_tier_segment() {
        assert_eq!(parse_tier_segment("3").unwrap(), Tier::Lifetime);
        assert!(parse_tier_segment("4").is_err());
        assert!(parse_tier_segment("-1").is_err());
        assert!(parse_tier_segment("abc").is_err());
    }
}
