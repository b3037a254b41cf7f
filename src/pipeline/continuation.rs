//! Continuation tokens for the offset and limit components.
//!
//! Wire format is a JSON object with a count field named after the component
//! and the wrapped source's own token:
//!
//! ```text
//! {"offset": 3, "sourceToken": "..."}
//! {"limit": 10, "sourceToken": null}
//! {"top": 10, "sourceToken": "..."}
//! ```
//!
//! Unknown fields are ignored on read.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::errors::{QueryError, QueryResult};
use crate::observability::{log_event_with_fields, Event};

const SOURCE_TOKEN_FIELD: &str = "sourceToken";

/// Name of the count field in a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenField {
    Offset,
    Limit,
    Top,
}

impl TokenField {
    /// Returns the JSON field name
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenField::Offset => "offset",
            TokenField::Limit => "limit",
            TokenField::Top => "top",
        }
    }
}

/// Why a token could not be decoded
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenDecodeError {
    #[error("continuation token is not valid JSON: {0}")]
    Malformed(String),

    #[error("continuation token must be a JSON object")]
    NotAnObject,

    #[error("continuation token is missing '{0}'")]
    MissingField(&'static str),

    #[error("continuation token field '{0}' must be a non-negative integer")]
    InvalidCount(&'static str),

    #[error("continuation token field 'sourceToken' must be a string or null")]
    InvalidSourceToken,
}

/// Offset/limit state that survives a batch boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContinuationToken {
    /// Items still to skip (offset) or still allowed (limit)
    pub remaining: u64,
    /// Continuation of the wrapped source
    pub source_token: Option<String>,
}

impl ContinuationToken {
    pub fn new(remaining: u64, source_token: Option<String>) -> Self {
        Self {
            remaining,
            source_token,
        }
    }

    /// Serialize with `field` as the count field name
    pub fn encode(&self, field: TokenField) -> String {
        let mut map = Map::new();
        map.insert(field.as_str().to_string(), Value::from(self.remaining));
        map.insert(
            SOURCE_TOKEN_FIELD.to_string(),
            match &self.source_token {
                Some(token) => Value::String(token.clone()),
                None => Value::Null,
            },
        );
        Value::Object(map).to_string()
    }

    /// Parse a token whose count lives under `field`
    pub fn decode(raw: &str, field: TokenField) -> Result<Self, TokenDecodeError> {
        let value: Value =
            serde_json::from_str(raw).map_err(|e| TokenDecodeError::Malformed(e.to_string()))?;
        let map = value.as_object().ok_or(TokenDecodeError::NotAnObject)?;

        let remaining = map
            .get(field.as_str())
            .ok_or(TokenDecodeError::MissingField(field.as_str()))?
            .as_u64()
            .ok_or(TokenDecodeError::InvalidCount(field.as_str()))?;

        let source_token = match map.get(SOURCE_TOKEN_FIELD) {
            None | Some(Value::Null) => None,
            Some(Value::String(token)) => Some(token.clone()),
            Some(_) => return Err(TokenDecodeError::InvalidSourceToken),
        };

        Ok(Self::new(remaining, source_token))
    }

    /// Starting state for a component configured with `count`.
    ///
    /// Without a token the state is `{remaining: count}`. A token that does
    /// not decode, or whose `remaining` exceeds `count`, was issued for a
    /// different query and is rejected as a bad request.
    pub fn resume(raw: Option<&str>, field: TokenField, count: u64) -> QueryResult<Self> {
        let raw = match raw {
            Some(raw) => raw,
            None => return Ok(Self::new(count, None)),
        };

        let token = Self::decode(raw, field).map_err(|e| {
            let reason = e.to_string();
            log_event_with_fields(
                Event::ContinuationRejected,
                &[("reason", reason.as_str()), ("token", raw)],
            );
            QueryError::bad_request(format!("invalid {} continuation token: {}", field.as_str(), e))
        })?;

        if token.remaining > count {
            let remaining = token.remaining.to_string();
            let configured = count.to_string();
            log_event_with_fields(
                Event::ContinuationRejected,
                &[
                    ("configured", configured.as_str()),
                    ("field", field.as_str()),
                    ("remaining", remaining.as_str()),
                ],
            );
            return Err(QueryError::bad_request(format!(
                "continuation token {} of {} exceeds the {} of {} in the current query",
                field.as_str(),
                token.remaining,
                field.as_str(),
                count
            )));
        }

        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::QueryErrorCode;

    #[test]
    fn test_encode_field_names() {
        let token = ContinuationToken::new(3, Some("page:2".into()));
        assert_eq!(token.encode(TokenField::Offset), r#"{"offset":3,"sourceToken":"page:2"}"#);

        let token = ContinuationToken::new(0, None);
        assert_eq!(token.encode(TokenField::Top), r#"{"sourceToken":null,"top":0}"#);
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let token =
            ContinuationToken::decode(r#"{"limit": 4, "sourceToken": "x", "v": 2}"#, TokenField::Limit)
                .unwrap();
        assert_eq!(token, ContinuationToken::new(4, Some("x".into())));
    }

    #[test]
    fn test_decode_rejects_bad_input() {
        assert!(matches!(
            ContinuationToken::decode("{offset", TokenField::Offset),
            Err(TokenDecodeError::Malformed(_))
        ));
        assert_eq!(
            ContinuationToken::decode("[1]", TokenField::Offset),
            Err(TokenDecodeError::NotAnObject)
        );
        assert_eq!(
            ContinuationToken::decode(r#"{"top": 1}"#, TokenField::Limit),
            Err(TokenDecodeError::MissingField("limit"))
        );
        assert_eq!(
            ContinuationToken::decode(r#"{"offset": -1}"#, TokenField::Offset),
            Err(TokenDecodeError::InvalidCount("offset"))
        );
        assert_eq!(
            ContinuationToken::decode(r#"{"offset": 1, "sourceToken": 5}"#, TokenField::Offset),
            Err(TokenDecodeError::InvalidSourceToken)
        );
    }

    #[test]
    fn test_resume_without_token() {
        let token = ContinuationToken::resume(None, TokenField::Offset, 7).unwrap();
        assert_eq!(token, ContinuationToken::new(7, None));
    }

    #[test]
    fn test_resume_rejects_tampered_count() {
        let err = ContinuationToken::resume(Some(r#"{"limit": 11}"#), TokenField::Limit, 10)
            .unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::BadRequest);

        let ok = ContinuationToken::resume(Some(r#"{"limit": 10}"#), TokenField::Limit, 10).unwrap();
        assert_eq!(ok.remaining, 10);
    }

    #[test]
    fn test_resume_malformed_is_bad_request() {
        let err = ContinuationToken::resume(Some("not json"), TokenField::Top, 1).unwrap_err();
        assert_eq!(err.code(), QueryErrorCode::BadRequest);
    }
}
