//! Analysis request extraction.
//!
//! The endpoint accepts either a JSON body or a multipart form. An uploaded
//! `file` field is read and discarded.

use crate::error::AppError;
use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

/// Parsed body of an analysis request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AnalyzeRequest {
    #[serde(default, deserialize_with = "deserialize_query")]
    pub query: String,

    #[serde(default, deserialize_with = "deserialize_flag")]
    pub use_ai: bool,
}

/// Interpret a form or JSON string as a boolean flag.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

fn deserialize_query<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Bool(b) => b,
        Value::String(s) => parse_flag(&s),
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        _ => false,
    })
}

#[async_trait]
impl<S> FromRequest<S> for AnalyzeRequest
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_lowercase();

        if content_type.is_empty() {
            return Ok(AnalyzeRequest::default());
        }

        if content_type.starts_with("application/json") {
            let Json(body) = Json::<AnalyzeRequest>::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return Ok(body);
        }

        if content_type.starts_with("multipart/form-data") {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            return read_form(multipart).await;
        }

        Err(AppError::UnsupportedMediaType(content_type))
    }
}

async fn read_form(mut multipart: Multipart) -> Result<AnalyzeRequest, AppError> {
    let mut request = AnalyzeRequest::default();

    while let Some(mut field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "query" => {
                request.query = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
            }
            "use_ai" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?;
                request.use_ai = parse_flag(&value);
            }
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let mut size = 0usize;
                while let Some(chunk) = field
                    .chunk()
                    .await
                    .map_err(|e| AppError::BadRequest(e.body_text()))?
                {
                    size += chunk.len();
                }
                debug!("Ignoring uploaded file '{}' ({} bytes)", file_name, size);
            }
            other => debug!("Ignoring form field '{}'", other),
        }
    }

    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag("True"));
        assert!(parse_flag(" 1 "));
        assert!(parse_flag("on"));
        assert!(!parse_flag("false"));
        assert!(!parse_flag(""));
        assert!(!parse_flag("0"));
    }

    #[test]
    fn test_json_defaults() {
        let request: AnalyzeRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request, AnalyzeRequest::default());
    }

    #[test]
    fn test_json_flag_variants() {
        let request: AnalyzeRequest =
            serde_json::from_str(r#"{"query": "Wakad", "use_ai": true}"#).unwrap();
        assert_eq!(request.query, "Wakad");
        assert!(request.use_ai);

        let request: AnalyzeRequest = serde_json::from_str(r#"{"use_ai": "yes"}"#).unwrap();
        assert!(request.use_ai);

        let request: AnalyzeRequest = serde_json::from_str(r#"{"use_ai": 0}"#).unwrap();
        assert!(!request.use_ai);

        let request: AnalyzeRequest =
            serde_json::from_str(r#"{"query": null, "use_ai": null}"#).unwrap();
        assert_eq!(request, AnalyzeRequest::default());
    }
}
