use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Reqwest(#[from] reqwest::Error),
    #[error("HTTP status {0}: {1}")]
    HttpStatus(StatusCode, String),
}

impl ApiError {
    /// The `error` field of a JSON error body, or the raw body.
    pub fn message(&self) -> String {
        match self {
            ApiError::HttpStatus(_, body) => serde_json::from_str::<serde_json::Value>(body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
                .unwrap_or_else(|| body.clone()),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_from_json_body() {
        let err = ApiError::HttpStatus(
            StatusCode::BAD_REQUEST,
            r#"{"error":"Only APK files are allowed"}"#.to_string(),
        );
        assert_eq!(err.message(), "Only APK files are allowed");

        let err = ApiError::HttpStatus(StatusCode::NOT_FOUND, "File not found".to_string());
        assert_eq!(err.message(), "File not found");
    }
}
