use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Failures talking to the exhibition platform API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// Network, DNS, TLS or timeout failure before a response arrived.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body did not have the expected shape.
    #[error("unexpected response for {context}: {source}")]
    Decode {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Build an error from a failed response, keeping the server's own
    /// message when it sent one.
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        let message = extract_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Request failed")
                .to_string()
        });
        ApiError::Http {
            status: status.as_u16(),
            message,
        }
    }

    /// Text suitable for a banner. Server messages are passed through
    /// verbatim.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Http { message, .. } => message.clone(),
            ApiError::Transport(e) if e.is_timeout() => "The server took too long to respond".to_string(),
            ApiError::Transport(_) => "Could not reach the server".to_string(),
            ApiError::Decode { .. } => "The server sent an unexpected response".to_string(),
            ApiError::Io(e) => e.to_string(),
            ApiError::Config(msg) => msg.clone(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            ApiError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_client_error(&self) -> bool {
        matches!(self.status(), Some(400..=499))
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Pull a human message out of an error body.
///
/// Looks at `detail`, `message` and `error` in a JSON object (string, or a
/// list of `{ "msg": ... }` validation entries), then falls back to the raw
/// body text when it is not JSON.
fn extract_message(body: &[u8]) -> Option<String> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => ["detail", "message", "error"]
            .iter()
            .find_map(|key| map.get(*key).and_then(message_from_value)),
        Ok(Value::String(text)) => non_empty(&text),
        Ok(_) => None,
        Err(_) => non_empty(&String::from_utf8_lossy(body)),
    }
}

fn message_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(text) => non_empty(text),
        Value::Array(items) => {
            let parts: Vec<String> = items
                .iter()
                .filter_map(|item| match item {
                    Value::String(text) => Some(text.clone()),
                    Value::Object(entry) => entry
                        .get("msg")
                        .or_else(|| entry.get("message"))
                        .and_then(Value::as_str)
                        .map(str::to_string),
                    _ => None,
                })
                .collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join("; "))
            }
        }
        _ => None,
    }
}

/// Whitespace-only counts as empty; anything else is kept as sent.
fn non_empty(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
