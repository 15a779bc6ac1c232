use serde_json::json;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("Unknown error: {0}")]
    Unknown(String),

    #[error("Invalid content: {0}")]
    Validation(String),

    #[error("Not found")]
    NotFound,

    #[error("Permission denied")]
    Forbidden,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Network error: {0}")]
    Network(String),
}

impl Error {
    pub fn empty_content() -> Error {
        Error::Validation(String::from("comment content must not be empty"))
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    pub fn status_code(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Error::Unknown(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::Forbidden => StatusCode::FORBIDDEN,
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::Network(_) => StatusCode::BAD_GATEWAY,
        }
    }

    pub fn contents(&self) -> Vec<u8> {
        serde_json::to_vec(&match self {
            Error::Unknown(msg) => json!({
                "message": msg,
                "type": "unknown",
            }),
            Error::Validation(msg) => json!({
                "message": msg,
                "type": "validation",
            }),
            Error::NotFound => json!({
                "message": "not found",
                "type": "not-found",
            }),
            Error::Forbidden => json!({
                "message": "permission denied",
                "type": "forbidden",
            }),
            Error::Unauthenticated => json!({
                "message": "authentication credentials were not provided",
                "type": "unauthenticated",
            }),
            Error::Network(msg) => json!({
                "message": msg,
                "type": "network",
            }),
        })
        .expect("serializing error contents")
    }

    /// Rebuilds the error for a non-successful response
    ///
    /// The status code is authoritative; the body is only used to recover a human-readable
    /// message, looking at the `message`, `detail` and `error` keys in that order.
    pub fn from_response(status: http::StatusCode, body: &[u8]) -> Error {
        use http::StatusCode;
        let message = || {
            message_from_body(body).unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected response")
                    .to_string()
            })
        };
        match status {
            StatusCode::BAD_REQUEST => Error::Validation(message()),
            StatusCode::UNAUTHORIZED => Error::Unauthenticated,
            StatusCode::FORBIDDEN => Error::Forbidden,
            StatusCode::NOT_FOUND => Error::NotFound,
            _ => Error::Unknown(format!("{status}: {}", message())),
        }
    }
}

fn message_from_body(body: &[u8]) -> Option<String> {
    let data: serde_json::Value = serde_json::from_slice(body).ok()?;
    ["message", "detail", "error"].iter().find_map(|k| {
        match data.get(k)? {
            serde_json::Value::String(s) => Some(s.clone()),
            // field errors come as {"content": ["..."]}
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn round_trips_through_response() {
        for err in [
            Error::Validation(String::from("comment content must not be empty")),
            Error::NotFound,
            Error::Forbidden,
            Error::Unauthenticated,
        ] {
            assert_eq!(
                Error::from_response(err.status_code(), &err.contents()),
                err
            );
        }
    }

    #[test]
    fn picks_message_from_backend_keys() {
        assert_eq!(
            Error::from_response(
                StatusCode::BAD_REQUEST,
                br#"{"detail": "Le commentaire ne peut pas etre vide."}"#
            ),
            Error::Validation(String::from("Le commentaire ne peut pas etre vide."))
        );
        assert_eq!(
            Error::from_response(StatusCode::BAD_REQUEST, br#"{"content": ["bad"]}"#),
            Error::Validation(String::from("Bad Request"))
        );
        assert_eq!(
            Error::from_response(StatusCode::FORBIDDEN, br#"{"error": "nope"}"#),
            Error::Forbidden
        );
    }

    #[test]
    fn unexpected_statuses_are_unknown() {
        assert_eq!(
            Error::from_response(StatusCode::INTERNAL_SERVER_ERROR, b"<html>oops</html>"),
            Error::Unknown(String::from(
                "500 Internal Server Error: Internal Server Error"
            ))
        );
    }
}
