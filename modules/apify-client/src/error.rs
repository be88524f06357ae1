use std::fmt;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApifyError>;

/// The API call an error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    StartRun,
    GetRun,
    DatasetItems,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Endpoint::StartRun => "start run",
            Endpoint::GetRun => "get run",
            Endpoint::DatasetItems => "list dataset items",
        })
    }
}

#[derive(Debug, Error)]
pub enum ApifyError {
    /// The request never produced a response.
    #[error("{endpoint}: request failed: {message}")]
    Transport { endpoint: Endpoint, message: String },

    #[error("{endpoint}: request timed out: {message}")]
    Timeout { endpoint: Endpoint, message: String },

    /// The API answered with a non-2xx status. `body` is the raw response text.
    #[error("{endpoint}: HTTP {status}: {body}")]
    Status {
        endpoint: Endpoint,
        status: u16,
        body: String,
    },

    /// A 2xx response whose body is not the expected JSON.
    #[error("{endpoint}: unexpected response body: {message}")]
    Decode { endpoint: Endpoint, message: String },
}

impl ApifyError {
    pub(crate) fn transport(endpoint: Endpoint, err: reqwest::Error) -> Self {
        let message = err.to_string();
        if err.is_timeout() {
            ApifyError::Timeout { endpoint, message }
        } else if err.is_decode() {
            ApifyError::Decode { endpoint, message }
        } else {
            ApifyError::Transport { endpoint, message }
        }
    }

    pub(crate) fn decode(endpoint: Endpoint, err: serde_json::Error) -> Self {
        ApifyError::Decode {
            endpoint,
            message: err.to_string(),
        }
    }

    pub fn endpoint(&self) -> Endpoint {
        match self {
            ApifyError::Transport { endpoint, .. }
            | ApifyError::Timeout { endpoint, .. }
            | ApifyError::Status { endpoint, .. }
            | ApifyError::Decode { endpoint, .. } => *endpoint,
        }
    }

    /// HTTP status, when the API answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApifyError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_endpoint() {
        let err = ApifyError::Status {
            endpoint: Endpoint::StartRun,
            status: 401,
            body: "unauthorized".into(),
        };
        assert_eq!(err.to_string(), "start run: HTTP 401: unauthorized");
        assert_eq!(err.status(), Some(401));

        let err = ApifyError::Timeout {
            endpoint: Endpoint::GetRun,
            message: "deadline elapsed".into(),
        };
        assert_eq!(err.to_string(), "get run: request timed out: deadline elapsed");
        assert_eq!(err.endpoint(), Endpoint::GetRun);
        assert_eq!(err.status(), None);
    }
}
