//! Error types the retry policy can inspect

/// Non-success HTTP status from the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpStatusError {
    pub status: u16,
    pub body: String,
}

impl HttpStatusError {
    /// Rate limiting and server-side failures are worth retrying
    pub fn is_transient(&self) -> bool {
        self.status == 429 || (500..600).contains(&self.status)
    }
}

impl std::fmt::Display for HttpStatusError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let body = self.body.trim();
        if body.is_empty() {
            write!(f, "backend returned HTTP {}", self.status)
        } else {
            write!(f, "backend returned HTTP {}: {}", self.status, body)
        }
    }
}

impl std::error::Error for HttpStatusError {}

/// Error reported by a backend function (`status: error`). Never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionError {
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for FunctionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.path, self.message)
    }
}

impl std::error::Error for FunctionError {}
