use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LumeError {
    #[error("I/O Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CMS config file not found in {root} (tried {})", .candidates.join(", "))]
    ConfigNotFound {
        root: String,
        candidates: Vec<String>,
    },

    #[error("CMS instance is not found in {}", .0.display())]
    CmsInstanceMissing(PathBuf),

    #[error("Site config file not found: {}", .0.display())]
    SiteConfigNotFound(PathBuf),

    #[error("Invalid config {path}: {message}")]
    InvalidConfig { path: String, message: String },

    #[error("Failed to listen on {address}: {source}")]
    ListenBindFailure {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("CMS adapter failed: {0}")]
    AdapterHandlerFailure(String),

    #[error("Notify Error: {0}")]
    NotifyError(#[from] notify::Error),

    #[error("JSON Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Build error: {0}")]
    Build(#[from] anyhow::Error),

    #[error("Watcher error: {0}")]
    Watcher(String),

    #[error("Host channel is closed")]
    HostDisconnected,
}

pub type LumeResult<T = ()> = Result<T, LumeError>;

impl LumeError {
    /// Whether the error aborts a whole build cycle rather than a single request.
    pub fn is_cycle_fatal(&self) -> bool {
        !matches!(self, LumeError::AdapterHandlerFailure(_))
    }

    pub fn response(&self) -> axum::response::Response {
        use axum::http::{StatusCode, header};
        use axum::response::IntoResponse;

        let code = match self {
            LumeError::SiteConfigNotFound(_) => StatusCode::NOT_FOUND,
            LumeError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound => {
                StatusCode::NOT_FOUND
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (
            code,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}
