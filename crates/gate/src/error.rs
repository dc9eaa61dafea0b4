use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed count, detail line, identifier or deep-link payload.
    #[error("invalid argument: {message}")]
    InvalidArgument { message: String },

    /// The caller is not allowed to perform the operation.
    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl Error {
    #[must_use]
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied {
            message: message.into(),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }

    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
