use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures reading from the cluster, classified by how a caller must react to them.
#[derive(Debug, Error)]
pub enum Error {
    /// The auditor's credentials were rejected.
    #[error("authentication failed: {0}")]
    Unauthorized(#[source] BoxError),

    /// The auditor is not permitted to read the requested resources.
    #[error("permission denied: {0}")]
    Forbidden(#[source] BoxError),

    /// The API server could not be reached or did not respond in time.
    #[error("cluster unavailable: {0}")]
    Unavailable(#[source] BoxError),

    #[error("cluster API error: {0}")]
    Other(#[source] BoxError),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Unauthorized,
    Forbidden,
    Unavailable,
    Other,
}

// === impl Error ===

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Unavailable(_) => ErrorKind::Unavailable,
            Self::Other(_) => ErrorKind::Other,
        }
    }

    #[inline]
    pub fn is_forbidden(&self) -> bool {
        self.kind() == ErrorKind::Forbidden
    }
}

impl From<kube::Error> for Error {
    fn from(error: kube::Error) -> Self {
        let kind = match &error {
            kube::Error::Api(rsp) => match rsp.code {
                401 => ErrorKind::Unauthorized,
                403 => ErrorKind::Forbidden,
                502..=504 => ErrorKind::Unavailable,
                _ => ErrorKind::Other,
            },
            kube::Error::Auth(_) => ErrorKind::Unauthorized,
            kube::Error::HyperError(_) | kube::Error::Service(_) => ErrorKind::Unavailable,
            _ => ErrorKind::Other,
        };
        kind.into_error(error)
    }
}

// === impl ErrorKind ===

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unauthorized => "unauthorized",
            Self::Forbidden => "forbidden",
            Self::Unavailable => "unavailable",
            Self::Other => "internal",
        }
    }

    pub fn into_error(self, source: impl Into<BoxError>) -> Error {
        let source = source.into();
        match self {
            Self::Unauthorized => Error::Unauthorized(source),
            Self::Forbidden => Error::Forbidden(source),
            Self::Unavailable => Error::Unavailable(source),
            Self::Other => Error::Other(source),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.as_str().fmt(f)
    }
}
