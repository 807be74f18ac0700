use kube::runtime::finalizer;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OperatorError {
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Finalizer error: {0}")]
    Finalizer(String),
}

pub type Result<T> = std::result::Result<T, OperatorError>;

impl OperatorError {
    /// Whether this error is transient and the reconciliation should be retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, OperatorError::Kube(_))
    }

    /// Whether this error is a 404 from the API server.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            OperatorError::Kube(kube::Error::Api(kube::core::ErrorResponse { code: 404, .. }))
        )
    }
}

impl From<finalizer::Error<OperatorError>> for OperatorError {
    fn from(err: finalizer::Error<OperatorError>) -> Self {
        match err {
            finalizer::Error::ApplyFailed(e) | finalizer::Error::CleanupFailed(e) => e,
            finalizer::Error::AddFinalizer(e) | finalizer::Error::RemoveFinalizer(e) => {
                OperatorError::Kube(e)
            }
            other => OperatorError::Finalizer(other.to_string()),
        }
    }
}
