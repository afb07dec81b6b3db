use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ProviderError {
    #[error("invalid configuration: {message}")]
    #[diagnostic(help("the host orchestrator passes provider options as environment variables"))]
    Config { message: String },

    #[error("{stage}: {message}")]
    Auth { stage: String, message: String },

    #[error("{stage}: {message}")]
    Compute { stage: String, message: String },

    #[error("{stage}")]
    Keys {
        stage: String,
        #[source]
        source: std::io::Error,
    },

    #[error("generate key pair: {message}")]
    KeyGen { message: String },

    #[error("{stage}: {message}")]
    Ssh { stage: String, message: String },
}

impl ProviderError {
    pub(crate) fn compute(stage: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ProviderError::Compute {
            stage: stage.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn ssh(stage: impl Into<String>, err: impl std::fmt::Display) -> Self {
        ProviderError::Ssh {
            stage: stage.into(),
            message: err.to_string(),
        }
    }

    pub(crate) fn keys(stage: impl Into<String>, source: std::io::Error) -> Self {
        ProviderError::Keys {
            stage: stage.into(),
            source,
        }
    }
}
