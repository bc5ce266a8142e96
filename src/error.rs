use thiserror::Error;

use crate::pipeline::Stage;

pub type Result<T> = std::result::Result<T, Error>;

/// Exit code reported when a process could not be launched or was killed by a signal.
pub const LAUNCH_FAILURE_EXIT_CODE: i32 = -1;

#[derive(Debug, Error)]
pub enum Error {
    #[error("command `{command}` failed with exit code {exit_code}: {stderr}")]
    ExternalCommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error(
        "alignment not fully reconciled: consumed {consumed} of {total} entries for {tokens} tokens"
    )]
    AlignmentReconciliationIncomplete {
        consumed: usize,
        total: usize,
        tokens: usize,
    },

    #[error("{batch} batch failed at segment {index}")]
    BatchFailed {
        batch: &'static str,
        index: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("request {request_id} failed at {stage} stage")]
    PipelineFailed {
        request_id: String,
        stage: Stage,
        #[source]
        source: Box<Error>,
    },

    #[error("{context}")]
    Unexpected {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    pub fn unexpected<E>(context: impl Into<String>, source: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self::Unexpected {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Walks through batch and pipeline wrappers to the error that started it.
    pub fn root(&self) -> &Error {
        match self {
            Self::BatchFailed { source, .. } | Self::PipelineFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Attaches context to foreign errors, turning them into [`Error::Unexpected`].
pub trait Context<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> Context<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::unexpected(context, e))
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| Error::unexpected(f(), e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_unwraps_nested_wrappers() {
        let err = Error::PipelineFailed {
            request_id: "abc".into(),
            stage: Stage::Aligned,
            source: Box::new(Error::BatchFailed {
                batch: "subtitle",
                index: 3,
                source: Box::new(Error::AlignmentReconciliationIncomplete {
                    consumed: 1,
                    total: 2,
                    tokens: 2,
                }),
            }),
        };

        assert!(matches!(
            err.root(),
            Error::AlignmentReconciliationIncomplete { consumed: 1, .. }
        ));
    }

    #[test]
    fn context_wraps_io_error() {
        let res: std::result::Result<(), std::io::Error> =
            Err(std::io::Error::new(std::io::ErrorKind::NotFound, "gone"));
        let err = res.context("reading transcript").unwrap_err();

        assert_eq!(err.to_string(), "reading transcript");
        let source = std::error::Error::source(&err).unwrap();
        assert_eq!(source.to_string(), "gone");
    }
}
