//! Error types for the inspector

use thiserror::Error;

use database::DbError;
use rpc_core::RpcError;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("RPC error: {0}")]
    Rpc(#[from] RpcError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Got event of unsupported type {0}")]
    UnsupportedEvent(String),

    #[error("Consensus event stream failed: {0}")]
    EventStream(String),

    #[error("{context}: {source}")]
    Context {
        context: String,
        source: Box<ProcessingError>,
    },
}

pub type Result<T> = std::result::Result<T, ProcessingError>;

impl From<sqlx::Error> for ProcessingError {
    fn from(err: sqlx::Error) -> Self {
        ProcessingError::Database(DbError::Sqlx(err))
    }
}

impl ProcessingError {
    /// Whether the engine reported the requested object as unknown
    pub fn is_not_found(&self) -> bool {
        match self {
            ProcessingError::Rpc(err) => err.is_not_found(),
            ProcessingError::Database(err) => err.is_not_found(),
            ProcessingError::Context { source, .. } => source.is_not_found(),
            _ => false,
        }
    }
}

/// Annotates errors with the block or step they were raised for
pub trait ResultExt<T> {
    fn context<C: Into<String>>(self, context: C) -> Result<T>;

    fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T>;
}

impl<T, E: Into<ProcessingError>> ResultExt<T> for std::result::Result<T, E> {
    fn context<C: Into<String>>(self, context: C) -> Result<T> {
        self.map_err(|err| ProcessingError::Context { context: context.into(), source: Box::new(err.into()) })
    }

    fn with_context<C: Into<String>, F: FnOnce() -> C>(self, f: F) -> Result<T> {
        self.map_err(|err| ProcessingError::Context { context: f().into(), source: Box::new(err.into()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_wraps_and_keeps_kind() {
        let result: std::result::Result<(), RpcError> = Err(RpcError::NotFound("block 00".into()));
        let err = result.context("Could not get block info for block 00").unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Could not get block info for block 00: RPC error: Not found: block 00");
    }

    #[test]
    fn with_context_is_lazy() {
        let ok: std::result::Result<u8, DbError> = Ok(1);
        let value = ok.with_context(|| -> String { panic!("context built for a successful result") }).unwrap();
        assert_eq!(value, 1);
    }
}
