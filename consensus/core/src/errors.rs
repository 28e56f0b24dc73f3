use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("Invalid hash string: {0}")]
    InvalidHash(String),

    #[error("Unknown network: {0}")]
    UnknownNetwork(String),
}
