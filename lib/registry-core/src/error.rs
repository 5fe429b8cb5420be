use thiserror::Error;

pub type Result<T> = std::result::Result<T, RegistryError>;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Invalid endpoint {name}: {source}")]
    InvalidEndpoint {
        name: String,
        source: url::ParseError,
    },

    /// Error raised by a server outside this crate, passed back unchanged
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
