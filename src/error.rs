use crate::annotation::io::ParseError;
use crate::filter::ConfigError;

/// Errors surfaced by the library's I/O edges.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
