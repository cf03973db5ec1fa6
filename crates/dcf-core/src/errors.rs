/// Core error type for the fetcher.
///
/// The adapter crate maps SDK-specific failures into this type. Expected
/// absence (unknown channel, missing message, no access) is never an error:
/// it travels as [`crate::domain::Lookup`] or `Option::None` instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("connection error: {0}")]
    Connection(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
