use thiserror::Error;

/// Fatal errors raised while parsing a configuration.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Failed to read the configuration file.
    #[error("failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    /// More than one `set vsys-id` statement was found.
    #[error("configuration contains {count} vsys-id statements; multiple virtual systems are not supported")]
    MultipleVsys { count: usize },
}
