use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(uuid::Uuid),

    #[error("{0}")]
    Other(String),
}
