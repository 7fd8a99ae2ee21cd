use thiserror::Error;

#[derive(Clone, Error, Debug)]
pub enum SnippetError {
    #[error("Storage error: {0}")]
    Storage(String),
}
