use thiserror::Error;

#[derive(Error, Debug)]
pub enum NoteError {
    #[error("No note found for '{0}'")]
    NotFound(String),
    #[error("Invalid note key '{0}'")]
    InvalidKey(String),
    #[error("Note storage error: {0}")]
    Storage(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum TranslateError {
    #[error("Translation credentials are not configured")]
    ConfigurationMissing,
    #[error("Translation service error {code}: {message}")]
    Service { code: String, message: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Credential storage error: {0}")]
    Storage(#[from] std::io::Error),
}
