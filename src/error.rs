use thiserror::Error;

#[derive(Error, Debug)]
pub enum MerqaError {
    #[error("Media error: {0}")]
    Media(String),

    #[error("Analyzer error: {0}")]
    Analyzer(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Record not found: {0}")]
    RecordNotFound(String),

    #[error("Record not processed yet: {0}")]
    RecordNotProcessed(String),

    #[error("No call recordings found for record: {0}")]
    NoCalls(String),

    #[error("MER document not found for record: {0}")]
    MerNotFound(String),

    #[error("Record is already being processed: {0}")]
    AlreadyProcessing(String),
}

pub type Result<T> = std::result::Result<T, MerqaError>;
