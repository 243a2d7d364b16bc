use thiserror::Error;

#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Category already exists: {0}")]
    DuplicateName(String),

    #[error("Category name is reserved: {0}")]
    ReservedCategory(String),

    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    #[error("Unknown card: {0}")]
    UnknownCard(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
