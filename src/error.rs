use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Constraint violation: {0}")]
    Constraint(String),

    #[error("Authorization error: {0}")]
    Authorization(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Classify a sqlx failure, keeping storage-level constraint rejections
    /// apart from other database errors.
    pub fn from_sqlx(context: &str, err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            use sqlx::error::ErrorKind;
            match db_err.kind() {
                ErrorKind::CheckViolation
                | ErrorKind::ForeignKeyViolation
                | ErrorKind::NotNullViolation
                | ErrorKind::UniqueViolation => {
                    return Error::Constraint(format!("{}: {}", context, db_err.message()));
                }
                _ => {}
            }
        }
        Error::Database(format!("{}: {}", context, err))
    }
}
