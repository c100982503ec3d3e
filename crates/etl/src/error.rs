use ridge_db_api::DbError;

/// Errors produced by the ETL engine.
#[derive(thiserror::Error, Debug)]
pub enum EtlError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("etl spill file io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("etl spill file truncated or corrupt")]
    Corrupt,

    #[error("transform cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, EtlError>;
