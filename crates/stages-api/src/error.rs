use alloy_primitives::B256;
use ridge_db_api::DbError;
use ridge_etl::EtlError;
use ridge_primitives::StageId;
use ridge_trie::TrieError;

#[derive(thiserror::Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Etl(#[from] EtlError),

    #[error(transparent)]
    Trie(#[from] TrieError),

    #[error("wrong trie root: {got}, expected: {want}")]
    WrongTrieRoot { got: B256, want: B256 },

    #[error("no stage registered with id {0}")]
    StageNotFound(StageId),

    #[error("pipeline run cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, StageError>;
