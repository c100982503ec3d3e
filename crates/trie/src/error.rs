use ridge_db_api::DbError;

#[derive(thiserror::Error, Debug)]
pub enum TrieError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("corrupt intermediate trie hash entry: {0}")]
    CorruptCache(String),

    #[error("trie computation cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, TrieError>;
