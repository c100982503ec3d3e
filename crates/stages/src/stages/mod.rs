mod block_hashes;
mod execution;
mod finish;
mod hash_state;
mod headers;
mod intermediate_hashes;
mod minimal;

pub use block_hashes::block_hashes_stage;
pub use execution::execution_stage;
pub use finish::finish_stage;
pub use hash_state::hash_state_stage;
pub use headers::headers_stage;
pub use intermediate_hashes::intermediate_hashes_stage;
pub use minimal::minimal_stage;
