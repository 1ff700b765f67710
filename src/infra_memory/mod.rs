mod refresh_token_store_memory;

pub use refresh_token_store_memory::*;
