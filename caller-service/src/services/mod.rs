pub mod cache;
pub mod caller;
pub mod token_client;

pub use cache::TokenCache;
pub use caller::{Caller, Operation};
pub use token_client::{CachedToken, TokenClient, TokenSource};
