pub mod error;
pub mod issuer;

pub use error::GrantError;
pub use issuer::{IssuedToken, TokenIssuer};
