pub mod health;
pub mod token;

pub use health::health_check;
pub use token::issue_token;
