pub mod files;
pub mod health;

pub use files::{demo_files, list_files};
pub use health::health_check;
