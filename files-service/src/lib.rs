pub mod config;
pub mod handlers;
pub mod startup;

pub use startup::{build_router, Application};

/// Scope required by `GET /files`.
pub const READ_FILES_SCOPE: &str = "demo/read.file";
