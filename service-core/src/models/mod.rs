//! Payloads exchanged between the files service and its callers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
}

/// File identifier -> metadata, the body of `GET /files`.
pub type FileListing = BTreeMap<String, FileEntry>;
