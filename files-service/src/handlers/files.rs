use axum::Json;
use service_core::auth::Authorized;
use service_core::models::{FileEntry, FileListing};

pub fn demo_files() -> FileListing {
    [("file1", "James Bond"), ("file2", "Harry Potter")]
        .into_iter()
        .map(|(id, name)| {
            (
                id.to_string(),
                FileEntry {
                    name: name.to_string(),
                },
            )
        })
        .collect()
}

/// `GET /files`, reachable only behind `require_scope(demo/read.file)`.
pub async fn list_files(Authorized(client): Authorized) -> Json<FileListing> {
    tracing::info!(client_id = %client.client_id, token_id = %client.token_id, "Listing files");
    Json(demo_files())
}
