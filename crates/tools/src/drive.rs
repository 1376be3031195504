//! Recently listed Google Drive files.

use async_trait::async_trait;
use relaybot_core::error::IntegrationError;
use relaybot_core::integration::Integration;
use serde::Deserialize;
use std::sync::Arc;

use crate::google::GoogleClient;

pub struct Drive {
    google: Arc<GoogleClient>,
    page_size: u32,
}

impl Drive {
    pub fn new(google: Arc<GoogleClient>, page_size: u32) -> Self {
        Self { google, page_size }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub mime_type: String,
    #[serde(default)]
    pub modified_time: Option<String>,
}

pub fn format_files(files: &[DriveFile]) -> String {
    if files.is_empty() {
        return "No files found in Drive.".into();
    }
    let mut text = String::from("*Recent Drive files:*\n");
    for file in files {
        text.push_str(&format!(
            "• {} ({}) — updated {}\n",
            file.name,
            file.mime_type,
            file.modified_time.as_deref().unwrap_or("unknown")
        ));
    }
    text
}

#[async_trait]
impl Integration for Drive {
    fn name(&self) -> &str {
        "drive"
    }

    fn description(&self) -> &str {
        "List recent Google Drive files"
    }

    async fn query(&self, _args: &str) -> Result<String, IntegrationError> {
        let list: FileList = self
            .google
            .get(
                &self.google.api_url("/drive/v3/files"),
                &[
                    ("pageSize", self.page_size.to_string()),
                    ("fields", "files(id, name, mimeType, modifiedTime)".to_string()),
                ],
            )
            .await?;
        Ok(format_files(&list.files))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_server;
    use axum::routing::get;
    use axum::{Json, Router};

    #[test]
    fn formats_file_lines() {
        let list: FileList = serde_json::from_str(
            r#"{"files": [
                {"id": "1", "name": "Budget", "mimeType": "application/vnd.google-apps.spreadsheet",
                 "modifiedTime": "2026-10-01T12:00:00.000Z"},
                {"id": "2", "name": "notes.txt", "mimeType": "text/plain"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(
            format_files(&list.files),
            "*Recent Drive files:*\n\
             • Budget (application/vnd.google-apps.spreadsheet) — updated 2026-10-01T12:00:00.000Z\n\
             • notes.txt (text/plain) — updated unknown\n"
        );
    }

    #[test]
    fn empty_drive() {
        assert_eq!(format_files(&[]), "No files found in Drive.");
    }

    #[tokio::test]
    async fn queries_files_endpoint() {
        let app = Router::new().route(
            "/drive/v3/files",
            get(|| async {
                Json(serde_json::json!({ "files": [{"name": "a.pdf", "mimeType": "application/pdf"}] }))
            }),
        );
        let base = spawn_server(app).await;
        let google = Arc::new(GoogleClient::new(Some("tok".into())).with_base_url(base));

        let text = Drive::new(google, 5).query("").await.unwrap();
        assert!(text.contains("• a.pdf (application/pdf)"));
    }
}
