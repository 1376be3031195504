//! Google Docs title and opening paragraphs.

use async_trait::async_trait;
use relaybot_core::error::IntegrationError;
use relaybot_core::integration::Integration;
use serde::Deserialize;
use std::sync::Arc;

use crate::google::GoogleClient;

const PREVIEW_PARAGRAPHS: usize = 3;

pub struct Docs {
    google: Arc<GoogleClient>,
}

impl Docs {
    pub fn new(google: Arc<GoogleClient>) -> Self {
        Self { google }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Body,
}

#[derive(Debug, Default, Deserialize)]
pub struct Body {
    #[serde(default)]
    pub content: Vec<StructuralElement>,
}

#[derive(Debug, Deserialize)]
pub struct StructuralElement {
    #[serde(default)]
    pub paragraph: Option<Paragraph>,
}

#[derive(Debug, Deserialize)]
pub struct Paragraph {
    #[serde(default)]
    pub elements: Vec<ParagraphElement>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParagraphElement {
    #[serde(default)]
    pub text_run: Option<TextRun>,
}

#[derive(Debug, Deserialize)]
pub struct TextRun {
    #[serde(default)]
    pub content: String,
}

impl Document {
    /// Non-empty paragraph texts in document order.
    pub fn paragraphs(&self) -> impl Iterator<Item = String> + '_ {
        self.body
            .content
            .iter()
            .filter_map(|element| element.paragraph.as_ref())
            .map(|paragraph| {
                paragraph
                    .elements
                    .iter()
                    .filter_map(|e| e.text_run.as_ref())
                    .map(|run| run.content.as_str())
                    .collect::<String>()
                    .trim()
                    .to_string()
            })
            .filter(|text| !text.is_empty())
    }
}

pub fn format_document(doc: &Document) -> String {
    let preview = doc.paragraphs().take(PREVIEW_PARAGRAPHS).collect::<Vec<_>>().join("\n");
    let preview = if preview.is_empty() {
        "Preview not available.".to_string()
    } else {
        preview
    };
    format!(
        "*Document:* {}\n\n{}",
        doc.title.as_deref().unwrap_or("Untitled"),
        preview
    )
}

#[async_trait]
impl Integration for Docs {
    fn name(&self) -> &str {
        "docs"
    }

    fn description(&self) -> &str {
        "Show a Google Doc's title and first paragraphs"
    }

    async fn query(&self, args: &str) -> Result<String, IntegrationError> {
        let Some(document_id) = args.split_whitespace().next() else {
            return Err(IntegrationError::InvalidArguments("missing document id".into()));
        };
        let doc: Document = self
            .google
            .get(&self.google.docs_url(&format!("/v1/documents/{document_id}")), &[])
            .await?;
        Ok(format_document(&doc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::spawn_server;
    use axum::extract::Path;
    use axum::routing::get;
    use axum::{Json, Router};

    const FIXTURE: &str = r#"{
        "title": "Quarterly plan",
        "body": {"content": [
            {"sectionBreak": {}},
            {"paragraph": {"elements": [{"textRun": {"content": "Goals "}}, {"textRun": {"content": "for Q4\n"}}]}},
            {"paragraph": {"elements": [{"textRun": {"content": "\n"}}]}},
            {"table": {}},
            {"paragraph": {"elements": [{"textRun": {"content": "Hire two engineers\n"}}]}},
            {"paragraph": {"elements": [{"inlineObjectElement": {}}, {"textRun": {"content": "Ship v2\n"}}]}},
            {"paragraph": {"elements": [{"textRun": {"content": "Not shown\n"}}]}}
        ]}
    }"#;

    #[test]
    fn preview_keeps_first_three_non_empty_paragraphs() {
        let doc: Document = serde_json::from_str(FIXTURE).unwrap();
        assert_eq!(
            format_document(&doc),
            "*Document:* Quarterly plan\n\nGoals for Q4\nHire two engineers\nShip v2"
        );
    }

    #[test]
    fn document_without_text_has_placeholder() {
        let doc: Document = serde_json::from_str(r#"{"body": {"content": []}}"#).unwrap();
        assert_eq!(format_document(&doc), "*Document:* Untitled\n\nPreview not available.");
    }

    #[tokio::test]
    async fn missing_id_is_invalid() {
        let docs = Docs::new(Arc::new(GoogleClient::new(Some("tok".into()))));
        assert!(matches!(
            docs.query("  ").await,
            Err(IntegrationError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn fetches_document_by_id() {
        let app = Router::new().route(
            "/v1/documents/{id}",
            get(|Path(id): Path<String>| async move {
                assert_eq!(id, "doc-123");
                Json(serde_json::from_str::<serde_json::Value>(FIXTURE).unwrap())
            }),
        );
        let base = spawn_server(app).await;
        let google = Arc::new(GoogleClient::new(Some("tok".into())).with_base_url(base));

        let text = Docs::new(google).query("doc-123").await.unwrap();
        assert!(text.starts_with("*Document:* Quarterly plan"));
    }
}
