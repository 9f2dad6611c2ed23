use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Base URL used when neither the CLI flag, `PDFQA_API_URL`, nor the
/// config file names one.
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Answer text shown when the backend responds without one.
pub const NO_ANSWER_FALLBACK: &str = "No relevant answer found.";

/// A backend-held file resource. The backend owns these; the client only
/// caches the listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub upload_date: Option<String>,
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(rename = "Id")]
    id: String,
}

#[derive(Deserialize)]
struct AskResponse {
    #[serde(default)]
    answer: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// No usable response: connection refused, DNS failure, or an
    /// undecodable body.
    #[error("could not reach the backend: {0}")]
    Transport(#[from] reqwest::Error),
    /// The backend answered with a non-2xx status. `detail` comes from
    /// the JSON body when present.
    #[error("{detail}")]
    Backend { status: StatusCode, detail: String },
    /// The spawned request task died before producing a result.
    #[error("request task failed: {0}")]
    Task(String),
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// GET /files — the list of uploaded documents.
    pub async fn list_files(&self) -> Result<Vec<Document>, ApiError> {
        let url = format!("{}/files", self.base_url);
        let response = self.client.get(&url).send().await?;
        let response = into_backend_error(response).await?;
        Ok(response.json().await?)
    }

    /// POST /upload — multipart field `file`. Returns the new document id.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, ApiError> {
        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let url = format!("{}/upload", self.base_url);
        let response = self.client.post(&url).multipart(form).send().await?;
        let response = into_backend_error(response).await?;
        let payload: UploadResponse = response.json().await?;
        Ok(payload.id)
    }

    /// POST /ask — multipart fields `file_id` and `question`.
    pub async fn ask(&self, file_id: &str, question: &str) -> Result<String, ApiError> {
        let form = reqwest::multipart::Form::new()
            .text("file_id", file_id.to_string())
            .text("question", question.to_string());

        let url = format!("{}/ask", self.base_url);
        let response = self.client.post(&url).multipart(form).send().await?;
        let response = into_backend_error(response).await?;
        let payload: AskResponse = response.json().await?;
        Ok(answer_text(payload))
    }

    /// DELETE /files/{id}. A 2xx response needs no body.
    pub async fn delete_file(&self, file_id: &str) -> Result<(), ApiError> {
        let url = format!("{}/files/{}", self.base_url, file_id);
        let response = self.client.delete(&url).send().await?;
        into_backend_error(response).await?;
        Ok(())
    }
}

/// Map a non-2xx response to `ApiError::Backend`, pulling the `detail`
/// field out of the JSON body when there is one.
async fn into_backend_error(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<ErrorBody>(&body)
        .map(|b| b.detail)
        .unwrap_or_else(|_| {
            if body.is_empty() {
                format!("backend returned {}", status)
            } else {
                body
            }
        });

    log::debug!("backend error {status}: {detail}");
    Err(ApiError::Backend { status, detail })
}

fn answer_text(payload: AskResponse) -> String {
    match payload.answer {
        Some(answer) if !answer.is_empty() => answer,
        _ => NO_ANSWER_FALLBACK.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn answer_present_is_passed_through() {
        let payload: AskResponse = serde_json::from_str(r#"{"answer": "X is Y"}"#).unwrap();
        assert_eq!(answer_text(payload), "X is Y");
    }

    #[test]
    fn missing_answer_falls_back() {
        let payload: AskResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(answer_text(payload), NO_ANSWER_FALLBACK);
    }

    #[test]
    fn empty_answer_falls_back() {
        let payload: AskResponse = serde_json::from_str(r#"{"answer": ""}"#).unwrap();
        assert_eq!(answer_text(payload), NO_ANSWER_FALLBACK);
    }

    #[test]
    fn document_without_upload_date_deserializes() {
        let doc: Document = serde_json::from_str(r#"{"id": "a1", "name": "notes.pdf"}"#).unwrap();
        assert_eq!(doc.id, "a1");
        assert!(doc.upload_date.is_none());
    }

    #[test]
    fn file_listing_deserializes() {
        let docs: Vec<Document> = serde_json::from_str(
            r#"[{"id": "a1", "name": "notes.pdf", "upload_date": "2024-05-01 09:30:00"}]"#,
        )
        .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].upload_date.as_deref(), Some("2024-05-01 09:30:00"));
    }

    #[test]
    fn upload_response_uses_capitalized_id_key() {
        let payload: UploadResponse =
            serde_json::from_str(r#"{"message": "PDF uploaded successfully", "Id": "doc1"}"#)
                .unwrap();
        assert_eq!(payload.id, "doc1");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = BackendClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }
}
