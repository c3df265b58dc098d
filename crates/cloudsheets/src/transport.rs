//! Remote API seams and their HTTP implementation.
//!
//! The facades only talk to [`SheetsApi`] and [`DriveApi`]. [`HttpTransport`]
//! implements both over reqwest with a bearer token on every request; tests
//! substitute in-memory implementations.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use cloudsheets_core::schema::{
    BatchGetValuesResponse, BatchUpdateSpreadsheetRequest, DriveFile, FileList, Spreadsheet,
};
use futures::StreamExt;
use reqwest::{RequestBuilder, Response, StatusCode};
use tokio::io::AsyncWriteExt;

use crate::auth::TokenSource;
use crate::config::ClientConfig;
use crate::error::{Error, ResourceKind, Result};

/// Fields requested for every file returned by the drive API
const FILE_FIELDS: &str = "id,name,mimeType,parents,resourceKey";

/// Spreadsheet half of the remote API.
#[async_trait]
pub trait SheetsApi: Send + Sync {
    /// Read a spreadsheet, restricted to `ranges` when not empty.
    ///
    /// Without grid data only the spreadsheet and sheet properties are returned.
    async fn get_spreadsheet(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
        include_grid_data: bool,
    ) -> Result<Spreadsheet>;

    /// Read the formatted values of several ranges at once.
    async fn batch_get_values(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<BatchGetValuesResponse>;

    /// Apply all operations of `request` atomically.
    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        request: &BatchUpdateSpreadsheetRequest,
    ) -> Result<()>;
}

/// File content sent along with new file metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    pub mime_type: String,
    pub body: Vec<u8>,
}

/// File-storage half of the remote API.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// Every file matching `query`, across all result pages.
    async fn list_files(&self, query: &str) -> Result<Vec<DriveFile>>;

    /// Create a file or folder, uploading `media` as its content if given.
    async fn create_file(&self, metadata: &DriveFile, media: Option<&Media>) -> Result<DriveFile>;

    /// Stream the content of `file_id` into `dest`, returning the bytes written.
    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<u64>;
}

/// reqwest-backed implementation of both remote APIs.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    tokens: Arc<dyn TokenSource>,
    config: ClientConfig,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client, tokens: Arc<dyn TokenSource>, config: ClientConfig) -> Self {
        Self {
            client,
            tokens,
            config,
        }
    }

    async fn send(
        &self,
        request: RequestBuilder,
        kind: ResourceKind,
        name: &str,
    ) -> Result<Response> {
        let token = self.tokens.access_token().await?;
        let response = request.bearer_auth(token).send().await?;
        check_status(response, kind, name).await
    }
}

/// Map a non-success status to [`Error::NotFound`] or [`Error::Remote`].
async fn check_status(response: Response, kind: ResourceKind, name: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::NOT_FOUND {
        return Err(Error::not_found(kind, name));
    }

    let message = response.text().await.unwrap_or_default();
    Err(Error::Remote {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl SheetsApi for HttpTransport {
    async fn get_spreadsheet(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
        include_grid_data: bool,
    ) -> Result<Spreadsheet> {
        let url = format!("{}/spreadsheets/{}", self.config.sheets_endpoint, spreadsheet_id);
        let mut query: Vec<(&str, &str)> = ranges.iter().map(|r| ("ranges", r.as_str())).collect();
        if include_grid_data {
            query.push(("includeGridData", "true"));
        } else {
            query.push(("fields", "spreadsheetId,properties,sheets.properties"));
        }

        tracing::debug!(spreadsheet_id, ?ranges, include_grid_data, "Reading spreadsheet");
        let request = self.client.get(url).query(&query);
        let response = self.send(request, ResourceKind::Spreadsheet, spreadsheet_id).await?;
        Ok(response.json().await?)
    }

    async fn batch_get_values(
        &self,
        spreadsheet_id: &str,
        ranges: &[String],
    ) -> Result<BatchGetValuesResponse> {
        let url = format!(
            "{}/spreadsheets/{}/values:batchGet",
            self.config.sheets_endpoint, spreadsheet_id
        );
        let query: Vec<(&str, &str)> = ranges.iter().map(|r| ("ranges", r.as_str())).collect();

        tracing::debug!(spreadsheet_id, ?ranges, "Reading values");
        let request = self.client.get(url).query(&query);
        let response = self.send(request, ResourceKind::Spreadsheet, spreadsheet_id).await?;
        Ok(response.json().await?)
    }

    async fn batch_update(
        &self,
        spreadsheet_id: &str,
        request: &BatchUpdateSpreadsheetRequest,
    ) -> Result<()> {
        let url = format!(
            "{}/spreadsheets/{}:batchUpdate",
            self.config.sheets_endpoint, spreadsheet_id
        );

        tracing::debug!(spreadsheet_id, operations = request.requests.len(), "Submitting batch update");
        let request = self.client.post(url).json(request);
        self.send(request, ResourceKind::Spreadsheet, spreadsheet_id).await?;
        Ok(())
    }
}

#[async_trait]
impl DriveApi for HttpTransport {
    async fn list_files(&self, query: &str) -> Result<Vec<DriveFile>> {
        let url = format!("{}/files", self.config.drive_endpoint);
        let fields = format!("nextPageToken,files({})", FILE_FIELDS);
        let mut files = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut params = vec![("q", query), ("fields", fields.as_str())];
            if let Some(token) = page_token.as_deref() {
                params.push(("pageToken", token));
            }

            tracing::debug!(query, page = ?page_token, "Listing files");
            let request = self.client.get(&url).query(&params);
            let response = self.send(request, ResourceKind::File, query).await?;
            let page: FileList = response.json().await?;

            files.extend(page.files);
            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => return Ok(files),
            }
        }
    }

    async fn create_file(&self, metadata: &DriveFile, media: Option<&Media>) -> Result<DriveFile> {
        let name = metadata.name.clone().unwrap_or_default();

        let request = match media {
            None => self
                .client
                .post(format!("{}/files", self.config.drive_endpoint))
                .query(&[("fields", FILE_FIELDS)])
                .json(metadata),
            Some(media) => {
                let boundary = format!("cloudsheets-{:016x}", rand::random::<u64>());
                let body = related_body(&boundary, &serde_json::to_vec(metadata)?, media);
                self.client
                    .post(format!("{}/files", self.config.upload_endpoint))
                    .query(&[("uploadType", "multipart"), ("fields", FILE_FIELDS)])
                    .header(
                        reqwest::header::CONTENT_TYPE,
                        format!("multipart/related; boundary={}", boundary),
                    )
                    .body(body)
            }
        };

        tracing::debug!(name = %name, upload = media.is_some(), "Creating file");
        let response = self.send(request, ResourceKind::File, &name).await?;
        Ok(response.json().await?)
    }

    async fn download_file(&self, file_id: &str, dest: &Path) -> Result<u64> {
        let url = format!("{}/files/{}", self.config.drive_endpoint, file_id);
        let request = self.client.get(url).query(&[("alt", "media")]);
        let response = self.send(request, ResourceKind::File, file_id).await?;

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0u64;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;

        tracing::debug!(file_id, bytes = written, dest = %dest.display(), "Downloaded file");
        Ok(written)
    }
}

/// Body of a `multipart/related` upload: the JSON metadata part, then the media part.
pub(crate) fn related_body(boundary: &str, metadata: &[u8], media: &Media) -> Vec<u8> {
    let mut body = Vec::with_capacity(metadata.len() + media.body.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", media.mime_type).as_bytes());
    body.extend_from_slice(&media.body);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());
    body
}
