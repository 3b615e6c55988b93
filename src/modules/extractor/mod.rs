use std::{
    panic::{self, AssertUnwindSafe},
    path::Path,
};

use anyhow::{Result, anyhow};
use axum::{
    Json, Router,
    extract::Multipart,
    http::StatusCode,
    routing::post,
};
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use mime::Mime;
use serde::{Serialize, Serializer};
use tokio::task;
use tracing::{info, warn};

mod raster;
#[cfg(test)]
pub(crate) mod test_pdf;

use crate::web::{
    ApiError, AppState, FileFieldConfig, json_error, read_upload_form, upload_rejected,
};

/// Extensions the upload fields accept for essay and topic documents.
pub const DOCUMENT_EXTENSIONS: &[&str] = &[
    "pdf", "png", "jpg", "jpeg", "gif", "webp", "bmp", "txt",
];

pub fn router() -> Router<AppState> {
    Router::new().route("/api/extract", post(preview_document))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    Pdf,
    Image,
    PlainText,
    Unsupported,
}

impl DocumentKind {
    /// Detects the kind from the declared MIME type, falling back to the
    /// file extension when the type is missing or generic.
    pub fn detect(mime_type: Option<&str>, file_name: Option<&str>) -> Self {
        let from_mime = mime_type
            .and_then(|value| value.parse::<Mime>().ok())
            .map(|mime| Self::from_mime(&mime))
            .unwrap_or(DocumentKind::Unsupported);
        if from_mime != DocumentKind::Unsupported {
            return from_mime;
        }

        file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| Self::from_extension(&ext.to_ascii_lowercase()))
            .unwrap_or(DocumentKind::Unsupported)
    }

    fn from_mime(mime: &Mime) -> Self {
        match (mime.type_(), mime.subtype()) {
            (mime::APPLICATION, mime::PDF) => DocumentKind::Pdf,
            (mime::IMAGE, _) => DocumentKind::Image,
            (mime::TEXT, mime::PLAIN) => DocumentKind::PlainText,
            _ => DocumentKind::Unsupported,
        }
    }

    fn from_extension(ext: &str) -> Self {
        match ext {
            "pdf" => DocumentKind::Pdf,
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "bmp" => DocumentKind::Image,
            "txt" => DocumentKind::PlainText,
            _ => DocumentKind::Unsupported,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExtractionStatus {
    /// Text came from the PDF text layer.
    TextLayer,
    /// No text layer; pages were returned as images.
    Rasterized,
    /// An image upload, passed through untouched.
    ImagePassthrough,
    PlainText,
    /// Decoded fine but nothing usable came out.
    Empty,
    Unsupported,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageImage {
    pub page_number: u32,
    pub mime_type: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
    #[serde(serialize_with = "serialize_base64")]
    pub data: Vec<u8>,
}

fn serialize_base64<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&BASE64.encode(data))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractedDocument {
    pub kind: DocumentKind,
    pub status: ExtractionStatus,
    pub pages: Vec<PageText>,
    pub images: Vec<PageImage>,
}

/// What the grader can do with an extracted document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzableText {
    Text(String),
    /// The content is an image; there is no text to analyze.
    ImageOnly,
    Empty,
}

impl ExtractedDocument {
    fn empty(kind: DocumentKind, status: ExtractionStatus) -> Self {
        Self {
            kind,
            status,
            pages: Vec::new(),
            images: Vec::new(),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self.status, ExtractionStatus::Failed { .. })
    }

    pub fn analyzable_text(&self) -> AnalyzableText {
        let text = self
            .pages
            .iter()
            .map(|page| page.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n");
        if !text.is_empty() {
            AnalyzableText::Text(text)
        } else if !self.images.is_empty() {
            AnalyzableText::ImageOnly
        } else {
            AnalyzableText::Empty
        }
    }
}

/// Turns an uploaded document into per-page text or per-page images.
///
/// Decoding runs on the blocking pool. Errors never escape: a broken
/// document comes back empty with a `Failed` status.
pub async fn extract(
    bytes: Vec<u8>,
    mime_type: Option<&str>,
    file_name: Option<&str>,
) -> ExtractedDocument {
    let kind = DocumentKind::detect(mime_type, file_name);
    let declared_mime = mime_type.unwrap_or_default().to_string();

    let document = match kind {
        DocumentKind::Pdf => extract_pdf_blocking(bytes).await,
        DocumentKind::Image => image_passthrough(bytes, declared_mime, file_name),
        DocumentKind::PlainText => plain_text(&bytes),
        DocumentKind::Unsupported => {
            info!(mime = %declared_mime, file_name = ?file_name, "unsupported document format");
            ExtractedDocument::empty(kind, ExtractionStatus::Unsupported)
        }
    };

    info!(
        kind = ?document.kind,
        status = ?document.status,
        page_count = document.pages.len(),
        image_count = document.images.len(),
        "document extraction finished"
    );
    document
}

async fn extract_pdf_blocking(bytes: Vec<u8>) -> ExtractedDocument {
    let outcome = task::spawn_blocking(move || extract_pdf(&bytes))
        .await
        .unwrap_or_else(|err| Err(anyhow!("PDF decoder aborted: {err}")));

    match outcome {
        Ok(document) => document,
        Err(err) => {
            warn!(?err, "PDF extraction failed");
            ExtractedDocument::empty(
                DocumentKind::Pdf,
                ExtractionStatus::Failed {
                    reason: err.to_string(),
                },
            )
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<ExtractedDocument> {
    let text_layer = read_text_layer(bytes);
    if let Ok(pages) = &text_layer {
        if pages.iter().any(|page| !page.text.is_empty()) {
            return Ok(ExtractedDocument {
                kind: DocumentKind::Pdf,
                status: ExtractionStatus::TextLayer,
                pages: text_layer?,
                images: Vec::new(),
            });
        }
    }

    // Also reached when the text layer is unreadable.
    let images = match raster::page_images(bytes) {
        Ok(images) => images,
        Err(raster_err) => return Err(text_layer.err().unwrap_or(raster_err)),
    };
    if !images.is_empty() {
        return Ok(ExtractedDocument {
            kind: DocumentKind::Pdf,
            status: ExtractionStatus::Rasterized,
            pages: Vec::new(),
            images,
        });
    }

    text_layer?;
    Ok(ExtractedDocument::empty(
        DocumentKind::Pdf,
        ExtractionStatus::Empty,
    ))
}

fn read_text_layer(bytes: &[u8]) -> Result<Vec<PageText>> {
    let raw_pages = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(bytes)
    }))
    .map_err(|_| anyhow!("PDF text decoder panicked"))?
    .map_err(|err| anyhow!("failed to extract PDF text: {err}"))?;

    Ok(raw_pages
        .iter()
        .enumerate()
        .map(|(index, raw)| PageText {
            page_number: index as u32 + 1,
            text: join_tokens(raw),
        })
        .collect())
}

fn join_tokens(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn image_passthrough(
    bytes: Vec<u8>,
    declared_mime: String,
    file_name: Option<&str>,
) -> ExtractedDocument {
    if bytes.is_empty() {
        return ExtractedDocument::empty(DocumentKind::Image, ExtractionStatus::Empty);
    }
    let mime_type = if declared_mime.starts_with("image/") {
        declared_mime
    } else {
        image_mime_from_name(file_name).to_string()
    };
    ExtractedDocument {
        kind: DocumentKind::Image,
        status: ExtractionStatus::ImagePassthrough,
        pages: Vec::new(),
        images: vec![PageImage {
            page_number: 1,
            mime_type,
            width: None,
            height: None,
            data: bytes,
        }],
    }
}

fn image_mime_from_name(file_name: Option<&str>) -> &'static str {
    let ext = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "image/jpeg",
    }
}

fn plain_text(bytes: &[u8]) -> ExtractedDocument {
    let decoded = String::from_utf8_lossy(bytes);
    let text = decoded.trim_start_matches('\u{feff}').to_string();
    if text.trim().is_empty() {
        return ExtractedDocument::empty(DocumentKind::PlainText, ExtractionStatus::Empty);
    }
    ExtractedDocument {
        kind: DocumentKind::PlainText,
        status: ExtractionStatus::PlainText,
        pages: vec![PageText {
            page_number: 1,
            text,
        }],
        images: Vec::new(),
    }
}

async fn preview_document(
    multipart: Multipart,
) -> Result<Json<ExtractedDocument>, ApiError> {
    let config = FileFieldConfig::new("file", DOCUMENT_EXTENSIONS, 1).with_min_files(1);
    let mut upload = read_upload_form(multipart, &[config])
        .await
        .map_err(|err| upload_rejected(&err))?;

    let file = upload
        .take_first_file("file")
        .ok_or_else(|| json_error(StatusCode::BAD_REQUEST, "請選擇要預覽的檔案。"))?;

    let document = extract(
        file.bytes,
        file.content_type.as_deref(),
        Some(&file.original_name),
    )
    .await;
    Ok(Json(document))
}
