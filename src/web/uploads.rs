use std::{
    collections::{HashMap, HashSet},
    path::Path,
};

use axum::extract::Multipart;

/// Result type used by the shared upload helpers.
pub type UploadResult<T> = Result<T, UploadError>;

/// Error returned when validating or reading uploaded files.
#[derive(Debug)]
pub struct UploadError {
    message: String,
}

impl UploadError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for UploadError {}

/// Configuration describing the expectations for a single multipart file field.
#[derive(Debug, Clone, Copy)]
pub struct FileFieldConfig<'a> {
    pub field_name: &'a str,
    pub allowed_extensions: &'a [&'a str],
    pub max_files: usize,
    pub min_files: usize,
}

impl<'a> FileFieldConfig<'a> {
    pub fn new(field_name: &'a str, allowed_extensions: &'a [&'a str], max_files: usize) -> Self {
        Self {
            field_name,
            allowed_extensions,
            max_files,
            min_files: 0,
        }
    }

    pub fn with_min_files(mut self, min_files: usize) -> Self {
        self.min_files = min_files;
        self
    }
}

/// A file read fully into memory. Nothing is written to disk.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub field_name: String,
    pub original_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Aggregated output of the shared upload reader.
#[derive(Debug, Default)]
pub struct UploadOutcome {
    pub files: Vec<UploadedFile>,
    pub text_fields: HashMap<String, Vec<String>>,
}

impl UploadOutcome {
    pub fn take_first_file(&mut self, field_name: &str) -> Option<UploadedFile> {
        let index = self
            .files
            .iter()
            .position(|file| file.field_name == field_name)?;
        Some(self.files.remove(index))
    }

    pub fn first_text(&self, field_name: &str) -> Option<&str> {
        self.text_fields
            .get(field_name)
            .and_then(|values| values.first().map(|s| s.as_str()))
    }
}

/// Parses multipart form data, keeping text fields and buffering files
/// that match one of the provided configurations.
///
/// File inputs left empty by the browser (no name, no bytes) are skipped.
pub async fn read_upload_form(
    mut multipart: Multipart,
    field_configs: &[FileFieldConfig<'_>],
) -> UploadResult<UploadOutcome> {
    let mut field_states: HashMap<&str, FieldState<'_>> = HashMap::new();
    for config in field_configs {
        if config.max_files == 0 {
            return Err(UploadError::new(format!(
                "欄位 `{}` 的 max_files 必須大於 0",
                config.field_name
            )));
        }
        if config.min_files > config.max_files {
            return Err(UploadError::new(format!(
                "欄位 `{}` 的 min_files 不能大於 max_files",
                config.field_name
            )));
        }
        field_states.insert(
            config.field_name,
            FieldState {
                config: *config,
                count: 0,
            },
        );
    }

    let allowed_lookup: HashMap<&str, HashSet<String>> = field_configs
        .iter()
        .map(|config| {
            let set = config
                .allowed_extensions
                .iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect();
            (config.field_name, set)
        })
        .collect();

    let mut outcome = UploadOutcome::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| UploadError::new(format!("解析上傳表單失敗: {err}")))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        let Some(file_name) = field.file_name().map(|name| name.to_string()) else {
            let value = field
                .text()
                .await
                .map_err(|err| UploadError::new(format!("讀取欄位 `{field_name}` 失敗: {err}")))?;
            outcome
                .text_fields
                .entry(field_name)
                .or_default()
                .push(value);
            continue;
        };

        let Some(state) = field_states.get_mut(field_name.as_str()) else {
            return Err(UploadError::new(format!(
                "不支援的檔案欄位: `{field_name}`"
            )));
        };

        let content_type = field.content_type().map(|value| value.to_string());
        let bytes = field
            .bytes()
            .await
            .map_err(|err| UploadError::new(format!("讀取上傳資料失敗: {err}")))?;

        if file_name.is_empty() && bytes.is_empty() {
            continue;
        }

        if state.count >= state.config.max_files {
            return Err(UploadError::new(format!(
                "欄位 `{}` 上傳檔案數量超過限制 (最多 {})",
                state.config.field_name, state.config.max_files
            )));
        }

        let extension = file_extension(&file_name);
        let accepted = allowed_lookup
            .get(state.config.field_name)
            .is_none_or(|allowed| allowed.is_empty() || allowed.contains(&extension));
        if !accepted {
            return Err(UploadError::new(format!(
                "欄位 `{}` 不支援 `{extension}` 檔案類型",
                state.config.field_name
            )));
        }

        outcome.files.push(UploadedFile {
            field_name: state.config.field_name.to_string(),
            original_name: display_name(&file_name, state.count, &extension),
            content_type,
            bytes: bytes.to_vec(),
        });

        state.count += 1;
    }

    for state in field_states.values() {
        if state.count < state.config.min_files {
            return Err(UploadError::new(format!(
                "欄位 `{}` 至少需要上傳 {} 個檔案",
                state.config.field_name, state.config.min_files
            )));
        }
    }

    Ok(outcome)
}

#[derive(Clone, Copy, Debug)]
struct FieldState<'a> {
    config: FileFieldConfig<'a>,
    count: usize,
}

fn file_extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

fn display_name(original: &str, index: usize, extension: &str) -> String {
    let sanitized = sanitize_filename::sanitize(original);
    if !sanitized.is_empty() {
        return sanitized;
    }
    if extension.is_empty() {
        format!("file_{index}")
    } else {
        format!("file_{index}.{extension}")
    }
}
