use std::borrow::Cow;

use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    response::Html,
    routing::{get, post},
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

pub mod essay;
pub mod report;
pub mod rubric;

pub use essay::{EssayInput, TopicInput};
pub use rubric::{ExamType, GradeResult, grade};

use crate::modules::extractor::{
    self, AnalyzableText, DOCUMENT_EXTENSIONS, DocumentKind, ExtractionStatus,
};
use crate::web::{
    ApiError, AppState, FileFieldConfig, TabPanel, ToolPageLayout, UPLOAD_WIDGET_SCRIPT,
    UPLOAD_WIDGET_STYLES, UploadOutcome, UploadWidgetConfig, UploadedFile, json_error,
    read_upload_form, render_tab_group, render_tool_page, render_upload_widget, upload_rejected,
};
use crate::{escape_html, render_footer};

const ACCEPT_ATTR: &str = ".pdf,.png,.jpg,.jpeg,.gif,.webp,.bmp,.txt";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(grader_page))
        .route("/api/grade", post(submit_essay))
}

/// Raw form values as submitted, before any validation.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub exam_type: Option<String>,
    pub topic: Option<String>,
    pub topic_file: Option<UploadedFile>,
    pub essay: Option<String>,
    pub essay_file: Option<UploadedFile>,
}

impl SubmissionForm {
    fn from_upload(mut upload: UploadOutcome) -> Self {
        let text = |name: &str| upload.first_text(name).map(|value| value.to_string());
        let exam_type = text("exam_type");
        let topic = text("topic");
        let essay = text("essay");
        Self {
            exam_type,
            topic,
            essay,
            topic_file: upload.take_first_file("topic_file"),
            essay_file: upload.take_first_file("essay_file"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionError {
    MissingExamType,
    MissingTopic,
    MissingEssay,
    UnsupportedEssayFormat,
    ImageEssay,
    UnreadableEssay,
}

impl SubmissionError {
    pub fn message(self) -> &'static str {
        match self {
            SubmissionError::MissingExamType => "請選擇評分標準",
            SubmissionError::MissingTopic => "請輸入作文題目",
            SubmissionError::MissingEssay => "請輸入學生作文內容",
            SubmissionError::UnsupportedEssayFormat => "不支援的檔案格式",
            SubmissionError::ImageEssay => "圖片內容無法進行文字分析，請改為輸入文字或上傳 PDF",
            SubmissionError::UnreadableEssay => "無法從上傳的檔案取得文字",
        }
    }

    pub fn status(self) -> StatusCode {
        match self {
            SubmissionError::MissingExamType
            | SubmissionError::MissingTopic
            | SubmissionError::MissingEssay => StatusCode::BAD_REQUEST,
            SubmissionError::UnsupportedEssayFormat => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            SubmissionError::ImageEssay | SubmissionError::UnreadableEssay => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
        }
    }
}

impl std::fmt::Display for SubmissionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for SubmissionError {}

#[derive(Debug, Clone, Serialize)]
pub struct ExtractionSummary {
    pub file_name: String,
    pub kind: DocumentKind,
    pub status: ExtractionStatus,
    pub page_count: usize,
    pub image_count: usize,
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub result: GradeResult,
    pub extraction: Option<ExtractionSummary>,
}

#[derive(Serialize)]
struct GradeResponse {
    submission_id: Uuid,
    result: GradeResult,
    report_html: String,
    report_text: String,
    extraction: Option<ExtractionSummary>,
}

/// Validates a submission, extracts the essay file when needed, and grades.
pub async fn evaluate(form: SubmissionForm) -> Result<Evaluation, SubmissionError> {
    let exam_type = form
        .exam_type
        .as_deref()
        .and_then(ExamType::parse)
        .ok_or(SubmissionError::MissingExamType)?;

    let mut topic = TopicInput::from_text(form.topic.as_deref().unwrap_or_default());
    if topic.is_absent() {
        if let Some(file) = &form.topic_file {
            topic = TopicInput::Document {
                file_name: file.original_name.clone(),
            };
        }
    }
    if topic.is_absent() {
        return Err(SubmissionError::MissingTopic);
    }

    let typed = EssayInput::new(form.essay.as_deref().unwrap_or_default());
    let (essay, extraction) = if !typed.is_empty() {
        (typed, None)
    } else if let Some(file) = form.essay_file {
        let file_name = file.original_name;
        let document = extractor::extract(
            file.bytes,
            file.content_type.as_deref(),
            Some(&file_name),
        )
        .await;
        let summary = ExtractionSummary {
            file_name,
            kind: document.kind,
            status: document.status.clone(),
            page_count: document.pages.len(),
            image_count: document.images.len(),
        };

        if document.status == ExtractionStatus::Unsupported {
            return Err(SubmissionError::UnsupportedEssayFormat);
        }
        match document.analyzable_text() {
            AnalyzableText::Text(text) => (EssayInput::new(&text), Some(summary)),
            AnalyzableText::ImageOnly => return Err(SubmissionError::ImageEssay),
            AnalyzableText::Empty => {
                if document.is_failure() {
                    warn!(file_name = %summary.file_name, "essay document could not be decoded");
                }
                return Err(SubmissionError::UnreadableEssay);
            }
        }
    } else {
        return Err(SubmissionError::MissingEssay);
    };

    Ok(Evaluation {
        result: grade(exam_type, &essay, &topic),
        extraction,
    })
}

async fn submit_essay(
    multipart: Multipart,
) -> Result<Json<GradeResponse>, ApiError> {
    let submission_id = Uuid::new_v4();

    let file_configs = [
        FileFieldConfig::new("essay_file", DOCUMENT_EXTENSIONS, 1),
        FileFieldConfig::new("topic_file", DOCUMENT_EXTENSIONS, 1),
    ];
    let upload = read_upload_form(multipart, &file_configs)
        .await
        .map_err(|err| {
            warn!(%submission_id, error = %err, "rejected essay upload");
            upload_rejected(&err)
        })?;

    let evaluation = evaluate(SubmissionForm::from_upload(upload))
        .await
        .map_err(|err| {
            info!(%submission_id, reason = ?err, "essay submission rejected");
            json_error(err.status(), err.message())
        })?;

    let result = evaluation.result;
    info!(
        %submission_id,
        exam_type = result.exam_type.key(),
        char_count = result.char_count,
        paragraph_count = result.paragraph_count,
        grade = %result.grade,
        score = result.score,
        "essay graded"
    );

    Ok(Json(GradeResponse {
        submission_id,
        report_html: report::render_report(&result),
        report_text: report::render_plain_text(&result),
        result,
        extraction: evaluation.extraction,
    }))
}

pub async fn grader_page(State(state): State<AppState>) -> Html<String> {
    let max_upload_mb = state.config().max_upload_bytes / (1024 * 1024);

    let exam_options = ExamType::ALL
        .iter()
        .enumerate()
        .map(|(index, exam)| {
            format!(
                r#"<label class="exam-option"><input type="radio" name="exam_type" value="{key}"{checked}> {label}</label>"#,
                key = exam.key(),
                checked = if index == 0 { " checked" } else { "" },
                label = escape_html(exam.label()),
            )
        })
        .collect::<Vec<_>>()
        .join("\n                        ");

    let topic_widget = render_upload_widget(
        &UploadWidgetConfig::new("topic-upload", "topic-file", "topic_file", "或上傳題目文件")
            .with_note("題目文件僅供顯示，不進行文字分析。")
            .with_accept(ACCEPT_ATTR),
    );
    let essay_note = format!("支援 PDF、圖片或純文字檔，單次上傳上限 {max_upload_mb} MB。");
    let essay_widget = render_upload_widget(
        &UploadWidgetConfig::new("essay-upload", "essay-file", "essay_file", "作文檔案")
            .with_description("PDF 會擷取文字層；掃描檔或圖片僅供預覽。")
            .with_note(&essay_note)
            .with_accept(ACCEPT_ATTR)
            .with_preview("/api/extract"),
    );

    let essay_tabs = render_tab_group(
        "essay-source",
        &[
            TabPanel {
                key: "text",
                label: "直接輸入",
                html: Cow::Borrowed(
                    r#"                <label for="essay-content">學生作文內容</label>
                <textarea id="essay-content" name="essay" placeholder="請貼上或輸入學生作文，段落之間請空一行。"></textarea>
                <p class="note">目前字數：<span id="char-count">0</span> 字</p>"#,
                ),
            },
            TabPanel {
                key: "file",
                label: "上傳檔案",
                html: Cow::Owned(essay_widget),
            },
        ],
    );

    let body_html = format!(
        r#"        <section class="panel">
            <h2>提交作文</h2>
            <form id="grading-form">
                <fieldset class="exam-types">
                    <legend>評分標準</legend>
                        {exam_options}
                </fieldset>
                <label for="essay-topic">作文題目</label>
                <input type="text" id="essay-topic" name="topic" placeholder="請輸入作文題目">
                {topic_widget}
                <h3>作文內容</h3>
        {essay_tabs}
                <div class="form-actions">
                    <button type="submit">開始批改</button>
                    <button type="button" class="secondary" id="clear-form">清除</button>
                </div>
            </form>
            <div id="status-box" class="status-box">請填寫題目與作文內容。</div>
        </section>
        <section id="result-section" class="panel" style="display:none;">
            <div class="result-header">
                <h2>批改結果</h2>
                <button type="button" class="secondary" id="copy-result">複製結果</button>
            </div>
            <div id="result-content"></div>
        </section>
"#,
    );

    let extra_styles = Cow::Borrowed(
        r#"        .exam-types { border: none; padding: 0; margin: 0 0 1.5rem; display: flex; gap: 1.25rem; flex-wrap: wrap; }
        .exam-types legend { font-weight: 600; margin-bottom: 0.5rem; }
        .exam-option { display: inline-flex; align-items: center; gap: 0.35rem; font-weight: 500; }
        #essay-topic { margin-bottom: 1rem; }
        .form-actions { display: flex; gap: 0.75rem; margin-top: 1.5rem; }
        .result-header { display: flex; justify-content: space-between; align-items: center; }
        .report h4 { margin: 1.75rem 0 0.5rem; }
        .report-grade { text-align: center; padding: 2rem; background: #f8fafc; border-radius: 12px; margin-top: 1rem; }
        .report-grade__label { font-size: 3rem; font-weight: 700; color: #2563eb; margin-bottom: 0.5rem; }
        .report-grade__score { font-size: 1.5rem; color: #475569; }
        .report-tips { padding-left: 1.5rem; line-height: 1.8; }
        .report-disclaimer { margin-top: 2rem; padding: 1rem; background: #fef3c7; border-radius: 8px; border-left: 4px solid #f59e0b; }
"#,
    );

    let grader_script = r#"<script>
const form = document.getElementById('grading-form');
const essayContent = document.getElementById('essay-content');
const charCount = document.getElementById('char-count');
const statusBox = document.getElementById('status-box');
const resultSection = document.getElementById('result-section');
const resultContent = document.getElementById('result-content');
const essaySource = document.querySelector('[data-tab-container="essay-source"]');
let reportText = '';

const updateStatus = (message, kind) => {
    statusBox.textContent = message;
    statusBox.classList.remove('error', 'success');
    if (kind) {
        statusBox.classList.add(kind);
    }
};

essayContent.addEventListener('input', () => {
    charCount.textContent = Array.from(essayContent.value.trim()).length;
});

document.getElementById('clear-form').addEventListener('click', () => {
    form.reset();
    charCount.textContent = '0';
    document.querySelectorAll('.eg-upload-widget').forEach((widget) => {
        widget.dispatchEvent(new Event('eg-upload-reset'));
    });
    resultSection.style.display = 'none';
    resultContent.innerHTML = '';
    reportText = '';
    updateStatus('請填寫題目與作文內容。');
});

document.getElementById('copy-result').addEventListener('click', async () => {
    try {
        await navigator.clipboard.writeText(reportText || resultContent.innerText);
        updateStatus('已複製到剪貼簿！', 'success');
    } catch (err) {
        updateStatus('複製失敗：' + err.message, 'error');
    }
});

form.addEventListener('submit', async (event) => {
    event.preventDefault();
    const formData = new FormData(form);
    if (essaySource && essaySource.dataset.activeTab === 'file') {
        formData.delete('essay');
    } else {
        formData.delete('essay_file');
    }
    updateStatus('正在批改...');
    try {
        const res = await fetch('/api/grade', { method: 'POST', body: formData });
        const data = await res.json().catch(() => ({ message: '批改失敗' }));
        if (!res.ok) {
            updateStatus(data.message || '批改失敗', 'error');
            return;
        }
        resultContent.innerHTML = data.report_html;
        reportText = data.report_text;
        resultSection.style.display = 'block';
        updateStatus(`批改完成：${data.result.grade}（${data.result.score} 分）`, 'success');
        resultSection.scrollIntoView({ behavior: 'smooth', block: 'start' });
    } catch (err) {
        updateStatus('批改失敗：' + err.message, 'error');
    }
});
</script>"#;

    let html = render_tool_page(ToolPageLayout {
        meta_title: "作文批改示範 | 學測・會考評分",
        page_heading: "作文批改示範",
        note_html: Cow::Borrowed(
            "依學測（知性題、情意題）與會考作文評分標準，根據字數與段落結構提供初步等級與評語。",
        ),
        body_html: Cow::Owned(body_html),
        footer_html: Cow::Owned(render_footer()),
        extra_style_blocks: vec![Cow::Borrowed(UPLOAD_WIDGET_STYLES), extra_styles],
        body_scripts: vec![
            Cow::Borrowed(UPLOAD_WIDGET_SCRIPT),
            Cow::Borrowed(grader_script),
        ],
    });

    Html(html)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::modules::extractor::test_pdf;

    fn paragraphs(count: usize, total_chars: usize) -> String {
        let separators = 2 * (count - 1);
        let per = (total_chars - separators) / count;
        let mut parts: Vec<String> = (0..count).map(|_| "文".repeat(per)).collect();
        let remainder = total_chars - separators - per * count;
        parts[count - 1].push_str(&"文".repeat(remainder));
        parts.join("\n\n")
    }

    fn form(exam: &str, topic: &str, essay: &str) -> SubmissionForm {
        SubmissionForm {
            exam_type: Some(exam.to_string()),
            topic: Some(topic.to_string()),
            essay: Some(essay.to_string()),
            ..SubmissionForm::default()
        }
    }

    fn file(name: &str, content_type: &str, bytes: Vec<u8>) -> UploadedFile {
        UploadedFile {
            field_name: "essay_file".to_string(),
            original_name: name.to_string(),
            content_type: Some(content_type.to_string()),
            bytes,
        }
    }

    #[tokio::test]
    async fn competency_essay_end_to_end() {
        let evaluation = evaluate(form("cap", "我的志願", &paragraphs(5, 650)))
            .await
            .unwrap();
        assert_eq!(evaluation.result.char_count, 650);
        assert_eq!(evaluation.result.paragraph_count, 5);
        assert_eq!(evaluation.result.grade, "Level 5");
        assert_eq!(evaluation.result.score, 5);
        assert_eq!(evaluation.result.dimensions.len(), 4);
        assert!(evaluation.extraction.is_none());
    }

    #[tokio::test]
    async fn emotional_essay_end_to_end() {
        let evaluation = evaluate(form("gsat-emotional", "雨天", &"雨".repeat(140)))
            .await
            .unwrap();
        assert_eq!(evaluation.result.grade, "C+");
        assert_eq!(evaluation.result.score, 8);
    }

    #[tokio::test]
    async fn intellectual_essay_end_to_end() {
        let evaluation = evaluate(form("gsat-intellectual", "論誠信", &paragraphs(3, 320)))
            .await
            .unwrap();
        assert_eq!(evaluation.result.grade, "B+");
        assert_eq!(evaluation.result.score, 13);
    }

    #[tokio::test]
    async fn missing_fields_are_reported_in_order() {
        let mut missing_exam = form("", "題目", "內容");
        missing_exam.exam_type = None;
        assert_eq!(
            evaluate(missing_exam).await.unwrap_err(),
            SubmissionError::MissingExamType
        );
        assert_eq!(
            evaluate(form("ielts", "題目", "內容")).await.unwrap_err(),
            SubmissionError::MissingExamType
        );
        assert_eq!(
            evaluate(form("cap", "   ", "內容")).await.unwrap_err(),
            SubmissionError::MissingTopic
        );
        assert_eq!(
            evaluate(form("cap", "題目", " \n ")).await.unwrap_err(),
            SubmissionError::MissingEssay
        );
    }

    #[tokio::test]
    async fn topic_document_stands_in_for_topic_text() {
        let mut submission = form("cap", "", &"字".repeat(250));
        submission.topic_file = Some(UploadedFile {
            field_name: "topic_file".to_string(),
            original_name: "113會考題目.pdf".to_string(),
            content_type: Some("application/pdf".to_string()),
            bytes: vec![0; 8],
        });
        let evaluation = evaluate(submission).await.unwrap();
        assert!(evaluation.result.topic.contains("113會考題目.pdf"));
        assert_eq!(evaluation.result.grade, "Level 3");
    }

    #[tokio::test]
    async fn typed_text_wins_over_uploaded_file() {
        let mut submission = form("cap", "題目", &"字".repeat(210));
        submission.essay_file = Some(file("scan.png", "image/png", vec![1, 2, 3]));
        let evaluation = evaluate(submission).await.unwrap();
        assert!(evaluation.extraction.is_none());
        assert_eq!(evaluation.result.char_count, 210);
    }

    #[tokio::test]
    async fn essay_from_text_file_keeps_paragraphs() {
        let mut submission = form("gsat-intellectual", "論誠信", "");
        let body = paragraphs(4, 520);
        submission.essay_file = Some(file("essay.txt", "text/plain", body.into_bytes()));
        let evaluation = evaluate(submission).await.unwrap();
        assert_eq!(evaluation.result.paragraph_count, 4);
        assert_eq!(evaluation.result.grade, "A");
        assert_eq!(evaluation.result.score, 17);
        let summary = evaluation.extraction.unwrap();
        assert_eq!(summary.status, ExtractionStatus::PlainText);
        assert_eq!(summary.file_name, "essay.txt");
    }

    #[tokio::test]
    async fn essay_from_pdf_uses_text_layer() {
        let mut submission = form("gsat-emotional", "旅行", "");
        let bytes = test_pdf::text_pages(&["Once upon a time", "The end"]);
        submission.essay_file = Some(file("essay.pdf", "application/pdf", bytes));
        let evaluation = evaluate(submission).await.unwrap();
        assert_eq!(evaluation.result.paragraph_count, 2);
        assert_eq!(evaluation.result.grade, "C+");
        assert_eq!(evaluation.extraction.unwrap().page_count, 2);
    }

    #[tokio::test]
    async fn image_and_broken_files_are_rejected() {
        let mut image = form("cap", "題目", "");
        image.essay_file = Some(file("scan.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF]));
        assert_eq!(evaluate(image).await.unwrap_err(), SubmissionError::ImageEssay);

        let mut scanned = form("cap", "題目", "");
        scanned.essay_file = Some(file("scan.pdf", "application/pdf", test_pdf::image_only(2)));
        assert_eq!(evaluate(scanned).await.unwrap_err(), SubmissionError::ImageEssay);

        let mut compressed = form("cap", "題目", "");
        let bytes = test_pdf::flate_image_only(1);
        compressed.essay_file = Some(file("scan.pdf", "application/pdf", bytes));
        assert_eq!(evaluate(compressed).await.unwrap_err(), SubmissionError::ImageEssay);

        let mut broken = form("cap", "題目", "");
        broken.essay_file = Some(file("broken.pdf", "application/pdf", b"garbage".to_vec()));
        assert_eq!(
            evaluate(broken).await.unwrap_err(),
            SubmissionError::UnreadableEssay
        );

        let mut unsupported = form("cap", "題目", "");
        unsupported.essay_file = Some(file("essay.bin", "application/zip", vec![1]));
        assert_eq!(
            evaluate(unsupported).await.unwrap_err(),
            SubmissionError::UnsupportedEssayFormat
        );
    }

    #[test]
    fn submission_errors_map_to_client_statuses() {
        assert_eq!(SubmissionError::MissingTopic.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            SubmissionError::ImageEssay.status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(SubmissionError::MissingEssay.to_string(), "請輸入學生作文內容");
    }

    #[tokio::test]
    async fn page_offers_every_exam_type() {
        let Html(html) = grader_page(State(AppState::new(AppConfig::default()))).await;
        for exam in ExamType::ALL {
            assert!(html.contains(&format!(r#"value="{}""#, exam.key())));
            assert!(html.contains(exam.label()));
        }
        assert!(html.contains(r#"name="essay_file""#));
        assert!(html.contains("上限 20 MB"));
    }
}
