use crate::web::templates::escape_html;

/// Shared CSS for the drag-and-drop upload widget and its preview pane.
pub const UPLOAD_WIDGET_STYLES: &str = r#"
.eg-upload-widget { display: flex; flex-direction: column; gap: 0.75rem; }
.eg-upload-widget__label { font-weight: 600; color: #0f172a; }
.eg-upload-widget__description { color: #475569; font-size: 0.95rem; margin: 0; }
.eg-upload-dropzone { border: 2px dashed #cbd5f5; border-radius: 12px; padding: 2rem; text-align: center; background: #f8fafc; color: #475569; transition: border-color 0.2s ease, background 0.2s ease; cursor: pointer; }
.eg-upload-dropzone strong { color: #1d4ed8; }
.eg-upload-dropzone[data-state="dragover"] { border-color: #2563eb; background: #e0f2fe; }
.eg-upload-note { color: #475569; font-size: 0.9rem; margin: 0.5rem 0 0; }
.eg-upload-browse { color: #2563eb; text-decoration: underline; cursor: pointer; }
.eg-upload-input { display: none; }
.eg-upload-status { min-height: 1.5rem; font-size: 0.95rem; color: #2563eb; }
.eg-upload-preview { display: flex; flex-direction: column; gap: 0.75rem; }
.eg-upload-page { border: 1px solid #e2e8f0; border-radius: 8px; background: #ffffff; padding: 0.75rem 1rem; }
.eg-upload-page h4 { margin: 0 0 0.5rem; font-size: 0.9rem; color: #475569; }
.eg-upload-page p { margin: 0; white-space: pre-wrap; line-height: 1.6; }
.eg-upload-page img { max-width: 100%; height: auto; border-radius: 6px; }
@media (max-width: 768px) {
    .eg-upload-dropzone { padding: 1.5rem 1rem; }
}
"#;

/// Vanilla JavaScript driving every widget on the page. When a widget has
/// `data-preview-url`, the chosen file is posted there and the extracted
/// pages are shown under the dropzone.
pub const UPLOAD_WIDGET_SCRIPT: &str = r#"<script>
(function() {
    function escapeHtml(value) {
        return String(value)
            .replace(/&/g, '&amp;')
            .replace(/</g, '&lt;')
            .replace(/>/g, '&gt;')
            .replace(/"/g, '&quot;')
            .replace(/'/g, '&#39;');
    }

    function renderPreview(previewEl, statusBox, doc) {
        const state = doc.status && doc.status.state;
        if (state === 'unsupported') {
            statusBox.textContent = '不支援的檔案格式。';
            previewEl.innerHTML = '';
            return;
        }
        if (state === 'failed') {
            statusBox.textContent = '無法讀取檔案內容。';
            previewEl.innerHTML = '';
            return;
        }
        const pages = (doc.pages || []).map((page) =>
            `<div class="eg-upload-page"><h4>第 ${page.page_number} 頁</h4><p>${escapeHtml(page.text)}</p></div>`);
        const images = (doc.images || []).map((image) =>
            `<div class="eg-upload-page"><h4>第 ${image.page_number} 頁</h4><img alt="第 ${image.page_number} 頁" src="data:${image.mime_type};base64,${image.data}"` +
            (image.width ? ` width="${image.width}"` : '') + `></div>`);
        previewEl.innerHTML = pages.concat(images).join('');
        if (pages.length === 0 && images.length === 0) {
            statusBox.textContent = '檔案中沒有可顯示的內容。';
        } else if (pages.length === 0) {
            statusBox.textContent = '檔案為圖片內容，僅供預覽，無法進行文字分析。';
        } else {
            statusBox.textContent = `已擷取 ${pages.length} 頁文字。`;
        }
    }

    function initWidget(widget) {
        if (widget.dataset.initialized === 'true') {
            return;
        }
        widget.dataset.initialized = 'true';

        const input = widget.querySelector('input[type="file"]');
        const dropzone = widget.querySelector('[data-dropzone]');
        const statusBox = widget.querySelector('[data-upload-status]');
        const previewEl = widget.querySelector('[data-upload-preview]');
        const browseEl = widget.querySelector('[data-upload-browse]');
        const previewUrl = widget.dataset.previewUrl;

        if (!input || !dropzone) {
            return;
        }

        async function preview(file) {
            if (!previewUrl || !previewEl) {
                return;
            }
            statusBox.textContent = '正在擷取內容...';
            const formData = new FormData();
            formData.append('file', file);
            try {
                const res = await fetch(previewUrl, { method: 'POST', body: formData });
                const data = await res.json();
                if (!res.ok) {
                    statusBox.textContent = data.message || '預覽失敗。';
                    previewEl.innerHTML = '';
                    return;
                }
                renderPreview(previewEl, statusBox, data);
            } catch (err) {
                statusBox.textContent = '預覽失敗：' + err.message;
            }
        }

        function handleSelection() {
            if (input.files.length === 0) {
                statusBox.textContent = '';
                if (previewEl) {
                    previewEl.innerHTML = '';
                }
                return;
            }
            const file = input.files[0];
            statusBox.textContent = `已選擇檔案：${file.name}`;
            preview(file);
        }

        input.addEventListener('change', handleSelection);
        widget.addEventListener('eg-upload-reset', () => {
            input.value = '';
            handleSelection();
        });

        const activateDrag = () => dropzone.dataset.state = 'dragover';
        const deactivateDrag = () => delete dropzone.dataset.state;

        dropzone.addEventListener('click', () => input.click());
        dropzone.addEventListener('dragenter', (event) => {
            event.preventDefault();
            activateDrag();
        });
        dropzone.addEventListener('dragover', (event) => {
            event.preventDefault();
        });
        dropzone.addEventListener('dragleave', (event) => {
            event.preventDefault();
            if (!dropzone.contains(event.relatedTarget)) {
                deactivateDrag();
            }
        });
        dropzone.addEventListener('drop', (event) => {
            event.preventDefault();
            deactivateDrag();
            if (event.dataTransfer.files.length > 0) {
                const dt = new DataTransfer();
                dt.items.add(event.dataTransfer.files[0]);
                input.files = dt.files;
                handleSelection();
            }
        });

        if (browseEl) {
            browseEl.addEventListener('click', (event) => {
                event.preventDefault();
                event.stopPropagation();
                input.click();
            });
        }
    }

    if (document.readyState === 'loading') {
        document.addEventListener('DOMContentLoaded', () => {
            document.querySelectorAll('.eg-upload-widget').forEach(initWidget);
        });
    } else {
        document.querySelectorAll('.eg-upload-widget').forEach(initWidget);
    }
})();
</script>"#;

/// Declarative configuration for rendering the upload widget snippet.
#[derive(Debug, Clone)]
pub struct UploadWidgetConfig<'a> {
    pub widget_id: &'a str,
    pub input_id: &'a str,
    pub field_name: &'a str,
    pub label: &'a str,
    pub description: Option<&'a str>,
    pub note: Option<&'a str>,
    pub accept: Option<&'a str>,
    pub preview_url: Option<&'a str>,
}

impl<'a> UploadWidgetConfig<'a> {
    pub fn new(widget_id: &'a str, input_id: &'a str, field_name: &'a str, label: &'a str) -> Self {
        Self {
            widget_id,
            input_id,
            field_name,
            label,
            description: None,
            note: None,
            accept: None,
            preview_url: None,
        }
    }

    pub fn with_description(mut self, text: &'a str) -> Self {
        self.description = Some(text);
        self
    }

    pub fn with_note(mut self, text: &'a str) -> Self {
        self.note = Some(text);
        self
    }

    pub fn with_accept(mut self, accept: &'a str) -> Self {
        self.accept = Some(accept);
        self
    }

    pub fn with_preview(mut self, url: &'a str) -> Self {
        self.preview_url = Some(url);
        self
    }
}

pub fn render_upload_widget(config: &UploadWidgetConfig<'_>) -> String {
    let description = config
        .description
        .map(|text| {
            format!(
                "<p class=\"eg-upload-widget__description\">{}</p>",
                escape_html(text)
            )
        })
        .unwrap_or_default();

    let note = config
        .note
        .map(|text| format!("<p class=\"eg-upload-note\">{}</p>", escape_html(text)))
        .unwrap_or_default();

    let accept_attr = config
        .accept
        .map(|value| format!(" accept=\"{}\"", escape_html(value)))
        .unwrap_or_default();

    let preview_attr = config
        .preview_url
        .map(|url| format!(" data-preview-url=\"{}\"", escape_html(url)))
        .unwrap_or_default();

    format!(
        r#"<div class="eg-upload-widget" id="{id}"{preview_attr}>
    <label class="eg-upload-widget__label" for="{input_id}">{label}</label>
    {description}
    <div class="eg-upload-dropzone" data-dropzone>
        <p><strong>拖曳檔案</strong>到此處，或<span class="eg-upload-browse" data-upload-browse>點擊選擇檔案</span></p>
        {note}
        <input class="eg-upload-input" id="{input_id}" name="{field_name}" type="file"{accept_attr}>
    </div>
    <div class="eg-upload-status" data-upload-status></div>
    <div class="eg-upload-preview" data-upload-preview></div>
</div>"#,
        id = escape_html(config.widget_id),
        preview_attr = preview_attr,
        input_id = escape_html(config.input_id),
        label = escape_html(config.label),
        description = description,
        note = note,
        field_name = escape_html(config.field_name),
        accept_attr = accept_attr,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widget_renders_field_and_preview_hook() {
        let html = render_upload_widget(
            &UploadWidgetConfig::new("essay-upload", "essay-file", "essay_file", "作文檔案")
                .with_accept(".pdf,.txt")
                .with_preview("/api/extract"),
        );
        assert!(html.contains(r#"name="essay_file""#));
        assert!(html.contains(r#"accept=".pdf,.txt""#));
        assert!(html.contains(r#"data-preview-url="/api/extract""#));
    }

    #[test]
    fn widget_without_preview_has_no_hook() {
        let html = render_upload_widget(
            &UploadWidgetConfig::new("topic-upload", "topic-file", "topic_file", "題目<檔案>")
                .with_note("僅供顯示"),
        );
        assert!(!html.contains("data-preview-url"));
        assert!(html.contains("題目&lt;檔案&gt;"));
        assert!(html.contains("僅供顯示"));
    }
}
