use std::borrow::Cow;

use chrono::{Datelike, Utc};

const TOOL_PAGE_BASE_STYLES: &str = r#"
        :root { color-scheme: light; }
        body { font-family: "Noto Sans TC", "PingFang TC", "Helvetica Neue", Arial, sans-serif; margin: 0; background: #f8fafc; color: #0f172a; }
        header { background: #ffffff; padding: 2rem 1.5rem; border-bottom: 1px solid #e2e8f0; }
        .header-bar { display: flex; justify-content: space-between; align-items: center; flex-wrap: wrap; gap: 1rem; }
        main { padding: 2rem 1.5rem; max-width: 960px; margin: 0 auto; box-sizing: border-box; }
        section { margin-bottom: 2.5rem; }
        .panel { background: #ffffff; border-radius: 12px; border: 1px solid #e2e8f0; padding: 1.5rem; box-shadow: 0 18px 40px rgba(15, 23, 42, 0.08); }
        .panel h2 { margin-top: 0; }
        label { display: block; margin-bottom: 0.5rem; font-weight: 600; color: #0f172a; }
        input[type="text"], textarea { width: 100%; padding: 0.75rem; border-radius: 8px; border: 1px solid #cbd5f5; background: #f8fafc; color: #0f172a; box-sizing: border-box; font: inherit; }
        input[type="text"]:focus, textarea:focus { outline: none; border-color: #2563eb; box-shadow: 0 0 0 3px rgba(37, 99, 235, 0.12); }
        textarea { min-height: 16rem; line-height: 1.7; resize: vertical; }
        button { padding: 0.85rem 1.2rem; border: none; border-radius: 8px; background: #2563eb; color: #ffffff; font-weight: 600; cursor: pointer; transition: background 0.15s ease; }
        button:hover { background: #1d4ed8; }
        button:disabled { opacity: 0.6; cursor: not-allowed; }
        button.secondary { background: #e2e8f0; color: #0f172a; }
        button.secondary:hover { background: #cbd5e1; }
        table { width: 100%; border-collapse: collapse; margin-top: 1.5rem; background: #ffffff; border: 1px solid #e2e8f0; border-radius: 12px; overflow: hidden; }
        th, td { padding: 0.75rem 1rem; border-bottom: 1px solid #e2e8f0; text-align: left; }
        th { background: #f1f5f9; color: #0f172a; font-weight: 600; }
        .status-box { margin-top: 1rem; padding: 1rem; border-radius: 12px; background: #f1f5f9; color: #0f172a; min-height: 3rem; }
        .status-box.error { color: #b91c1c; }
        .status-box.success { color: #166534; }
        .note { color: #475569; font-size: 0.95rem; line-height: 1.6; }
        .tool-tabs { display: flex; gap: 0.5rem; margin-bottom: 1rem; }
        .tab-toggle { background: #e2e8f0; color: #0f172a; }
        .tab-toggle.active { background: #2563eb; color: #ffffff; }
        .tab-section { display: none; }
        .tab-section.active { display: block; }
        .app-footer { margin-top: 3rem; text-align: center; font-size: 0.85rem; color: #94a3b8; }
        @media (max-width: 768px) {
            header { padding: 1.5rem 1rem; }
            main { padding: 1.5rem 1rem; }
            .header-bar { flex-direction: column; align-items: flex-start; }
            table { font-size: 0.9rem; }
            th, td { padding: 0.5rem; }
        }
"#;

const TAB_SCRIPT: &str = r#"<script>
document.querySelectorAll('.tool-tabs').forEach((tabs) => {
    const group = tabs.dataset.tabGroup;
    const container = document.querySelector(`[data-tab-container="${group}"]`);
    if (!container) {
        return;
    }
    tabs.querySelectorAll('.tab-toggle').forEach((button) => {
        button.addEventListener('click', () => {
            const target = button.dataset.tabTarget;
            tabs.querySelectorAll('.tab-toggle').forEach((b) => b.classList.toggle('active', b === button));
            container.querySelectorAll('.tab-section').forEach((panel) => {
                panel.classList.toggle('active', panel.dataset.tabPanel === target);
            });
            container.dataset.activeTab = target;
        });
    });
});
</script>"#;

pub struct TabPanel<'a> {
    pub key: &'a str,
    pub label: &'a str,
    pub html: Cow<'a, str>,
}

/// Renders toggle buttons plus their panels. The first panel starts active.
pub fn render_tab_group(group: &str, panels: &[TabPanel<'_>]) -> String {
    let buttons = panels
        .iter()
        .enumerate()
        .map(|(index, panel)| {
            format!(
                r#"<button type="button" class="tab-toggle{active}" data-tab-target="{key}">{label}</button>"#,
                active = if index == 0 { " active" } else { "" },
                key = escape_html(panel.key),
                label = escape_html(panel.label),
            )
        })
        .collect::<Vec<_>>()
        .join("\n            ");

    let sections = panels
        .iter()
        .enumerate()
        .map(|(index, panel)| {
            format!(
                r#"<div class="tab-section{active}" data-tab-panel="{key}">
{html}
            </div>"#,
                active = if index == 0 { " active" } else { "" },
                key = escape_html(panel.key),
                html = panel.html,
            )
        })
        .collect::<Vec<_>>()
        .join("\n            ");

    let first = panels.first().map(|panel| panel.key).unwrap_or_default();

    format!(
        r#"<div class="tool-tabs" data-tab-group="{group}">
            {buttons}
        </div>
        <div class="tab-container" data-tab-container="{group}" data-active-tab="{first}">
            {sections}
        </div>"#,
        group = escape_html(group),
        first = escape_html(first),
    )
}

pub struct ToolPageLayout<'a> {
    pub meta_title: &'a str,
    pub page_heading: &'a str,
    pub note_html: Cow<'a, str>,
    pub body_html: Cow<'a, str>,
    pub footer_html: Cow<'a, str>,
    pub extra_style_blocks: Vec<Cow<'a, str>>,
    pub body_scripts: Vec<Cow<'a, str>>,
}

pub fn render_tool_page(layout: ToolPageLayout<'_>) -> String {
    let ToolPageLayout {
        meta_title,
        page_heading,
        note_html,
        body_html,
        footer_html,
        extra_style_blocks,
        body_scripts,
    } = layout;

    let styles = std::iter::once(Cow::Borrowed(TOOL_PAGE_BASE_STYLES))
        .chain(extra_style_blocks)
        .map(|block| block.into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    let scripts = std::iter::once(Cow::Borrowed(TAB_SCRIPT))
        .chain(body_scripts)
        .map(|script| script.into_owned())
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html lang="zh-TW">
<head>
    <meta charset="UTF-8">
    <title>{meta_title}</title>
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <style>
{styles}
    </style>
</head>
<body>
    <header>
        <div class="header-bar">
            <h1>{page_heading}</h1>
        </div>
        <p class="note">{note_html}</p>
    </header>
    <main>
{body_html}
        {footer_html}
    </main>
{scripts}
</body>
</html>"#,
    )
}

pub fn render_footer() -> String {
    let current_year = Utc::now().year();
    format!(
        r#"<footer class="app-footer">© 2024-{year} 作文批改示範，評分結果僅供參考</footer>"#,
        year = current_year
    )
}

pub fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
