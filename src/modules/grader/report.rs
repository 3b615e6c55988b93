use crate::escape_html;

use super::rubric::GradeResult;

const IMPROVEMENT_TIPS: [&str; 4] = [
    "建議增加文章篇幅，充實內容",
    "注意段落之間的銜接與過渡",
    "善用具體事例支撐論點或增添情感",
    "檢查錯別字與標點符號使用",
];

const DISCLAIMER: &str = "此為系統初步分析結果，僅供參考。實際評分請以專業教師判斷為準。";

/// Renders the grading report fragment shown under the form.
pub fn render_report(result: &GradeResult) -> String {
    let dimension_rows = result
        .dimensions
        .iter()
        .map(|entry| {
            format!(
                "                <tr>\n                    <td><strong>{dimension}</strong></td>\n                    <td>{remark}</td>\n                </tr>",
                dimension = escape_html(&entry.dimension),
                remark = escape_html(&entry.remark),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let tips = IMPROVEMENT_TIPS
        .iter()
        .map(|tip| format!("            <li>{tip}</li>"))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<div class="report">
        <h4>📊 基本資訊</h4>
        <table>
            <tr><th>評分標準</th><td>{exam_label}</td></tr>
            <tr><th>作文題目</th><td>{topic}</td></tr>
            <tr><th>字數統計</th><td>{char_count} 字</td></tr>
            <tr><th>段落數</th><td>{paragraph_count} 段</td></tr>
        </table>

        <h4>📝 四大面向評分</h4>
        <table>
            <thead>
                <tr><th>評分面向</th><th>評語</th></tr>
            </thead>
            <tbody>
{dimension_rows}
            </tbody>
        </table>

        <h4>🏆 評分結果</h4>
        <div class="report-grade">
            <div class="report-grade__label">{grade}</div>
            <div class="report-grade__score">{score} 分</div>
        </div>

        <h4>💡 改進建議</h4>
        <ul class="report-tips">
{tips}
        </ul>

        <div class="report-disclaimer"><strong>⚠️ 注意：</strong>{disclaimer}</div>
    </div>"#,
        exam_label = escape_html(&result.exam_label),
        topic = escape_html(&result.topic),
        char_count = result.char_count,
        paragraph_count = result.paragraph_count,
        grade = escape_html(&result.grade),
        score = result.score,
        disclaimer = DISCLAIMER,
    )
}

/// Plain-text rendering used by the copy-to-clipboard button.
pub fn render_plain_text(result: &GradeResult) -> String {
    let mut lines = vec![
        format!("評分標準：{}", result.exam_label),
        format!("作文題目：{}", result.topic),
        format!("字數統計：{} 字", result.char_count),
        format!("段落數：{} 段", result.paragraph_count),
        String::new(),
    ];
    lines.extend(
        result
            .dimensions
            .iter()
            .map(|entry| format!("{}：{}", entry.dimension, entry.remark)),
    );
    lines.push(String::new());
    lines.push(format!("評分結果：{}（{} 分）", result.grade, result.score));
    lines.join("\n")
}
