use serde::Serialize;

/// Normalized essay text together with the two metrics the rubric looks at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EssayInput {
    text: String,
    char_count: usize,
    paragraph_count: usize,
}

impl EssayInput {
    pub fn new(raw: &str) -> Self {
        let text = raw.trim().to_string();
        let char_count = text.chars().count();
        let paragraph_count = count_paragraphs(&text);
        Self {
            text,
            char_count,
            paragraph_count,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn char_count(&self) -> usize {
        self.char_count
    }

    pub fn paragraph_count(&self) -> usize {
        self.paragraph_count
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Counts runs of non-blank lines separated by at least one blank line.
fn count_paragraphs(text: &str) -> usize {
    let mut count = 0;
    let mut in_paragraph = false;
    for line in text.lines() {
        if line.trim().is_empty() {
            in_paragraph = false;
        } else if !in_paragraph {
            in_paragraph = true;
            count += 1;
        }
    }
    count
}

/// The essay topic. Shown in the report, never scored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TopicInput {
    Text(String),
    /// A topic document was uploaded but its content is not analyzed.
    Document { file_name: String },
    #[default]
    Absent,
}

impl TopicInput {
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            TopicInput::Absent
        } else {
            TopicInput::Text(trimmed.to_string())
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, TopicInput::Absent)
    }

    pub fn descriptor(&self) -> String {
        match self {
            TopicInput::Text(text) => text.clone(),
            TopicInput::Document { file_name } => {
                format!("（已上傳題目文件：{file_name}，未進行文字分析）")
            }
            TopicInput::Absent => "（未提供）".to_string(),
        }
    }
}
