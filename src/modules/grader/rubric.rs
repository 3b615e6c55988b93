use serde::{Deserialize, Serialize};

use super::essay::{EssayInput, TopicInput};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExamType {
    #[serde(rename = "gsat-intellectual")]
    GsatIntellectual,
    #[serde(rename = "gsat-emotional")]
    GsatEmotional,
    #[serde(rename = "cap")]
    Cap,
}

impl ExamType {
    pub const ALL: [ExamType; 3] = [
        ExamType::GsatIntellectual,
        ExamType::GsatEmotional,
        ExamType::Cap,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ExamType::GsatIntellectual => "gsat-intellectual",
            ExamType::GsatEmotional => "gsat-emotional",
            ExamType::Cap => "cap",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ExamType::GsatIntellectual => "學測知性題",
            ExamType::GsatEmotional => "學測情意題",
            ExamType::Cap => "會考作文",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        Self::ALL.into_iter().find(|exam| exam.key() == value)
    }

    fn ladder(self) -> &'static [LadderRow] {
        match self {
            ExamType::Cap => CAP_LADDER,
            ExamType::GsatIntellectual | ExamType::GsatEmotional => GSAT_LADDER,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum ScoreRule {
    Fixed(u8),
    ByExam { emotional: u8, intellectual: u8 },
}

impl ScoreRule {
    fn resolve(self, exam_type: ExamType) -> u8 {
        match self {
            ScoreRule::Fixed(score) => score,
            ScoreRule::ByExam {
                emotional,
                intellectual,
            } => {
                if exam_type == ExamType::GsatEmotional {
                    emotional
                } else {
                    intellectual
                }
            }
        }
    }
}

#[derive(Debug)]
struct LadderRow {
    min_chars: usize,
    min_paragraphs: usize,
    grade: &'static str,
    score: ScoreRule,
    remarks: [(&'static str, &'static str); 4],
}

impl LadderRow {
    fn matches(&self, essay: &EssayInput) -> bool {
        essay.char_count() >= self.min_chars && essay.paragraph_count() >= self.min_paragraphs
    }
}

// Rows are ordered strictest first; the last row of each ladder always matches.
const CAP_LADDER: &[LadderRow] = &[
    LadderRow {
        min_chars: 600,
        min_paragraphs: 4,
        grade: "Level 5",
        score: ScoreRule::Fixed(5),
        remarks: [
            ("立意取材", "能適當統整運用材料，闡述主旨"),
            ("結構組織", "結構完整，偶有轉折不流暢"),
            ("遣詞造句", "能正確使用語詞，文句通順"),
            ("錯別字格式標點", "少有錯誤"),
        ],
    },
    LadderRow {
        min_chars: 400,
        min_paragraphs: 3,
        grade: "Level 4",
        score: ScoreRule::Fixed(4),
        remarks: [
            ("立意取材", "尚能統整運用材料說明主旨"),
            ("結構組織", "大致完整，偶有不連貫"),
            ("遣詞造句", "文意尚清楚，有冗詞贅句"),
            ("錯別字格式標點", "有一些錯誤"),
        ],
    },
    LadderRow {
        min_chars: 200,
        min_paragraphs: 0,
        grade: "Level 3",
        score: ScoreRule::Fixed(3),
        remarks: [
            ("立意取材", "材料運用不甚適當"),
            ("結構組織", "結構鬆散"),
            ("遣詞造句", "用詞不太恰當"),
            ("錯別字格式標點", "有些錯誤造成理解困難"),
        ],
    },
    LadderRow {
        min_chars: 0,
        min_paragraphs: 0,
        grade: "Level 2",
        score: ScoreRule::Fixed(2),
        remarks: [
            ("立意取材", "發展有限"),
            ("結構組織", "結構不完整"),
            ("遣詞造句", "遣詞造句常有錯誤"),
            ("錯別字格式標點", "錯別字頗多"),
        ],
    },
];

const GSAT_LADDER: &[LadderRow] = &[
    LadderRow {
        min_chars: 500,
        min_paragraphs: 4,
        grade: "A",
        score: ScoreRule::ByExam {
            emotional: 20,
            intellectual: 17,
        },
        remarks: [
            ("立意取材", "8/10 - 觀點明確，材料適切"),
            ("組織結構", "6/7.5 - 結構完整，脈絡分明"),
            ("遣詞造句", "5/6.25 - 文辭流暢"),
            ("標點錯字", "1/1.25 - 少有錯誤"),
        ],
    },
    LadderRow {
        min_chars: 300,
        min_paragraphs: 3,
        grade: "B+",
        score: ScoreRule::ByExam {
            emotional: 15,
            intellectual: 13,
        },
        remarks: [
            ("立意取材", "6/10 - 論述尚稱適當"),
            ("組織結構", "4.5/7.5 - 結構大致完整"),
            ("遣詞造句", "4/6.25 - 文辭通順"),
            ("標點錯字", "0.5/1.25 - 有些錯誤"),
        ],
    },
    LadderRow {
        min_chars: 150,
        min_paragraphs: 0,
        grade: "B",
        score: ScoreRule::ByExam {
            emotional: 12,
            intellectual: 10,
        },
        remarks: [
            ("立意取材", "4/10 - 論述平平"),
            ("組織結構", "3/7.5 - 結構尚可"),
            ("遣詞造句", "2.5/6.25 - 文辭平順"),
            ("標點錯字", "0.5/1.25 - 有些錯誤"),
        ],
    },
    LadderRow {
        min_chars: 0,
        min_paragraphs: 0,
        grade: "C+",
        score: ScoreRule::ByExam {
            emotional: 8,
            intellectual: 6,
        },
        remarks: [
            ("立意取材", "2/10 - 發展不足"),
            ("組織結構", "2/7.5 - 結構鬆散"),
            ("遣詞造句", "1.5/6.25 - 文辭欠通順"),
            ("標點錯字", "0.5/1.25 - 錯誤較多"),
        ],
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RubricRemark {
    pub dimension: String,
    pub remark: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GradeResult {
    pub exam_type: ExamType,
    pub exam_label: String,
    pub topic: String,
    pub char_count: usize,
    pub paragraph_count: usize,
    pub grade: String,
    pub score: u8,
    pub dimensions: Vec<RubricRemark>,
}

impl GradeResult {
    pub fn remark(&self, dimension: &str) -> Option<&str> {
        self.dimensions
            .iter()
            .find(|entry| entry.dimension == dimension)
            .map(|entry| entry.remark.as_str())
    }
}

/// Classifies an essay by length and paragraph count.
///
/// The topic is carried through for display only. The same inputs always
/// produce the same result.
pub fn grade(exam_type: ExamType, essay: &EssayInput, topic: &TopicInput) -> GradeResult {
    let ladder = exam_type.ladder();
    let row = ladder
        .iter()
        .find(|row| row.matches(essay))
        .unwrap_or(&ladder[ladder.len() - 1]);

    GradeResult {
        exam_type,
        exam_label: exam_type.label().to_string(),
        topic: topic.descriptor(),
        char_count: essay.char_count(),
        paragraph_count: essay.paragraph_count(),
        grade: row.grade.to_string(),
        score: row.score.resolve(exam_type),
        dimensions: row
            .remarks
            .iter()
            .map(|(dimension, remark)| RubricRemark {
                dimension: dimension.to_string(),
                remark: remark.to_string(),
            })
            .collect(),
    }
}
