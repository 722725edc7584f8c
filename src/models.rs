use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The six fixed scoring categories. Declaration order matters: it is the
/// display order and the tie-breaker when ranking categories by average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Engagement,
    ObjectionHandling,
    InformationGathering,
    ProgramExplanation,
    ClosingSkills,
    Effectiveness,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Engagement,
        Category::ObjectionHandling,
        Category::InformationGathering,
        Category::ProgramExplanation,
        Category::ClosingSkills,
        Category::Effectiveness,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Category::Engagement => "Engagement",
            Category::ObjectionHandling => "Objection Handling",
            Category::InformationGathering => "Information Gathering",
            Category::ProgramExplanation => "Program Explanation",
            Category::ClosingSkills => "Closing Skills",
            Category::Effectiveness => "Effectiveness",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Overall,
    Category(Category),
}

impl Metric {
    pub const ALL: [Metric; 7] = [
        Metric::Overall,
        Metric::Category(Category::Engagement),
        Metric::Category(Category::ObjectionHandling),
        Metric::Category(Category::InformationGathering),
        Metric::Category(Category::ProgramExplanation),
        Metric::Category(Category::ClosingSkills),
        Metric::Category(Category::Effectiveness),
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Metric::Overall => "Overall Performance",
            Metric::Category(category) => category.label(),
        }
    }
}

/// Lifecycle of a call record. `Empty` covers rows whose status string is
/// missing or unrecognized; they render as placeholders and never aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallStatus {
    Empty,
    Pending,
    Completed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scores {
    #[serde(rename = "Engagement")]
    pub engagement: i64,
    #[serde(rename = "Objection Handling")]
    pub objection_handling: i64,
    #[serde(rename = "Information Gathering")]
    pub information_gathering: i64,
    #[serde(rename = "Program Explanation")]
    pub program_explanation: i64,
    #[serde(rename = "Closing Skills")]
    pub closing_skills: i64,
    #[serde(rename = "Effectiveness")]
    pub effectiveness: i64,
}

impl Scores {
    pub fn get(&self, category: Category) -> i64 {
        match category {
            Category::Engagement => self.engagement,
            Category::ObjectionHandling => self.objection_handling,
            Category::InformationGathering => self.information_gathering,
            Category::ProgramExplanation => self.program_explanation,
            Category::ClosingSkills => self.closing_skills,
            Category::Effectiveness => self.effectiveness,
        }
    }

    pub fn total(&self) -> i64 {
        Category::ALL.iter().map(|c| self.get(*c)).sum()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScoreNarratives {
    pub engagement_text: Option<String>,
    pub objection_handling_text: Option<String>,
    pub information_gathering_text: Option<String>,
    pub program_explanation_text: Option<String>,
    pub closing_skills_text: Option<String>,
    pub effectiveness_text: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LanguageMetrics {
    pub user_talk_percentage: f64,
    pub bot_talk_percentage: f64,
    pub monologues_time: String,
    pub response_time: String,
    pub turn_switches: i64,
    pub speaking_pace: f64,
    pub average_sentence_length: f64,
    pub filler_words_percentage: f64,
    pub filler_words_used: String,
    pub most_used_phrases: String,
    pub listening_skills_score: i64,
    pub listening_skills_analysis: String,
}

/// Canonical in-memory call record, produced by the normalizer. Every field
/// is defaulted; nothing here is optional unless absence is meaningful.
#[derive(Debug, Clone, Serialize)]
pub struct CallRecord {
    pub id: i64,
    pub call_number: i64,
    pub member_id: String,
    pub team_id: String,
    pub session_id: String,
    pub bot_name: String,
    pub bot_picture: String,
    pub user_name: String,
    pub user_picture: String,
    #[serde(skip)]
    pub timestamp: Option<NaiveDateTime>,
    pub date_label: String,
    pub duration_label: String,
    pub duration_seconds: Option<f64>,
    pub status: CallStatus,
    pub scores: Scores,
    /// Denormalized average from the store; display fallback only, the
    /// recomputed overall score is authoritative.
    pub stored_average: Option<f64>,
    pub narratives: ScoreNarratives,
    pub power_moment: Option<String>,
    pub key_wins: Option<String>,
    pub areas_for_growth: Option<String>,
    pub call_notes: Option<String>,
    pub managers_feedback: Option<String>,
    pub call_recording: Option<String>,
    pub call_transcript: Option<String>,
    pub notes_score: i64,
    pub language: LanguageMetrics,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartPoint {
    pub label: String,
    pub value: i64,
}

/// Ordered per-call values for one metric, oldest call first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub metric: String,
    pub points: Vec<ChartPoint>,
}

#[derive(Debug)]
pub struct Page<'a, T> {
    pub items: &'a [T],
    pub page: usize,
    pub total_pages: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Number(usize),
    Ellipsis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Bot,
    User,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Utterance {
    pub speaker: Speaker,
    pub content: String,
}
