// Several types and conversions are public API for embedding the engine but
// not exercised by every CLI path
#![allow(dead_code)]

use serde::{Deserialize, Serialize};

// Skill areas the interviewer draws questions from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    BasicFormulas,
    LookupFunctions,
    DataAnalysis,
    AdvancedFormulas,
    DataManipulation,
    ScenarioBased,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::BasicFormulas,
        Category::LookupFunctions,
        Category::DataAnalysis,
        Category::AdvancedFormulas,
        Category::DataManipulation,
        Category::ScenarioBased,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::BasicFormulas => "basic_formulas",
            Category::LookupFunctions => "lookup_functions",
            Category::DataAnalysis => "data_analysis",
            Category::AdvancedFormulas => "advanced_formulas",
            Category::DataManipulation => "data_manipulation",
            Category::ScenarioBased => "scenario_based",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "basic_formulas" => Some(Category::BasicFormulas),
            "lookup_functions" => Some(Category::LookupFunctions),
            "data_analysis" => Some(Category::DataAnalysis),
            "advanced_formulas" => Some(Category::AdvancedFormulas),
            "data_manipulation" => Some(Category::DataManipulation),
            "scenario_based" => Some(Category::ScenarioBased),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::BasicFormulas => "Basic Formulas",
            Category::LookupFunctions => "Lookup Functions",
            Category::DataAnalysis => "Data Analysis",
            Category::AdvancedFormulas => "Advanced Formulas",
            Category::DataManipulation => "Data Manipulation",
            Category::ScenarioBased => "Scenario Based",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Difficulty {
    Basic,
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [
        Difficulty::Basic,
        Difficulty::Intermediate,
        Difficulty::Advanced,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Basic => "basic",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Advanced => "advanced",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "basic" | "b" => Some(Difficulty::Basic),
            "intermediate" | "i" => Some(Difficulty::Intermediate),
            "advanced" | "a" => Some(Difficulty::Advanced),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Difficulty::Basic => "Basic",
            Difficulty::Intermediate => "Intermediate",
            Difficulty::Advanced => "Advanced",
        }
    }
}

// Target role the assessment is tuned for. Unrecognized input maps to
// General rather than failing, so a typo'd role still gets an interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    Finance,
    Operations,
    DataAnalytics,
    General,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Finance => "finance",
            Role::Operations => "operations",
            Role::DataAnalytics => "data_analytics",
            Role::General => "general",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "finance" => Role::Finance,
            "operations" | "ops" => Role::Operations,
            "data_analytics" | "analytics" => Role::DataAnalytics,
            _ => Role::General,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Finance => "Finance",
            Role::Operations => "Operations",
            Role::DataAnalytics => "Data Analytics",
            Role::General => "General",
        }
    }

    // Minimum overall score for a conditional hire
    pub fn hiring_threshold(&self) -> f64 {
        match self {
            Role::Finance => 75.0,
            Role::Operations => 70.0,
            Role::DataAnalytics => 80.0,
            Role::General => 70.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QuestionKind {
    Formula,
    Concept,
}

impl QuestionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionKind::Formula => "formula",
            QuestionKind::Concept => "concept",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "formula" => Some(QuestionKind::Formula),
            "concept" => Some(QuestionKind::Concept),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Origin {
    Curated,
    Generated,
}

impl Origin {
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Curated => "curated",
            Origin::Generated => "generated",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "curated" => Some(Origin::Curated),
            "generated" => Some(Origin::Generated),
            _ => None,
        }
    }
}

// One recorded use of a question: the score it produced and when
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub score: u32,
    pub timestamp: String,
    pub outcome: Option<String>,
}

// A full question record. The effectiveness fields (usage_count, avg_score,
// effectiveness, history) are owned by the QuestionStore; everything else is
// fixed at creation. Invariant: usage_count == history.len().
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: i64,
    pub text: String,
    pub kind: QuestionKind,
    pub category: Category,
    pub difficulty: Difficulty,
    pub keywords: Vec<String>,
    pub origin: Origin,
    pub created_at: String,
    pub usage_count: u32,
    pub avg_score: f64,
    pub effectiveness: f64,
    pub history: Vec<PerformanceSample>,
}

// Which evaluation path produced an Evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EvaluationSource {
    FullAi,
    TextParse,
    RuleBased,
}

impl EvaluationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluationSource::FullAi => "full_ai",
            EvaluationSource::TextParse => "text_fallback_parse",
            EvaluationSource::RuleBased => "rule_based_fallback",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "full_ai" => Some(EvaluationSource::FullAi),
            "text_fallback_parse" => Some(EvaluationSource::TextParse),
            "rule_based_fallback" => Some(EvaluationSource::RuleBased),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthBand {
    Minimal,
    Brief,
    Detailed,
}

impl LengthBand {
    pub fn as_str(&self) -> &'static str {
        match self {
            LengthBand::Minimal => "minimal",
            LengthBand::Brief => "brief",
            LengthBand::Detailed => "detailed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseLength {
    pub words: usize,
    pub characters: usize,
    pub quality: LengthBand,
}

impl ResponseLength {
    pub fn of(answer: &str) -> Self {
        let words = answer.split_whitespace().count();
        let characters = answer.trim().len();
        let quality = if words > 20 {
            LengthBand::Detailed
        } else if words > 5 {
            LengthBand::Brief
        } else {
            LengthBand::Minimal
        };
        Self {
            words,
            characters,
            quality,
        }
    }
}

// One answer's assessment. Immutable once created; owned by the session
// that produced it. question_id is a back-reference, not an ownership link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evaluation {
    pub question_id: i64,
    pub score: u32,
    pub technical_accuracy: u32,
    pub depth: u32,
    pub practical_application: u32,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub feedback: String,
    pub source: EvaluationSource,
    pub response_length: ResponseLength,
    pub timestamp: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub question_id: i64,
    pub response: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    InProgress,
    Paused,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::InProgress => "in_progress",
            SessionStatus::Paused => "paused",
            SessionStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "in_progress" => Some(SessionStatus::InProgress),
            "paused" => Some(SessionStatus::Paused),
            "completed" => Some(SessionStatus::Completed),
            _ => None,
        }
    }
}

// A single interview: a fixed question sequence plus the answers and
// evaluations collected so far. cursor indexes the next unanswered question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSession {
    pub id: String,
    pub role: Role,
    pub questions: Vec<Question>,
    pub responses: Vec<ResponseRecord>,
    pub evaluations: Vec<Evaluation>,
    pub cursor: usize,
    pub status: SessionStatus,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub paused_at: Option<String>,
    pub resumed_at: Option<String>,
}

impl InterviewSession {
    pub fn current_question(&self) -> Option<&Question> {
        self.questions.get(self.cursor)
    }

    pub fn total_questions(&self) -> usize {
        self.questions.len()
    }

    pub fn progress_percentage(&self) -> f64 {
        if self.questions.is_empty() {
            return 0.0;
        }
        (self.cursor as f64 / self.questions.len() as f64) * 100.0
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.questions.len()
    }
}

// JSON output wrapper for CLI
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}
