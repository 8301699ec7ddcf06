use chrono::Utc;

use crate::models::{Evaluation, EvaluationSource, Question, ResponseLength};

// Scores a free-text answer to one question. Implementations must always
// return a structurally valid Evaluation: whatever goes wrong internally
// (a remote model, a parse failure) is absorbed into a fallback path and
// only shows up in the Evaluation's source tag.
pub trait AnswerReviewer {
    fn review(&self, question: &Question, answer: &str) -> Evaluation;
}

const FUNCTION_TOKENS: &[&str] = &[
    "SUM", "AVERAGE", "VLOOKUP", "IF", "COUNT", "PIVOT", "INDEX", "MATCH",
];

// Deterministic local scorer: answer length plus presence of known Excel
// terms and formula syntax. Serves as the offline reviewer and as the
// fallback any remote reviewer degrades to.
pub struct RuleBasedReviewer;

impl AnswerReviewer for RuleBasedReviewer {
    fn review(&self, question: &Question, answer: &str) -> Evaluation {
        let mut score: u32 = 40;

        let words = answer.split_whitespace().count();
        if words > 30 {
            score += 25;
        } else if words > 15 {
            score += 15;
        } else if words > 5 {
            score += 10;
        }

        let lower = answer.to_lowercase();
        let found: Vec<&str> = FUNCTION_TOKENS
            .iter()
            .filter(|token| lower.contains(&token.to_lowercase()))
            .copied()
            .collect();
        if !found.is_empty() {
            score += 20;
        }

        if answer.contains('=') || answer.contains("()") {
            score += 15;
        }

        let score = score.min(100);

        let mut strengths = vec!["Response provided".to_string()];
        if !found.is_empty() {
            let named: Vec<&str> = found.iter().take(2).copied().collect();
            strengths.push(format!("Mentioned: {}", named.join(", ")));
        }

        Evaluation {
            question_id: question.id,
            score,
            technical_accuracy: score,
            depth: score.saturating_sub(10),
            practical_application: score.saturating_sub(5),
            strengths,
            improvements: vec![
                "Could provide more detail".to_string(),
                "Add specific Excel function examples".to_string(),
            ],
            feedback: "Scored locally from answer length and Excel terminology".to_string(),
            source: EvaluationSource::RuleBased,
            response_length: ResponseLength::of(answer),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}
