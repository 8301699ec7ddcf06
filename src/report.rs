use serde::Serialize;

use crate::models::{Category, Difficulty, Evaluation, Question, Role};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Decision {
    StrongHire,
    ConditionalHire,
    NoHireTrainingRequired,
    Reject,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::StrongHire => "STRONG HIRE",
            Decision::ConditionalHire => "CONDITIONAL HIRE",
            Decision::NoHireTrainingRequired => "NO HIRE - TRAINING REQUIRED",
            Decision::Reject => "REJECT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Confidence {
    High,
    Medium,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "High",
            Confidence::Medium => "Medium",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Consistency {
    VeryConsistent,
    Consistent,
    SomewhatVariable,
    HighlyVariable,
    InsufficientData,
}

impl Consistency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Consistency::VeryConsistent => "very_consistent",
            Consistency::Consistent => "consistent",
            Consistency::SomewhatVariable => "somewhat_variable",
            Consistency::HighlyVariable => "highly_variable",
            Consistency::InsufficientData => "insufficient_data",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DimensionScores {
    pub technical_accuracy: f64,
    pub depth_of_understanding: f64,
    pub practical_application: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionBreakdown {
    pub number: usize,
    pub text: String,
    pub score: u32,
    pub difficulty: Difficulty,
    pub category: Category,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryAverage {
    pub category: Category,
    pub avg_score: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoleInsights {
    pub category_averages: Vec<CategoryAverage>,
    pub strongest_area: Option<Category>,
    pub weakest_area: Option<Category>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HiringReport {
    pub overall_score: f64,
    pub decision: Decision,
    pub confidence: Confidence,
    pub meets_threshold: bool,
    pub detailed_scores: DimensionScores,
    pub consistency: Consistency,
    pub highest_score: u32,
    pub lowest_score: u32,
    pub question_count: usize,
    pub critical_gaps: Vec<String>,
    pub strengths: Vec<String>,
    pub improvements: Vec<String>,
    pub executive_summary: String,
    pub rationale: String,
    pub next_steps: Vec<String>,
    pub question_breakdown: Vec<QuestionBreakdown>,
    pub insights: RoleInsights,
}

// Aggregate a finished session's evaluations into a hiring report.
// Returns None when there is nothing to aggregate.
pub fn generate(
    role: Role,
    questions: &[Question],
    evaluations: &[Evaluation],
) -> Option<HiringReport> {
    if evaluations.is_empty() {
        return None;
    }

    let count = evaluations.len() as f64;
    let overall = evaluations.iter().map(|e| f64::from(e.score)).sum::<f64>() / count;
    let technical = evaluations
        .iter()
        .map(|e| f64::from(e.technical_accuracy))
        .sum::<f64>()
        / count;
    let depth = evaluations.iter().map(|e| f64::from(e.depth)).sum::<f64>() / count;
    let practical = evaluations
        .iter()
        .map(|e| f64::from(e.practical_application))
        .sum::<f64>()
        / count;

    let (decision, confidence) = decide(overall, role, evaluations);
    let threshold = role.hiring_threshold();

    let question_breakdown = questions
        .iter()
        .zip(evaluations)
        .enumerate()
        .map(|(i, (q, e))| QuestionBreakdown {
            number: i + 1,
            text: truncate(&q.text, 60),
            score: e.score,
            difficulty: q.difficulty,
            category: q.category,
        })
        .collect();

    Some(HiringReport {
        overall_score: round1(overall),
        decision,
        confidence,
        meets_threshold: overall >= threshold,
        detailed_scores: DimensionScores {
            technical_accuracy: round1(technical),
            depth_of_understanding: round1(depth),
            practical_application: round1(practical),
        },
        consistency: classify_consistency(evaluations),
        highest_score: evaluations.iter().map(|e| e.score).max().unwrap_or(0),
        lowest_score: evaluations.iter().map(|e| e.score).min().unwrap_or(0),
        question_count: evaluations.len(),
        critical_gaps: critical_gaps(overall, role, evaluations),
        strengths: collect_unique(evaluations.iter().flat_map(|e| e.strengths.iter())),
        improvements: collect_unique(evaluations.iter().flat_map(|e| e.improvements.iter())),
        executive_summary: executive_summary(decision, overall),
        rationale: rationale(decision),
        next_steps: next_steps(decision),
        question_breakdown,
        insights: role_insights(role, questions, evaluations),
    })
}

// Strict, ordered decision ladder against the role threshold, with a
// systemic-failure override: a high mean cannot mask a candidate who
// scored below 30 on most questions.
fn decide(overall: f64, role: Role, evaluations: &[Evaluation]) -> (Decision, Confidence) {
    let threshold = role.hiring_threshold();

    let (mut decision, mut confidence) = if overall >= 85.0 {
        (Decision::StrongHire, Confidence::High)
    } else if overall >= threshold {
        (Decision::ConditionalHire, Confidence::Medium)
    } else if overall >= 50.0 {
        (Decision::NoHireTrainingRequired, Confidence::High)
    } else {
        (Decision::Reject, Confidence::High)
    };

    let critical_failures = evaluations.iter().filter(|e| e.score < 30).count();
    if critical_failures > evaluations.len() / 2 {
        decision = Decision::Reject;
        confidence = Confidence::High;
    }

    (decision, confidence)
}

// Population standard deviation of per-question scores
fn classify_consistency(evaluations: &[Evaluation]) -> Consistency {
    if evaluations.len() < 2 {
        return Consistency::InsufficientData;
    }

    let scores: Vec<f64> = evaluations.iter().map(|e| f64::from(e.score)).collect();
    let mean = scores.iter().sum::<f64>() / scores.len() as f64;
    let variance =
        scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
    let std_dev = variance.sqrt();

    if std_dev <= 10.0 {
        Consistency::VeryConsistent
    } else if std_dev <= 20.0 {
        Consistency::Consistent
    } else if std_dev <= 30.0 {
        Consistency::SomewhatVariable
    } else {
        Consistency::HighlyVariable
    }
}

// Top blocking gaps in fixed priority order, capped at three
fn critical_gaps(overall: f64, role: Role, evaluations: &[Evaluation]) -> Vec<String> {
    let mut gaps = vec![];

    if overall < 30.0 {
        gaps.push("CRITICAL: Lacks basic Excel formula knowledge".to_string());
    }
    if overall < 50.0 {
        gaps.push("MAJOR: Cannot perform essential Excel functions".to_string());
    }

    let low_scores = evaluations.iter().filter(|e| e.score < 40).count();
    if low_scores > 2 {
        gaps.push("PATTERN: Consistent poor performance across multiple areas".to_string());
    }

    match role {
        Role::Finance if overall < 70.0 => {
            gaps.push(
                "FINANCE CRITICAL: Insufficient Excel skills for financial analysis".to_string(),
            );
        }
        Role::DataAnalytics if overall < 75.0 => {
            gaps.push(
                "ANALYTICS CRITICAL: Cannot handle data analysis requirements".to_string(),
            );
        }
        _ => {}
    }

    gaps.truncate(3);
    gaps
}

// First occurrence wins, exact-text duplicates dropped, five kept
fn collect_unique<'a>(items: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = vec![];
    for item in items {
        if !seen.contains(item) {
            seen.push(item.clone());
        }
        if seen.len() == 5 {
            break;
        }
    }
    seen
}

fn executive_summary(decision: Decision, overall: f64) -> String {
    match decision {
        Decision::StrongHire => format!(
            "RECOMMEND FOR HIRE: Candidate demonstrates strong Excel proficiency \
             (Score: {:.0}/100). Ready for immediate deployment in an Excel-dependent role.",
            overall
        ),
        Decision::ConditionalHire => format!(
            "CONDITIONAL HIRE: Candidate has an adequate Excel foundation \
             (Score: {:.0}/100) but requires targeted training before role assignment.",
            overall
        ),
        Decision::NoHireTrainingRequired => format!(
            "NOT RECOMMENDED: Candidate lacks essential Excel skills (Score: {:.0}/100). \
             Would require an extensive training program before being job-ready.",
            overall
        ),
        Decision::Reject => format!(
            "REJECT: Candidate demonstrates insufficient Excel knowledge (Score: {:.0}/100). \
             Not suitable for an Excel-dependent position even with training.",
            overall
        ),
    }
}

fn rationale(decision: Decision) -> String {
    match decision {
        Decision::StrongHire => {
            "Consistently high performance across all Excel skill areas. \
             Candidate can contribute immediately."
        }
        Decision::ConditionalHire => {
            "Solid foundation with specific gaps that can be addressed through \
             focused training within 2-4 weeks."
        }
        Decision::NoHireTrainingRequired => {
            "Fundamental Excel knowledge gaps require extensive training (6-8 weeks) \
             which may not be cost-effective."
        }
        Decision::Reject => {
            "Critical deficiencies in basic Excel operations. Training unlikely to \
             bring candidate to required proficiency level."
        }
    }
    .to_string()
}

fn next_steps(decision: Decision) -> Vec<String> {
    let steps: &[&str] = match decision {
        Decision::StrongHire => &[
            "Proceed with job offer",
            "Assign to Excel-intensive projects immediately",
            "Consider for mentoring other team members",
        ],
        Decision::ConditionalHire => &[
            "Offer position with 30-day Excel training requirement",
            "Assign Excel mentor for first month",
            "Re-evaluate after training completion",
        ],
        Decision::NoHireTrainingRequired => &[
            "Do not proceed with hiring",
            "Consider for future openings after Excel certification",
            "Recommend Excel fundamentals course to candidate",
        ],
        Decision::Reject => &[
            "Reject application",
            "Do not consider for Excel-dependent roles",
            "Focus recruitment efforts on other candidates",
        ],
    };
    steps.iter().map(|s| s.to_string()).collect()
}

fn role_insights(role: Role, questions: &[Question], evaluations: &[Evaluation]) -> RoleInsights {
    // Per-category averages in first-appearance order
    let mut averages: Vec<(Category, f64, usize)> = vec![];
    for (question, evaluation) in questions.iter().zip(evaluations) {
        match averages.iter_mut().find(|(c, _, _)| *c == question.category) {
            Some((_, total, n)) => {
                *total += f64::from(evaluation.score);
                *n += 1;
            }
            None => averages.push((question.category, f64::from(evaluation.score), 1)),
        }
    }
    let category_averages: Vec<CategoryAverage> = averages
        .iter()
        .map(|(category, total, n)| CategoryAverage {
            category: *category,
            avg_score: round1(total / *n as f64),
        })
        .collect();

    let mut strongest: Option<&CategoryAverage> = None;
    let mut weakest: Option<&CategoryAverage> = None;
    for avg in &category_averages {
        if strongest.map_or(true, |s| avg.avg_score > s.avg_score) {
            strongest = Some(avg);
        }
        if weakest.map_or(true, |w| avg.avg_score < w.avg_score) {
            weakest = Some(avg);
        }
    }

    let avg_for = |category: Category| {
        category_averages
            .iter()
            .find(|a| a.category == category)
            .map_or(0.0, |a| a.avg_score)
    };

    // A favored category the interview never touched reads as 0 and still
    // draws a recommendation, same as a low score would.
    let mut recommendations = vec![];
    match role {
        Role::Finance => {
            if avg_for(Category::LookupFunctions) < 70.0 {
                recommendations
                    .push("Focus on VLOOKUP and INDEX-MATCH for financial data lookups".to_string());
            }
            if avg_for(Category::AdvancedFormulas) < 70.0 {
                recommendations
                    .push("Strengthen knowledge of SUMIF/COUNTIF for financial analysis".to_string());
            }
            if avg_for(Category::DataAnalysis) < 70.0 {
                recommendations.push("Practice pivot tables for financial reporting".to_string());
            }
        }
        Role::Operations => {
            if avg_for(Category::DataManipulation) < 70.0 {
                recommendations.push("Improve data cleaning and manipulation skills".to_string());
            }
            if avg_for(Category::DataAnalysis) < 70.0 {
                recommendations
                    .push("Focus on data analysis techniques for operational insights".to_string());
            }
            if avg_for(Category::BasicFormulas) < 70.0 {
                recommendations.push("Strengthen foundation in basic Excel formulas".to_string());
            }
        }
        Role::DataAnalytics => {
            if avg_for(Category::AdvancedFormulas) < 70.0 {
                recommendations.push("Master advanced Excel formulas for data analysis".to_string());
            }
            if avg_for(Category::DataAnalysis) < 70.0 {
                recommendations.push("Enhance pivot table and data analysis skills".to_string());
            }
            if avg_for(Category::LookupFunctions) < 70.0 {
                recommendations.push("Improve lookup functions for data integration".to_string());
            }
        }
        Role::General => {}
    }

    RoleInsights {
        strongest_area: strongest.map(|a| a.category),
        weakest_area: weakest.map(|a| a.category),
        category_averages,
        recommendations,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
