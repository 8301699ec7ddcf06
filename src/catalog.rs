use chrono::Utc;
use rand::Rng;

use crate::models::{Category, Difficulty, Origin, Question, QuestionKind, Role};

// Concept tokens per category, used for keyword extraction and for the
// rule-based reviewer's function scan.
pub fn category_tokens(category: Category) -> &'static [&'static str] {
    match category {
        Category::BasicFormulas => &["SUM", "AVERAGE", "COUNT", "MAX", "MIN"],
        Category::LookupFunctions => &["VLOOKUP", "HLOOKUP", "INDEX", "MATCH"],
        Category::DataAnalysis => &["PIVOT", "FILTER", "SORT", "SUBTOTAL"],
        Category::AdvancedFormulas => &["IF", "SUMIF", "COUNTIF", "NESTED"],
        Category::DataManipulation => &["CONCATENATE", "TEXT", "DATE", "TIME"],
        Category::ScenarioBased => &["DASHBOARD", "REPORTING", "ANALYSIS"],
    }
}

// Ordered category affinity per role. Biases selection and generation;
// never a hard filter.
pub fn role_focus(role: Role) -> &'static [Category] {
    match role {
        Role::Finance => &[
            Category::BasicFormulas,
            Category::LookupFunctions,
            Category::ScenarioBased,
        ],
        Role::Operations => &[
            Category::DataAnalysis,
            Category::DataManipulation,
            Category::ScenarioBased,
        ],
        Role::DataAnalytics => &[
            Category::AdvancedFormulas,
            Category::DataAnalysis,
            Category::LookupFunctions,
        ],
        Role::General => &[Category::BasicFormulas],
    }
}

// Stable 64-bit FNV-1a over the normalized question text, masked to a
// non-negative i64. Identical text always yields the same id, which is how
// re-generated questions dedup against the store. Accidental collisions in
// a 63-bit space are accepted.
pub fn question_id(text: &str) -> i64 {
    let normalized = text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ");
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in normalized.bytes() {
        hash ^= u64::from(byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    (hash & 0x7fff_ffff_ffff_ffff) as i64
}

struct Template {
    pattern: &'static str,
    slots: &'static [(&'static str, &'static [&'static str])],
    category: Category,
    difficulty: Difficulty,
}

const TEMPLATES: &[Template] = &[
    Template {
        pattern: "What function would you use to {action} in Excel?",
        slots: &[(
            "action",
            &[
                "sum values in a range",
                "find the average",
                "count non-empty cells",
            ],
        )],
        category: Category::BasicFormulas,
        difficulty: Difficulty::Basic,
    },
    Template {
        pattern: "How would you {task} in a large dataset?",
        slots: &[(
            "task",
            &[
                "remove duplicates",
                "find unique values",
                "filter specific criteria",
            ],
        )],
        category: Category::DataAnalysis,
        difficulty: Difficulty::Intermediate,
    },
    Template {
        pattern: "Explain the difference between {concept1} and {concept2}.",
        slots: &[
            ("concept1", &["VLOOKUP", "absolute references", "SUMIF"]),
            ("concept2", &["INDEX-MATCH", "relative references", "SUMIFS"]),
        ],
        category: Category::AdvancedFormulas,
        difficulty: Difficulty::Advanced,
    },
    Template {
        pattern: "Which lookup function would you reach for to {goal}, and why?",
        slots: &[(
            "goal",
            &[
                "match a value in another sheet",
                "pull a price from a product table",
                "find the column position of a header",
            ],
        )],
        category: Category::LookupFunctions,
        difficulty: Difficulty::Intermediate,
    },
    Template {
        pattern: "How would you use the {func} function to clean up imported text?",
        slots: &[("func", &["TEXT", "CONCATENATE", "TRIM"])],
        category: Category::DataManipulation,
        difficulty: Difficulty::Basic,
    },
    Template {
        pattern: "A stakeholder asks for {deliverable}. How do you approach building it in Excel?",
        slots: &[(
            "deliverable",
            &[
                "a weekly sales dashboard",
                "a variance report",
                "an analysis of customer churn",
            ],
        )],
        category: Category::ScenarioBased,
        difficulty: Difficulty::Advanced,
    },
];

struct CuratedSeed {
    text: &'static str,
    kind: QuestionKind,
    category: Category,
    difficulty: Difficulty,
    keywords: &'static [&'static str],
}

const CURATED: &[CuratedSeed] = &[
    CuratedSeed {
        text: "What Excel function would you use to sum values in range A1:A10?",
        kind: QuestionKind::Formula,
        category: Category::BasicFormulas,
        difficulty: Difficulty::Basic,
        keywords: &["SUM", "formula"],
    },
    CuratedSeed {
        text: "What's the difference between absolute and relative cell references?",
        kind: QuestionKind::Concept,
        category: Category::BasicFormulas,
        difficulty: Difficulty::Basic,
        keywords: &["absolute", "relative", "$"],
    },
    CuratedSeed {
        text: "How would you count only the non-empty cells in a column, and which functions could you use?",
        kind: QuestionKind::Formula,
        category: Category::BasicFormulas,
        difficulty: Difficulty::Intermediate,
        keywords: &["COUNT", "COUNTA"],
    },
    CuratedSeed {
        text: "Explain how VLOOKUP works and when you'd use it.",
        kind: QuestionKind::Concept,
        category: Category::LookupFunctions,
        difficulty: Difficulty::Intermediate,
        keywords: &["VLOOKUP", "lookup", "table", "match"],
    },
    CuratedSeed {
        text: "When would INDEX-MATCH be a better choice than VLOOKUP?",
        kind: QuestionKind::Concept,
        category: Category::LookupFunctions,
        difficulty: Difficulty::Advanced,
        keywords: &["INDEX", "MATCH", "VLOOKUP"],
    },
    CuratedSeed {
        text: "How would you remove duplicate values from a dataset in Excel?",
        kind: QuestionKind::Concept,
        category: Category::DataAnalysis,
        difficulty: Difficulty::Intermediate,
        keywords: &["remove duplicates", "data", "filter"],
    },
    CuratedSeed {
        text: "How would you create a pivot table for data analysis?",
        kind: QuestionKind::Concept,
        category: Category::DataAnalysis,
        difficulty: Difficulty::Intermediate,
        keywords: &["pivot table", "data analysis"],
    },
    CuratedSeed {
        text: "How do you sort a table by one column while keeping its rows intact?",
        kind: QuestionKind::Concept,
        category: Category::DataAnalysis,
        difficulty: Difficulty::Basic,
        keywords: &["SORT", "data"],
    },
    CuratedSeed {
        text: "How would you use SUMIF to calculate conditional totals?",
        kind: QuestionKind::Formula,
        category: Category::AdvancedFormulas,
        difficulty: Difficulty::Intermediate,
        keywords: &["SUMIF", "conditional"],
    },
    CuratedSeed {
        text: "How would you combine IF with other functions to build a nested decision formula?",
        kind: QuestionKind::Formula,
        category: Category::AdvancedFormulas,
        difficulty: Difficulty::Advanced,
        keywords: &["IF", "NESTED"],
    },
    CuratedSeed {
        text: "Which function joins text from two cells into one, and how do you call it?",
        kind: QuestionKind::Formula,
        category: Category::DataManipulation,
        difficulty: Difficulty::Basic,
        keywords: &["CONCATENATE", "TEXT"],
    },
    CuratedSeed {
        text: "How would you convert a text date into a real date value Excel can sort?",
        kind: QuestionKind::Formula,
        category: Category::DataManipulation,
        difficulty: Difficulty::Advanced,
        keywords: &["DATE", "TEXT"],
    },
    CuratedSeed {
        text: "What would you check first when a colleague says a report's totals look wrong?",
        kind: QuestionKind::Concept,
        category: Category::ScenarioBased,
        difficulty: Difficulty::Basic,
        keywords: &["ANALYSIS"],
    },
    CuratedSeed {
        text: "A report must refresh weekly from a CSV export. How would you structure the workbook?",
        kind: QuestionKind::Concept,
        category: Category::ScenarioBased,
        difficulty: Difficulty::Intermediate,
        keywords: &["REPORTING", "ANALYSIS"],
    },
    CuratedSeed {
        text: "Walk through how you would build a monthly sales dashboard from raw exported data.",
        kind: QuestionKind::Concept,
        category: Category::ScenarioBased,
        difficulty: Difficulty::Advanced,
        keywords: &["DASHBOARD", "REPORTING"],
    },
];

pub struct QuestionCatalog;

impl QuestionCatalog {
    pub fn new() -> Self {
        // Every category must carry tokens and at least one curated entry,
        // otherwise selection for some role could silently starve.
        for category in Category::ALL {
            debug_assert!(!category_tokens(category).is_empty());
            debug_assert!(CURATED.iter().any(|s| s.category == category));
        }
        QuestionCatalog
    }

    // Fill a random matching template. Returns None when no template covers
    // the requested categories at the requested difficulty; callers fall
    // back to a different difficulty or the curated bank.
    pub fn synthesize(
        &self,
        categories: &[Category],
        difficulty: Difficulty,
        rng: &mut impl Rng,
    ) -> Option<Question> {
        let candidates: Vec<&Template> = TEMPLATES
            .iter()
            .filter(|t| t.difficulty == difficulty && categories.contains(&t.category))
            .collect();
        if candidates.is_empty() {
            return None;
        }

        let template = candidates[rng.gen_range(0..candidates.len())];
        let mut text = template.pattern.to_string();
        for (slot, values) in template.slots {
            let value = values[rng.gen_range(0..values.len())];
            text = text.replace(&format!("{{{}}}", slot), value);
        }

        let kind = if text.to_lowercase().contains("function") {
            QuestionKind::Formula
        } else {
            QuestionKind::Concept
        };
        let keywords = extract_keywords(&text, template.category);

        Some(Question {
            id: question_id(&text),
            text,
            kind,
            category: template.category,
            difficulty,
            keywords,
            origin: Origin::Generated,
            created_at: Utc::now().to_rfc3339(),
            usage_count: 0,
            avg_score: 0.0,
            effectiveness: 0.5,
            history: vec![],
        })
    }

    // Curated questions matching the filter, in bank order
    pub fn curated(&self, categories: &[Category], difficulty: Option<Difficulty>) -> Vec<Question> {
        CURATED
            .iter()
            .filter(|s| categories.contains(&s.category))
            .filter(|s| difficulty.map_or(true, |d| s.difficulty == d))
            .map(seed_to_question)
            .collect()
    }

    pub fn curated_all(&self) -> Vec<Question> {
        CURATED.iter().map(seed_to_question).collect()
    }
}

impl Default for QuestionCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn seed_to_question(seed: &CuratedSeed) -> Question {
    Question {
        id: question_id(seed.text),
        text: seed.text.to_string(),
        kind: seed.kind,
        category: seed.category,
        difficulty: seed.difficulty,
        keywords: seed.keywords.iter().map(|k| k.to_string()).collect(),
        origin: Origin::Curated,
        created_at: Utc::now().to_rfc3339(),
        usage_count: 0,
        avg_score: 0.0,
        effectiveness: 0.5,
        history: vec![],
    }
}

fn extract_keywords(text: &str, category: Category) -> Vec<String> {
    let lower = text.to_lowercase();
    category_tokens(category)
        .iter()
        .filter(|token| lower.contains(&token.to_lowercase()))
        .map(|token| token.to_string())
        .collect()
}
