use log::warn;
use rand::Rng;

use crate::catalog::{role_focus, QuestionCatalog};
use crate::models::{Category, Difficulty, Question, Role};
use crate::store::QuestionStore;

// Outcome of a selection round. Coming up short is not an error: the
// caller runs a shorter session and the shortfall is logged.
#[derive(Debug, Clone)]
pub struct Selection {
    pub questions: Vec<Question>,
    pub requested: usize,
}

impl Selection {
    pub fn shortfall(&self) -> usize {
        self.requested.saturating_sub(self.questions.len())
    }

    pub fn is_complete(&self) -> bool {
        self.shortfall() == 0
    }
}

// Largest-remainder split of `count` across the three difficulties: the
// basic then intermediate buckets absorb the remainder units first.
pub fn difficulty_quotas(count: usize) -> [(Difficulty, usize); 3] {
    let base = count / 3;
    let remainder = count % 3;
    [
        (Difficulty::Basic, base + usize::from(remainder > 0)),
        (Difficulty::Intermediate, base + usize::from(remainder > 1)),
        (Difficulty::Advanced, base),
    ]
}

// Pick `count` questions for a role: stored questions ranked by
// effectiveness, narrowed to the role's favored categories when that
// leaves enough, topped up from the catalog, then rebalanced across
// difficulties.
pub fn select(
    store: &QuestionStore,
    catalog: &QuestionCatalog,
    role: Role,
    count: usize,
    rng: &mut impl Rng,
) -> Selection {
    let favored = role_focus(role);

    let pool = store.best(None, None, count);
    let focused: Vec<Question> = pool
        .iter()
        .filter(|q| favored.contains(&q.category))
        .cloned()
        .collect();
    // Favoring categories must not starve the pick
    let mut candidates = if focused.len() >= count { focused } else { pool };

    let mut used_ids: Vec<i64> = candidates.iter().map(|q| q.id).collect();

    if candidates.len() < count {
        let needed = count - candidates.len();
        for (difficulty, quota) in difficulty_quotas(needed) {
            for _ in 0..quota {
                if let Some(question) = conjure(catalog, favored, difficulty, &used_ids, rng) {
                    used_ids.push(question.id);
                    candidates.push(question);
                }
            }
        }
    }

    // Rebalance toward the target difficulty mix; each bucket keeps its
    // most effective candidates.
    let mut selected: Vec<Question> = Vec::with_capacity(count);
    let mut leftovers: Vec<Question> = vec![];
    for (difficulty, quota) in difficulty_quotas(count) {
        let mut bucket: Vec<Question> = candidates
            .iter()
            .filter(|q| q.difficulty == difficulty)
            .cloned()
            .collect();
        bucket.sort_by(|a, b| b.effectiveness.total_cmp(&a.effectiveness));
        for (i, question) in bucket.into_iter().enumerate() {
            if i < quota {
                selected.push(question);
            } else {
                leftovers.push(question);
            }
        }
    }

    // Quotas a difficulty couldn't fill are handed to whatever remains,
    // best first
    if selected.len() < count {
        leftovers.sort_by(|a, b| b.effectiveness.total_cmp(&a.effectiveness));
        for question in leftovers {
            if selected.len() == count {
                break;
            }
            selected.push(question);
        }
    }

    if selected.len() < count {
        warn!(
            "selected {} of {} requested questions for role {}",
            selected.len(),
            count,
            role.as_str()
        );
    }

    Selection {
        questions: selected,
        requested: count,
    }
}

// One fresh question at the requested difficulty: a synthesized template
// fill if one matches, otherwise curated content at that difficulty,
// otherwise curated content at any difficulty.
fn conjure(
    catalog: &QuestionCatalog,
    favored: &[Category],
    difficulty: Difficulty,
    used_ids: &[i64],
    rng: &mut impl Rng,
) -> Option<Question> {
    if let Some(question) = catalog.synthesize(favored, difficulty, rng) {
        if !used_ids.contains(&question.id) {
            return Some(question);
        }
    }

    catalog
        .curated(favored, Some(difficulty))
        .into_iter()
        .chain(catalog.curated(favored, None))
        .find(|q| !used_ids.contains(&q.id))
}
