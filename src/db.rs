use rusqlite::{params, Connection};
use std::path::Path;

use crate::error::StorageError;
use crate::models::{
    Category, Difficulty, Origin, PerformanceSample, Question, QuestionKind,
};

// Persistence contract for the question store: load everything once at
// startup, write the full record back after every mutation.
pub trait QuestionBackend {
    fn load_all(&self) -> Result<Vec<Question>, StorageError>;
    fn save(&self, question: &Question) -> Result<(), StorageError>;
}

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    pub fn init(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS questions (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id INTEGER NOT NULL UNIQUE,
                text TEXT NOT NULL,
                kind TEXT NOT NULL CHECK(kind IN ('formula', 'concept')),
                category TEXT NOT NULL,
                difficulty TEXT NOT NULL CHECK(difficulty IN ('basic', 'intermediate', 'advanced')),
                keywords TEXT NOT NULL DEFAULT '[]',
                origin TEXT NOT NULL DEFAULT 'curated' CHECK(origin IN ('curated', 'generated')),
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                usage_count INTEGER NOT NULL DEFAULT 0,
                avg_score REAL NOT NULL DEFAULT 0,
                effectiveness REAL NOT NULL DEFAULT 0.5
            );

            CREATE TABLE IF NOT EXISTS performance_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                question_id INTEGER NOT NULL,
                score INTEGER NOT NULL,
                timestamp TEXT NOT NULL,
                outcome TEXT,
                FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_questions_effectiveness ON questions(effectiveness);
            CREATE INDEX IF NOT EXISTS idx_questions_category ON questions(category);
            CREATE INDEX IF NOT EXISTS idx_history_question ON performance_history(question_id);
            "#,
        )?;

        self.migrate()?;

        Ok(())
    }

    // Handle schema migrations for existing databases
    fn migrate(&self) -> Result<(), StorageError> {
        // The origin column arrived after the first release
        let has_origin: bool = self
            .conn
            .prepare("SELECT origin FROM questions LIMIT 1")
            .is_ok();

        if !has_origin {
            self.conn.execute_batch(
                "ALTER TABLE questions ADD COLUMN origin TEXT NOT NULL DEFAULT 'curated';",
            )?;
        }

        Ok(())
    }
}

impl QuestionBackend for Database {
    fn load_all(&self) -> Result<Vec<Question>, StorageError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, text, kind, category, difficulty, keywords, origin,
                   created_at, usage_count, avg_score, effectiveness
            FROM questions
            ORDER BY seq
            "#,
        )?;

        let rows = stmt.query_map([], |row| {
            let kind_str: String = row.get(2)?;
            let category_str: String = row.get(3)?;
            let difficulty_str: String = row.get(4)?;
            let keywords_json: String = row.get(5)?;
            let origin_str: String = row.get(6)?;
            Ok(Question {
                id: row.get(0)?,
                text: row.get(1)?,
                kind: QuestionKind::from_str(&kind_str).unwrap_or(QuestionKind::Concept),
                category: Category::from_str(&category_str)
                    .unwrap_or(Category::BasicFormulas),
                difficulty: Difficulty::from_str(&difficulty_str)
                    .unwrap_or(Difficulty::Basic),
                keywords: serde_json::from_str(&keywords_json).unwrap_or_default(),
                origin: Origin::from_str(&origin_str).unwrap_or(Origin::Curated),
                created_at: row.get(7)?,
                usage_count: row.get(8)?,
                avg_score: row.get(9)?,
                effectiveness: row.get(10)?,
                history: vec![],
            })
        })?;
        let mut questions = rows.collect::<Result<Vec<_>, _>>()?;

        for question in &mut questions {
            question.history = self.load_history(question.id)?;
        }

        Ok(questions)
    }

    // Upserts the question row and rewrites its history in one transaction,
    // so usage_count, avg_score and performance_history stay consistent
    // even when the write is interrupted.
    fn save(&self, question: &Question) -> Result<(), StorageError> {
        let keywords_json = serde_json::to_string(&question.keywords)
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        let tx = self.conn.unchecked_transaction()?;

        tx.execute(
            r#"
            INSERT INTO questions
                (id, text, kind, category, difficulty, keywords, origin,
                 created_at, usage_count, avg_score, effectiveness)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            ON CONFLICT(id) DO UPDATE SET
                usage_count = excluded.usage_count,
                avg_score = excluded.avg_score,
                effectiveness = excluded.effectiveness
            "#,
            params![
                question.id,
                question.text,
                question.kind.as_str(),
                question.category.as_str(),
                question.difficulty.as_str(),
                keywords_json,
                question.origin.as_str(),
                question.created_at,
                question.usage_count,
                question.avg_score,
                question.effectiveness,
            ],
        )?;

        tx.execute(
            "DELETE FROM performance_history WHERE question_id = ?1",
            params![question.id],
        )?;
        for sample in &question.history {
            tx.execute(
                r#"
                INSERT INTO performance_history (question_id, score, timestamp, outcome)
                VALUES (?1, ?2, ?3, ?4)
                "#,
                params![question.id, sample.score, sample.timestamp, sample.outcome],
            )?;
        }

        tx.commit()?;
        Ok(())
    }
}

impl Database {
    fn load_history(&self, question_id: i64) -> Result<Vec<PerformanceSample>, StorageError> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT score, timestamp, outcome
            FROM performance_history
            WHERE question_id = ?1
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map(params![question_id], |row| {
            Ok(PerformanceSample {
                score: row.get(0)?,
                timestamp: row.get(1)?,
                outcome: row.get(2)?,
            })
        })?;
        let samples = rows.collect::<Result<Vec<_>, _>>()?;

        Ok(samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::question_id;

    fn setup_db() -> Database {
        let db = Database::open(":memory:").expect("Failed to create in-memory database");
        db.init().expect("Failed to initialize database");
        db
    }

    fn make_question(text: &str, difficulty: Difficulty) -> Question {
        Question {
            id: question_id(text),
            text: text.to_string(),
            kind: QuestionKind::Concept,
            category: Category::DataAnalysis,
            difficulty,
            keywords: vec!["PIVOT".to_string()],
            origin: Origin::Generated,
            created_at: "2026-01-01T00:00:00+00:00".to_string(),
            usage_count: 0,
            avg_score: 0.0,
            effectiveness: 0.5,
            history: vec![],
        }
    }

    mod init_tests {
        use super::*;

        #[test]
        fn init_creates_tables() {
            let db = setup_db();
            let questions: i64 = db
                .conn
                .query_row("SELECT COUNT(*) FROM questions", [], |row| row.get(0))
                .expect("questions table should exist");
            assert_eq!(questions, 0);

            let history: i64 = db
                .conn
                .query_row("SELECT COUNT(*) FROM performance_history", [], |row| {
                    row.get(0)
                })
                .expect("performance_history table should exist");
            assert_eq!(history, 0);
        }

        #[test]
        fn init_is_idempotent() {
            let db = setup_db();
            db.save(&make_question("Q1?", Difficulty::Basic)).unwrap();

            db.init().expect("Re-init should succeed");

            let questions = db.load_all().unwrap();
            assert_eq!(questions.len(), 1);
        }

        #[test]
        fn empty_store_loads_zero_questions() {
            let db = setup_db();
            assert!(db.load_all().unwrap().is_empty());
        }
    }

    mod save_load_tests {
        use super::*;

        #[test]
        fn save_then_load_roundtrips_fields() {
            let db = setup_db();
            let q = make_question("How would you build a pivot table?", Difficulty::Intermediate);
            db.save(&q).unwrap();

            let loaded = db.load_all().unwrap();
            assert_eq!(loaded.len(), 1);
            let got = &loaded[0];
            assert_eq!(got.id, q.id);
            assert_eq!(got.text, q.text);
            assert_eq!(got.category, Category::DataAnalysis);
            assert_eq!(got.difficulty, Difficulty::Intermediate);
            assert_eq!(got.keywords, vec!["PIVOT".to_string()]);
            assert_eq!(got.origin, Origin::Generated);
            assert_eq!(got.usage_count, 0);
        }

        #[test]
        fn save_twice_updates_stats_without_duplicating() {
            let db = setup_db();
            let mut q = make_question("Q1?", Difficulty::Basic);
            db.save(&q).unwrap();

            q.usage_count = 1;
            q.avg_score = 80.0;
            q.effectiveness = 0.55;
            q.history.push(PerformanceSample {
                score: 80,
                timestamp: "2026-01-02T00:00:00+00:00".to_string(),
                outcome: None,
            });
            db.save(&q).unwrap();

            let loaded = db.load_all().unwrap();
            assert_eq!(loaded.len(), 1);
            assert_eq!(loaded[0].usage_count, 1);
            assert_eq!(loaded[0].avg_score, 80.0);
            assert_eq!(loaded[0].history.len(), 1);
            assert_eq!(loaded[0].history[0].score, 80);
        }

        #[test]
        fn history_persists_in_order() {
            let db = setup_db();
            let mut q = make_question("Q1?", Difficulty::Basic);
            for (i, score) in [70, 85, 40].iter().enumerate() {
                q.history.push(PerformanceSample {
                    score: *score,
                    timestamp: format!("2026-01-0{}T00:00:00+00:00", i + 1),
                    outcome: Some("completed".to_string()),
                });
            }
            q.usage_count = 3;
            db.save(&q).unwrap();

            let loaded = db.load_all().unwrap();
            let scores: Vec<u32> = loaded[0].history.iter().map(|s| s.score).collect();
            assert_eq!(scores, vec![70, 85, 40]);
        }

        #[test]
        fn load_preserves_insertion_order() {
            let db = setup_db();
            db.save(&make_question("Zebra question?", Difficulty::Basic))
                .unwrap();
            db.save(&make_question("Alpha question?", Difficulty::Basic))
                .unwrap();
            db.save(&make_question("Middle question?", Difficulty::Basic))
                .unwrap();

            let loaded = db.load_all().unwrap();
            let texts: Vec<&str> = loaded.iter().map(|q| q.text.as_str()).collect();
            assert_eq!(
                texts,
                vec!["Zebra question?", "Alpha question?", "Middle question?"]
            );
        }

        #[test]
        fn updating_a_question_keeps_its_insertion_slot() {
            let db = setup_db();
            let mut first = make_question("First?", Difficulty::Basic);
            db.save(&first).unwrap();
            db.save(&make_question("Second?", Difficulty::Basic)).unwrap();

            first.usage_count = 5;
            db.save(&first).unwrap();

            let loaded = db.load_all().unwrap();
            assert_eq!(loaded[0].text, "First?");
            assert_eq!(loaded[0].usage_count, 5);
        }
    }
}
