mod catalog;
mod db;
mod error;
mod models;
mod orchestrator;
mod report;
mod reviewer;
mod selector;
mod store;

use clap::{Parser, Subcommand};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use catalog::QuestionCatalog;
use db::Database;
use models::{Category, Difficulty, JsonOutput, Role};
use orchestrator::{Orchestrator, SubmitOutcome};
use report::HiringReport;
use reviewer::RuleBasedReviewer;
use store::QuestionStore;

const DEFAULT_DB_NAME: &str = "proctor.db";

#[derive(Parser)]
#[command(name = "proctor")]
#[command(about = "An adaptive Excel skills interviewer with a self-tuning question bank")]
#[command(version)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the question database
    Init,

    /// Run an interactive skills interview
    Interview {
        /// Target role: finance, operations, data_analytics
        #[arg(long, short)]
        role: String,

        /// Number of questions to ask
        #[arg(long, short, default_value_t = 6)]
        count: usize,

        /// Seed for deterministic question selection
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Manage the question bank
    #[command(subcommand)]
    Questions(QuestionCommands),

    /// Show question bank statistics
    Stats,
}

#[derive(Subcommand)]
enum QuestionCommands {
    /// List stored questions ranked by effectiveness
    List {
        /// Filter by category
        #[arg(long, short)]
        category: Option<String>,

        /// Filter by difficulty: basic/intermediate/advanced
        #[arg(long, short)]
        difficulty: Option<String>,

        /// Maximum number of questions to show
        #[arg(long, short, default_value_t = 20)]
        limit: usize,
    },

    /// Load the curated question bank into the store
    Seed,

    /// Show one question with its performance history
    Show {
        /// Question ID
        id: i64,
    },
}

fn get_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("PROCTOR_DB") {
        return PathBuf::from(path);
    }

    let config_dir = dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("proctor");

    std::fs::create_dir_all(&config_dir).ok();
    config_dir.join(DEFAULT_DB_NAME)
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let db_path = get_db_path();
    let db = Database::open(&db_path)?;

    match cli.command {
        Commands::Init => {
            db.init()?;
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::<()>::ok(()))?);
            } else {
                println!("Question database initialized at: {}", db_path.display());
            }
        }

        Commands::Interview { role, count, seed } => {
            db.init()?;
            run_interview(db, Role::from_str(&role), count, seed, cli.json)?;
        }

        Commands::Questions(question_cmd) => match question_cmd {
            QuestionCommands::List {
                category,
                difficulty,
                limit,
            } => {
                db.init()?;
                let store = QuestionStore::new(Box::new(db))?;
                let category = parse_category(category.as_deref())?;
                let difficulty = parse_difficulty(difficulty.as_deref())?;
                let questions = store.best(category, difficulty, limit);

                if cli.json {
                    println!("{}", serde_json::to_string(&JsonOutput::ok(&questions))?);
                } else if questions.is_empty() {
                    println!("No stored questions. Run `proctor questions seed` to load the curated bank.");
                } else {
                    println!(
                        "{:<20} {:<5} {:<5} {:<6} {:<13} QUESTION",
                        "ID", "EFF", "USES", "AVG", "DIFFICULTY"
                    );
                    println!("{}", "-".repeat(100));
                    for q in questions {
                        println!(
                            "{:<20} {:<5.2} {:<5} {:<6.1} {:<13} {}",
                            q.id,
                            q.effectiveness,
                            q.usage_count,
                            q.avg_score,
                            q.difficulty.as_str(),
                            truncate(&q.text, 48)
                        );
                    }
                }
            }

            QuestionCommands::Seed => {
                db.init()?;
                let mut store = QuestionStore::new(Box::new(db))?;
                let catalog = QuestionCatalog::new();

                let mut inserted = 0;
                for question in catalog.curated_all() {
                    if store.add(question)? {
                        inserted += 1;
                    }
                }

                if cli.json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "inserted": inserted,
                            "total": store.len()
                        })))?
                    );
                } else {
                    println!(
                        "Seeded {} curated questions ({} total in store).",
                        inserted,
                        store.len()
                    );
                }
            }

            QuestionCommands::Show { id } => {
                db.init()?;
                let store = QuestionStore::new(Box::new(db))?;
                match store.get(id) {
                    Some(q) => {
                        if cli.json {
                            println!("{}", serde_json::to_string(&JsonOutput::ok(q))?);
                        } else {
                            println!("Question: {}", q.text);
                            println!("ID: {}", q.id);
                            println!("Category: {}", q.category.label());
                            println!("Difficulty: {}", q.difficulty.label());
                            println!("Origin: {}", q.origin.as_str());
                            println!("Keywords: {}", q.keywords.join(", "));
                            println!();
                            println!("--- Effectiveness ---");
                            println!("Score: {:.2}", q.effectiveness);
                            println!(
                                "Used {} times, average answer score {:.1}",
                                q.usage_count, q.avg_score
                            );
                            for sample in &q.history {
                                println!("  {}  {:>3}", sample.timestamp, sample.score);
                            }
                        }
                    }
                    None if cli.json => println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::<()>::err("Question not found"))?
                    ),
                    None => println!("Question not found."),
                }
            }
        },

        Commands::Stats => {
            db.init()?;
            let store = QuestionStore::new(Box::new(db))?;
            let analytics = store.analytics();
            if cli.json {
                println!("{}", serde_json::to_string(&JsonOutput::ok(&analytics))?);
            } else {
                println!("=== Question Bank Statistics ===");
                println!("Total questions: {}", analytics.total_questions);
                println!("Curated: {}", analytics.curated);
                println!("Generated: {}", analytics.generated);
                println!("Total uses: {}", analytics.total_usage);
                println!("Average effectiveness: {:.2}", analytics.avg_effectiveness);
            }
        }
    }

    Ok(())
}

fn run_interview(
    db: Database,
    role: Role,
    count: usize,
    seed: Option<u64>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = QuestionStore::new(Box::new(db))?;
    let mut orchestrator = match seed {
        Some(seed) => Orchestrator::with_seed(store, Box::new(RuleBasedReviewer), seed),
        None => Orchestrator::new(store, Box::new(RuleBasedReviewer)),
    };

    let summary = orchestrator.start(role, count)?;
    if json {
        println!("{}", serde_json::to_string(&JsonOutput::ok(&summary))?);
    } else {
        println!("=== {} Skills Interview ===", role.label());
        if summary.shortfall > 0 {
            println!(
                "(question bank could only supply {} of {} questions)",
                summary.total_questions,
                summary.total_questions + summary.shortfall
            );
        }
        println!();
        println!("Question 1 of {}:", summary.total_questions);
        println!("{}", summary.first_question.text);
        println!();
        println!("Type your answer and press Enter (:pause, :resume, :status, :quit).");
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let input = line.trim();

        match input {
            ":quit" => {
                if !json {
                    println!("Interview abandoned.");
                }
                return Ok(());
            }
            ":pause" => {
                match orchestrator.pause() {
                    Ok(()) => {
                        if !json {
                            println!("Interview paused. Type :resume to continue.");
                        }
                    }
                    Err(e) => eprintln!("Error: {}", e),
                }
                continue;
            }
            ":resume" => {
                match orchestrator.resume() {
                    Ok(question) => {
                        if !json {
                            println!("Resumed. Current question:");
                            println!("{}", question.text);
                        }
                    }
                    Err(e) => eprintln!("Error: {}", e),
                }
                continue;
            }
            ":status" => {
                match orchestrator.status() {
                    Some(snapshot) if json => {
                        println!("{}", serde_json::to_string(&JsonOutput::ok(&snapshot))?)
                    }
                    Some(snapshot) => println!(
                        "Session {}: {} ({}/{} answered, {:.0}s elapsed)",
                        snapshot.id,
                        snapshot.status.as_str(),
                        snapshot.answered,
                        snapshot.total,
                        snapshot.elapsed_seconds
                    ),
                    None => println!("No active interview."),
                }
                continue;
            }
            "" => {
                if !json {
                    println!("Please provide an answer before submitting.");
                }
                continue;
            }
            _ => {}
        }

        match orchestrator.submit_answer(input) {
            Ok(SubmitOutcome::Continue {
                evaluation,
                next_question,
                progress,
            }) => {
                if json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "evaluation": evaluation,
                            "progress": progress,
                            "next_question": next_question,
                        })))?
                    );
                } else {
                    println!("Scored {}/100.", evaluation.score);
                    println!();
                    println!(
                        "Question {} of {}:",
                        progress.answered + 1,
                        progress.total
                    );
                    println!("{}", next_question.text);
                    println!();
                }
            }
            Ok(SubmitOutcome::Completed {
                evaluation,
                report,
                duration_seconds,
                ..
            }) => {
                if json {
                    println!(
                        "{}",
                        serde_json::to_string(&JsonOutput::ok(serde_json::json!({
                            "evaluation": evaluation,
                            "final_report": report,
                            "duration_seconds": duration_seconds,
                        })))?
                    );
                } else {
                    println!("Scored {}/100.", evaluation.score);
                    println!();
                    match report {
                        Some(report) => print_report(&report),
                        None => println!("No evaluations were recorded."),
                    }
                }
                return Ok(());
            }
            Err(e) if e.is_state_violation() => {
                eprintln!("Error: {} (:resume to continue, :status to inspect)", e)
            }
            Err(e) => eprintln!("Error: {}", e),
        }
    }

    Ok(())
}

fn print_report(report: &HiringReport) {
    println!("=== Interview Assessment Complete ===");
    println!();
    println!(
        "{} (confidence: {})",
        report.decision.as_str(),
        report.confidence.as_str()
    );
    println!("Overall score: {}/100", report.overall_score);
    println!();
    println!("{}", report.executive_summary);
    println!();
    println!("Technical accuracy:    {:.1}/100", report.detailed_scores.technical_accuracy);
    println!("Depth of understanding: {:.1}/100", report.detailed_scores.depth_of_understanding);
    println!("Practical application:  {:.1}/100", report.detailed_scores.practical_application);
    println!("Consistency: {}", report.consistency.as_str());

    if !report.critical_gaps.is_empty() {
        println!();
        println!("--- Critical Issues ---");
        for gap in &report.critical_gaps {
            println!("  - {}", gap);
        }
    }

    println!();
    println!("--- Rationale ---");
    println!("{}", report.rationale);

    println!();
    println!("--- Next Steps ---");
    for step in &report.next_steps {
        println!("  - {}", step);
    }

    if !report.insights.recommendations.is_empty() {
        println!();
        println!("--- Training Recommendations ---");
        for recommendation in &report.insights.recommendations {
            println!("  - {}", recommendation);
        }
    }

    println!();
    println!("--- Question Breakdown ---");
    for q in &report.question_breakdown {
        println!(
            "  {}. [{:<12}] {:>3}/100  {}",
            q.number,
            q.difficulty.as_str(),
            q.score,
            q.text
        );
    }
    let _ = io::stdout().flush();
}

fn parse_category(input: Option<&str>) -> Result<Option<Category>, String> {
    match input {
        None => Ok(None),
        Some(s) => Category::from_str(s).map(Some).ok_or_else(|| {
            format!(
                "Invalid category '{}'. Use one of: {}",
                s,
                Category::ALL
                    .iter()
                    .map(|c| c.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        }),
    }
}

fn parse_difficulty(input: Option<&str>) -> Result<Option<Difficulty>, String> {
    match input {
        None => Ok(None),
        Some(s) => Difficulty::from_str(s).map(Some).ok_or_else(|| {
            format!(
                "Invalid difficulty '{}'. Use: basic, intermediate, or advanced",
                s
            )
        }),
    }
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        s.to_string()
    } else {
        format!("{}...", &s[..max_len - 3])
    }
}
