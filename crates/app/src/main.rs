#![forbid(unsafe_code)]

use std::error::Error;
use std::sync::Arc;

use clap::Parser;
use quiz_core::selection::{ExamFilter, exam_catalogue};
use quiz_core::token::QuizToken;
use services::{Clock, HistoryService, QuizOrchestrator, SessionError, WatchIdentityProvider};
use storage::bank::{QuestionSource, source_for};
use storage::repository::Storage;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod cli;
mod console;
mod db;
mod play;

use cli::{Cli, Command};
use db::prepare_sqlite_file;

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let source: Arc<dyn QuestionSource> = Arc::from(source_for(&cli.bank));
    if matches!(cli.command, Command::Exams) {
        return list_exams(source.as_ref()).await;
    }

    // Open + migrate SQLite at startup; services never see a URL.
    let db_url = cli.db_url();
    prepare_sqlite_file(&db_url)?;
    let storage = Storage::sqlite(&db_url).await?;
    info!(db = %db_url, bank = %source.describe(), "storage ready");
    let clock = Clock::system();
    let identity = WatchIdentityProvider::new(cli.identity());

    if let Command::Profile { scores } = cli.command {
        let user = identity.current().ok_or(SessionError::NotSignedIn)?;
        let history = HistoryService::new(
            clock,
            Arc::clone(&storage.scores),
            Arc::clone(&storage.attempts),
        );
        return print_profile(&history, &user.id, scores).await;
    }

    let config = cli.command.config();
    let filter = cli.command.filter();
    let mut quiz = QuizOrchestrator::new(config, clock, &storage, source, &identity);
    quiz.sync_identity().await;
    if let Some(who) = quiz.identity() {
        println!("signed in as {}", who.label());
    }

    match cli.command {
        Command::Take { .. } => {
            quiz.set_category(filter);
            quiz.start_random().await?;
        }
        Command::Timed { link, token, .. } => {
            let link = match (link, token) {
                (Some(raw), _) => quiz.open_link(&raw).await?,
                (None, Some(token)) => quiz.open_timed(QuizToken::normalize(&token), filter).await?,
                (None, None) => {
                    quiz.set_category(filter);
                    quiz.create_timed().await?
                }
            };
            println!("share: {}", link.to_url(&cli.base_url));
        }
        Command::Exams | Command::Profile { .. } => {}
    }

    play::play(&mut quiz, &cli.base_url).await
}

async fn list_exams(source: &dyn QuestionSource) -> Result<(), Box<dyn Error>> {
    let bank = source.fetch_questions().await?;
    println!("{} questions from {}", bank.len(), source.describe());
    for exam in exam_catalogue(&bank) {
        let filter = ExamFilter::parse(&exam);
        let count = bank.iter().filter(|q| filter.matches(q)).count();
        println!("  {exam}  ({count})");
    }
    Ok(())
}

async fn print_profile(
    history: &HistoryService,
    user: &quiz_core::model::UserId,
    scores: u32,
) -> Result<(), Box<dyn Error>> {
    let stats = history.profile(user).await?;
    println!(
        "{} answers, {} correct, {}% accuracy",
        stats.total, stats.correct, stats.accuracy
    );
    for question in &stats.by_question {
        let marks: String = question
            .attempts
            .iter()
            .map(|a| if a.correct { '✓' } else { '✗' })
            .collect();
        println!("  {marks:<10} {}", question.question_text);
    }

    let recent = history.recent_scores(user, scores).await?;
    if !recent.is_empty() {
        println!();
        println!("recent scores:");
        for record in recent {
            println!(
                "  {}  {} / {}  {}",
                record.created_at.format("%Y-%m-%d %H:%M"),
                record.score,
                record.total,
                record.exam
            );
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,quiz=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        // At this layer (binary glue), printing once is fine.
        eprintln!("{err}");
        std::process::exit(2);
    }
}
