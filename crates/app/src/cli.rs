use clap::{Parser, Subcommand};
use quiz_core::selection::{CASUAL_QUIZ_SIZE, ExamFilter, TIMED_QUIZ_SIZE};
use quiz_core::timer::TIMED_QUIZ_MINUTES;
use services::{Identity, QuizConfig};

use crate::db::normalize_sqlite_url;

#[derive(Debug, Parser)]
#[command(name = "quiz", version, about = "Multiple-choice quiz sessions in the terminal")]
pub struct Cli {
    /// SQLite database for wrong answers, timers, and history
    #[arg(long = "db", env = "QUIZ_DB_URL", default_value = "sqlite://quiz.sqlite3", global = true)]
    pub db_url: String,

    /// Question bank: a JSON file path or an http(s) URL
    #[arg(long, env = "QUIZ_BANK", default_value = "questions.json", global = true)]
    pub bank: String,

    /// Signed-in user id; without it nothing is synced or saved
    #[arg(long, env = "QUIZ_USER", global = true)]
    pub user: Option<String>,

    #[arg(long, env = "QUIZ_EMAIL", global = true)]
    pub email: Option<String>,

    /// Page that share links point at
    #[arg(
        long,
        env = "QUIZ_BASE_URL",
        default_value = "https://quiz.local/timed",
        global = true
    )]
    pub base_url: url::Url,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Take a random quiz
    Take {
        /// Exam category, or "all"
        #[arg(long, default_value = "all")]
        exam: String,

        #[arg(long, default_value_t = CASUAL_QUIZ_SIZE)]
        size: usize,
    },

    /// Take a shareable timed quiz
    Timed {
        /// Exam category for a new quiz, or "all"
        #[arg(long, default_value = "all")]
        exam: String,

        /// Open the quiz behind a share link
        #[arg(long, conflicts_with = "token")]
        link: Option<String>,

        /// Open the quiz for an existing token
        #[arg(long)]
        token: Option<String>,

        #[arg(long, default_value_t = TIMED_QUIZ_MINUTES)]
        minutes: i64,

        #[arg(long, default_value_t = TIMED_QUIZ_SIZE)]
        size: usize,
    },

    /// List exam categories in the bank
    Exams,

    /// Show answer history for the signed-in user
    Profile {
        /// Number of recent scores to list
        #[arg(long, default_value_t = 5)]
        scores: u32,
    },
}

impl Cli {
    pub fn db_url(&self) -> String {
        normalize_sqlite_url(self.db_url.clone())
    }

    pub fn identity(&self) -> Option<Identity> {
        let user = self.user.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        let identity = Identity::new(user);
        Some(match &self.email {
            Some(email) => identity.with_email(email.clone()),
            None => identity,
        })
    }
}

impl Command {
    pub fn config(&self) -> QuizConfig {
        match self {
            Command::Take { size, .. } => QuizConfig::default().with_casual_size(*size),
            Command::Timed { minutes, size, .. } => QuizConfig::default()
                .with_timed_size(*size)
                .with_timed_duration(chrono::Duration::minutes(*minutes)),
            Command::Exams | Command::Profile { .. } => QuizConfig::default(),
        }
    }

    pub fn filter(&self) -> ExamFilter {
        match self {
            Command::Take { exam, .. } | Command::Timed { exam, .. } => ExamFilter::parse(exam),
            Command::Exams | Command::Profile { .. } => ExamFilter::All,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("quiz").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn take_defaults_to_casual_size_and_all() {
        let cli = parse(&["take"]);
        assert!(cli.command.filter().is_all());
        assert_eq!(cli.command.config().casual_size(), CASUAL_QUIZ_SIZE);
    }

    #[test]
    fn timed_options_feed_config() {
        let cli = parse(&["timed", "--exam", "AWS", "--minutes", "3", "--size", "4"]);
        let config = cli.command.config();
        assert_eq!(config.timed_size(), 4);
        assert_eq!(config.timed_duration(), chrono::Duration::minutes(3));
        assert_eq!(cli.command.filter(), ExamFilter::parse("AWS"));
    }

    #[test]
    fn link_and_token_conflict() {
        let err = Cli::try_parse_from(["quiz", "timed", "--link", "x", "--token", "y"]);
        assert!(err.is_err());
    }

    #[test]
    fn blank_user_means_signed_out() {
        let cli = parse(&["exams", "--user", "  "]);
        assert!(cli.identity().is_none());

        let cli = parse(&["exams", "--user", "u1", "--email", "u1@quiz.test"]);
        let who = cli.identity().unwrap();
        assert_eq!(who.id.as_str(), "u1");
        assert_eq!(who.email.as_deref(), Some("u1@quiz.test"));
    }
}
