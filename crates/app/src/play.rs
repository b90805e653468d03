use std::error::Error;
use std::io::Write as _;

use services::{EngineEvent, QuizOrchestrator, SessionError, Submission};
use tokio::io::{AsyncBufReadExt, BufReader};
use url::Url;

use crate::console::{HELP, Input, prompt, render};

/// Read commands from stdin until `quit` or end of input, reacting to timer
/// expiry and identity changes in between.
pub async fn play(quiz: &mut QuizOrchestrator, base_url: &Url) -> Result<(), Box<dyn Error>> {
    show(quiz);
    println!("type `help` for commands");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("{}", prompt(quiz.render().as_ref()));
        std::io::stdout().flush()?;

        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match Input::parse(&line) {
                    Ok(Input::Quit) => break,
                    Ok(input) => handle(quiz, input, base_url).await,
                    Err(err) => println!("{err}"),
                }
            }
            wake = quiz.wait_wake() => match quiz.apply_wake(wake).await {
                Ok(event) => report_event(quiz, event),
                Err(err) => println!("{err}"),
            },
        }
    }
    Ok(())
}

async fn handle(quiz: &mut QuizOrchestrator, input: Input, base_url: &Url) {
    let outcome = match input {
        Input::Answer { position, option } => quiz.select(position, option),
        Input::Submit => quiz.submit().await.map(|submission| {
            report_submission(&submission);
            show(quiz);
        }),
        Input::Next => {
            let drawn = quiz.start_random().await.map(|_| ());
            drawn.map(|()| show(quiz))
        }
        Input::Exam(filter) => {
            println!("category: {filter}");
            if let Some(link) = quiz.set_category(filter) {
                println!("share: {}", link.to_url(base_url));
            }
            Ok(())
        }
        Input::Restart { confirmed } => match quiz.restart(confirmed).await {
            Err(SessionError::RestartNotConfirmed) => {
                println!("restart clears your answers and resets the timer; type `restart yes`");
                Ok(())
            }
            other => other.map(|()| show(quiz)),
        },
        Input::Link => {
            match quiz.share_url(base_url) {
                Some(url) => println!("share: {url}"),
                None => println!("no timed quiz is open"),
            }
            Ok(())
        }
        Input::Time => {
            match quiz.countdown() {
                Some(countdown) => println!("time left {}", countdown.remaining_label()),
                None => println!("this quiz is not timed"),
            }
            Ok(())
        }
        Input::Save => quiz
            .save_score()
            .await
            .map(|record| println!("saved {} / {} for {}", record.score, record.total, record.exam)),
        Input::Show => {
            show(quiz);
            Ok(())
        }
        Input::Help => {
            println!("{HELP}");
            Ok(())
        }
        Input::Quit | Input::Empty => Ok(()),
    };

    if let Err(err) = outcome {
        println!("{err}");
    }
}

fn report_event(quiz: &QuizOrchestrator, event: EngineEvent) {
    match event {
        EngineEvent::IdentityChanged(Some(who)) => println!("signed in as {}", who.label()),
        EngineEvent::IdentityChanged(None) => println!("signed out"),
        EngineEvent::TimerExpired(Some(submission)) => {
            println!();
            println!("time is up");
            report_submission(&submission);
            show(quiz);
        }
        EngineEvent::TimerExpired(None) => {}
    }
}

fn report_submission(submission: &Submission) {
    println!(
        "score {} ({}%)",
        submission.result.score_label(),
        submission.result.percent()
    );
    if let Some(report) = &submission.sync {
        if !report.is_clean() {
            println!(
                "{} wrong-answer updates could not be saved",
                report.failures.len()
            );
        }
    }
    if submission.failed_attempts > 0 {
        println!("{} answers missing from history", submission.failed_attempts);
    }
}

fn show(quiz: &QuizOrchestrator) {
    match quiz.render() {
        Some(view) => print!("{}", render(&view)),
        None => println!("no quiz drawn yet; type `next`"),
    }
}
