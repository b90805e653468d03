//! Terminal input and output for an interactive quiz.

use std::fmt::{self, Write as _};

use quiz_core::grading::OptionMark;
use quiz_core::selection::ExamFilter;
use services::{Phase, SessionView};

pub const HELP: &str = "\
Commands:
  <n><letter>     answer question n, e.g. 3b
  submit | s      grade the quiz
  next | n        draw a new random quiz
  exam <name>     switch category (\"all\" for every exam)
  restart [yes]   restart a timed quiz from zero
  link            print the share link of a timed quiz
  time            show the time left
  save            save the graded score
  show            print the quiz again
  help | ?        this list
  quit | q        leave";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Answer { position: usize, option: usize },
    Submit,
    Next,
    Exam(ExamFilter),
    Restart { confirmed: bool },
    Link,
    Time,
    Save,
    Show,
    Help,
    Quit,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownInput(pub String);

impl fmt::Display for UnknownInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "not understood: {:?} (type `help`)", self.0)
    }
}

impl std::error::Error for UnknownInput {}

impl Input {
    pub fn parse(line: &str) -> Result<Self, UnknownInput> {
        let line = line.trim();
        let (word, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(w, r)| (w, r.trim()));

        let input = match word.to_ascii_lowercase().as_str() {
            "" => Self::Empty,
            "submit" | "s" => Self::Submit,
            "next" | "n" | "shuffle" => Self::Next,
            "exam" if !rest.is_empty() => Self::Exam(ExamFilter::parse(rest)),
            "restart" => Self::Restart {
                confirmed: rest.eq_ignore_ascii_case("yes"),
            },
            "link" => Self::Link,
            "time" => Self::Time,
            "save" => Self::Save,
            "show" => Self::Show,
            "help" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            _ => parse_answer(&line.replace(char::is_whitespace, ""))
                .ok_or_else(|| UnknownInput(line.to_string()))?,
        };
        Ok(input)
    }
}

/// `3b` or `3 b`: 1-based question number, then an option letter.
fn parse_answer(compact: &str) -> Option<Input> {
    let split = compact.find(|c: char| !c.is_ascii_digit())?;
    let (number, letter) = compact.split_at(split);
    let position = number.parse::<usize>().ok()?.checked_sub(1)?;

    let mut chars = letter.chars();
    let letter = chars.next()?.to_ascii_lowercase();
    if chars.next().is_some() || !letter.is_ascii_lowercase() {
        return None;
    }
    let option = usize::from(letter as u8 - b'a');
    Some(Input::Answer { position, option })
}

pub fn option_letter(index: usize) -> String {
    u8::try_from(index)
        .ok()
        .filter(|i| *i < 26)
        .map_or_else(|| (index + 1).to_string(), |i| char::from(b'a' + i).to_string())
}

pub fn render(view: &SessionView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "── exam: {} ──", view.filter);
    if let Some(remaining) = &view.remaining {
        let _ = writeln!(out, "time left {remaining}");
    }

    for question in &view.questions {
        let _ = writeln!(out);
        let _ = write!(out, "{}. [{}]", question.number, question.meta);
        if let Some(count) = question.previously_missed {
            let _ = write!(out, " (missed {count}×)");
        }
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", question.prompt);
        if let Some(image) = &question.image {
            let _ = writeln!(out, "   image: {image}");
        }

        for option in &question.options {
            let mark = match option.mark {
                OptionMark::Plain => ' ',
                OptionMark::Correct => '✓',
                OptionMark::Wrong => '✗',
            };
            let pick = if option.selected { '>' } else { ' ' };
            let _ = writeln!(
                out,
                " {pick}{mark} {}) {}",
                option_letter(option.index),
                option.label
            );
        }

        if let Some(explanation) = &question.explanation {
            let _ = writeln!(out, "   explanation: {explanation}");
        }
    }

    if let Some(score) = &view.score {
        let _ = writeln!(out);
        let _ = writeln!(out, "score {} ({}%)", score.label, score.percent);
    }
    out
}

pub fn prompt(view: Option<&SessionView>) -> String {
    match view {
        Some(view) if view.phase == Phase::Graded => "graded> ".into(),
        Some(view) => match &view.remaining {
            Some(remaining) => format!("{remaining}> "),
            None => "> ".into(),
        },
        None => "> ".into(),
    }
}
