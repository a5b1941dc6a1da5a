//! Quiz history summaries and the interactive quiz runner.

use crate::api::{Quiz, QuizEvaluation, QuizResult};
use chrono::NaiveDateTime;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;
use std::io::{self, BufRead, Write};

/// Per-topic view of quiz history.
#[derive(Debug, Clone, PartialEq)]
pub struct TopicProgress {
    pub topic: String,
    pub attempts: usize,
    pub best: f64,
    pub latest: f64,
    pub average: f64,
    /// Latest score minus the one before it; `None` after a single attempt.
    pub trend: Option<f64>,
    pub last_attempt: NaiveDateTime,
}

/// Group results by topic, most recently attempted topic first.
///
/// Input order does not matter; attempts are ordered by timestamp.
pub fn summarize(history: &[QuizResult]) -> Vec<TopicProgress> {
    let mut by_topic: HashMap<&str, Vec<&QuizResult>> = HashMap::new();
    for result in history {
        by_topic.entry(result.topic.as_str()).or_default().push(result);
    }

    let mut summaries: Vec<TopicProgress> = by_topic
        .into_iter()
        .filter_map(|(topic, mut attempts)| {
            attempts.sort_by_key(|r| (r.created_at, r.id));
            let latest = attempts.last()?;
            let previous = attempts.len().checked_sub(2).map(|i| attempts[i]);
            let total: f64 = attempts.iter().map(|r| r.score).sum();
            Some(TopicProgress {
                topic: topic.to_string(),
                attempts: attempts.len(),
                best: attempts.iter().map(|r| r.score).fold(f64::MIN, f64::max),
                latest: latest.score,
                average: total / attempts.len() as f64,
                trend: previous.map(|p| latest.score - p.score),
                last_attempt: latest.created_at,
            })
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.last_attempt
            .cmp(&a.last_attempt)
            .then_with(|| a.topic.cmp(&b.topic))
    });
    summaries
}

/// Plain-text table of summaries for the `history` subcommand.
pub fn format_summaries(summaries: &[TopicProgress]) -> String {
    if summaries.is_empty() {
        return "No quiz history yet.\n".to_string();
    }

    let width = summaries
        .iter()
        .map(|s| crate::util::display_width(&s.topic))
        .max()
        .unwrap_or(0)
        .max("Topic".len());

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<width$}  {:>8}  {:>6}  {:>6}  {:>7}  {:>7}  Last attempt",
        "Topic", "Attempts", "Best", "Latest", "Average", "Trend"
    );
    for s in summaries {
        let pad = width.saturating_sub(crate::util::display_width(&s.topic));
        let _ = writeln!(
            out,
            "{}{}  {:>8}  {:>6.1}  {:>6.1}  {:>7.1}  {:>7}  {}",
            s.topic,
            " ".repeat(pad),
            s.attempts,
            s.best,
            s.latest,
            s.average,
            format_trend(s.trend),
            s.last_attempt.format("%Y-%m-%d %H:%M"),
        );
    }
    out
}

/// "+12.5", "-3.0", or "-" with no previous attempt.
pub fn format_trend(trend: Option<f64>) -> String {
    match trend {
        Some(t) if t >= 0.0 => format!("+{:.1}", t),
        Some(t) => format!("{:.1}", t),
        None => "-".to_string(),
    }
}

// ============================================================================
// Quiz runner
// ============================================================================

/// Resolve an answer typed as a letter (`b`) or a 1-based number (`2`).
pub fn parse_answer(input: &str, option_count: usize) -> Option<usize> {
    let input = input.trim();
    if let Ok(n) = input.parse::<usize>() {
        return (1..=option_count).contains(&n).then(|| n - 1);
    }

    let mut chars = input.chars();
    let letter = chars.next()?.to_ascii_lowercase();
    if chars.next().is_some() || !letter.is_ascii_lowercase() {
        return None;
    }
    let index = (letter as u8 - b'a') as usize;
    (index < option_count).then_some(index)
}

fn option_label(index: usize) -> char {
    (b'a' + (index % 26) as u8) as char
}

/// Ask every question on `out`, reading answers from `input`.
///
/// Invalid answers are asked again. End of input stops early and leaves the
/// remaining questions unanswered. Answers are the chosen option text, keyed
/// by question index.
pub fn run_quiz<R: BufRead, W: Write>(
    quiz: &Quiz,
    mut input: R,
    mut out: W,
) -> io::Result<BTreeMap<usize, String>> {
    let mut answers = BTreeMap::new();
    let total = quiz.questions.len();

    'questions: for (i, question) in quiz.questions.iter().enumerate() {
        writeln!(out, "\n[{}/{}] {}", i + 1, total, question.question)?;
        for (j, option) in question.options.iter().enumerate() {
            writeln!(out, "  {}) {}", option_label(j), option)?;
        }
        if question.options.is_empty() {
            continue;
        }

        loop {
            write!(out, "> ")?;
            out.flush()?;
            let mut line = String::new();
            if input.read_line(&mut line)? == 0 {
                break 'questions;
            }
            match parse_answer(&line, question.options.len()) {
                Some(choice) => {
                    answers.insert(i, question.options[choice].clone());
                    break;
                }
                None => writeln!(
                    out,
                    "Answer with a letter (a-{}) or a number (1-{}).",
                    option_label(question.options.len() - 1),
                    question.options.len()
                )?,
            }
        }
    }

    Ok(answers)
}

/// Result line printed after a submitted quiz.
pub fn format_evaluation(eval: &QuizEvaluation) -> String {
    let mut line = format!(
        "Score: {:.1}% ({}/{} correct)",
        eval.score, eval.correct_answers, eval.total_questions
    );
    if let Some(best) = eval.previous_best_score {
        if eval.score > best {
            let _ = write!(line, " - new best, previously {:.1}%", best);
        } else {
            let _ = write!(line, " - best so far {:.1}%", best);
        }
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::QuizQuestion;
    use pretty_assertions::assert_eq;

    fn result(id: i64, topic: &str, score: f64, day: u32) -> QuizResult {
        QuizResult {
            id,
            topic: topic.to_string(),
            score,
            created_at: chrono::NaiveDate::from_ymd_opt(2024, 3, day)
                .and_then(|d| d.and_hms_opt(12, 0, 0))
                .unwrap(),
            username: None,
        }
    }

    fn quiz() -> Quiz {
        Quiz {
            questions: vec![
                QuizQuestion {
                    question: "Which layer does TCP live in?".to_string(),
                    options: vec!["Link".into(), "Transport".into(), "Application".into()],
                    correct_answer: Some("Transport".to_string()),
                },
                QuizQuestion {
                    question: "Default HTTP port?".to_string(),
                    options: vec!["21".into(), "80".into()],
                    correct_answer: Some("80".to_string()),
                },
            ],
        }
    }

    #[test]
    fn test_summarize_groups_and_orders_by_recency() {
        let history = vec![
            result(1, "Rust", 40.0, 1),
            result(2, "Networking", 50.0, 2),
            result(3, "Rust", 80.0, 3),
            result(4, "Rust", 60.0, 5),
        ];
        let summaries = summarize(&history);

        assert_eq!(summaries.len(), 2);
        let rust = &summaries[0];
        assert_eq!(rust.topic, "Rust");
        assert_eq!(rust.attempts, 3);
        assert_eq!(rust.best, 80.0);
        assert_eq!(rust.latest, 60.0);
        assert_eq!(rust.average, 60.0);
        assert_eq!(rust.trend, Some(-20.0));

        assert_eq!(summaries[1].topic, "Networking");
        assert_eq!(summaries[1].trend, None);
    }

    #[test]
    fn test_summarize_empty() {
        assert!(summarize(&[]).is_empty());
        assert_eq!(format_summaries(&[]), "No quiz history yet.\n");
    }

    #[test]
    fn test_format_summaries_lists_topics() {
        let table = format_summaries(&summarize(&[result(1, "Rust", 75.0, 2)]));
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Topic"));
        assert!(lines[1].starts_with("Rust "));
        assert!(lines[1].contains("75.0"));
        assert!(lines[1].ends_with("2024-03-02 12:00"));
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("b", 3), Some(1));
        assert_eq!(parse_answer(" C \n", 3), Some(2));
        assert_eq!(parse_answer("1", 3), Some(0));
        assert_eq!(parse_answer("4", 3), None);
        assert_eq!(parse_answer("0", 3), None);
        assert_eq!(parse_answer("d", 3), None);
        assert_eq!(parse_answer("ab", 3), None);
        assert_eq!(parse_answer("", 3), None);
    }

    #[test]
    fn test_run_quiz_records_option_text() {
        let input = b"x\nb\n2\n" as &[u8];
        let mut out = Vec::new();
        let answers = run_quiz(&quiz(), input, &mut out).unwrap();

        assert_eq!(answers.get(&0).map(String::as_str), Some("Transport"));
        assert_eq!(answers.get(&1).map(String::as_str), Some("80"));
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.contains("Answer with a letter (a-c) or a number (1-3)."));
        assert!(printed.contains("  b) Transport"));
    }

    #[test]
    fn test_run_quiz_stops_at_end_of_input() {
        let answers = run_quiz(&quiz(), b"a\n" as &[u8], io::sink()).unwrap();
        assert_eq!(answers.len(), 1);
    }

    #[test]
    fn test_format_evaluation() {
        let eval = QuizEvaluation {
            score: 75.0,
            correct_answers: 3,
            total_questions: 4,
            previous_best_score: Some(50.0),
        };
        assert_eq!(
            format_evaluation(&eval),
            "Score: 75.0% (3/4 correct) - new best, previously 50.0%"
        );
        assert_eq!(format_trend(Some(2.0)), "+2.0");
        assert_eq!(format_trend(Some(-1.5)), "-1.5");
    }
}
