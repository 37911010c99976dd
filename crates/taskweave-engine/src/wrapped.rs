//! Detection of commands grouped in a `label: [cmd1, cmd2]` annotation.
//!
//! Runs over candidates that were already extracted, using their offsets
//! to look at the text around each command. Callers honor only the last
//! wrapper found in a message.

use taskweave_core::types::CandidateTask;

use crate::charclass::{is_newline, is_whitespace};

/// Most whitespace characters tolerated between wrapper punctuation and a
/// command.
pub const WRAPPER_TOLERANCE: usize = 5;

/// One bracketed annotation and the candidates inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrappedTasks {
    /// Indices into the candidate slice, ascending.
    pub task_indices: Vec<usize>,
    /// Byte offset of the label.
    pub wrapper_start: usize,
    /// Exclusive byte offset just past the closing `]`.
    pub wrapper_end: usize,
}

fn is_gap(c: char) -> bool {
    is_whitespace(c) || is_newline(c)
}

/// Offset of `target` found by walking back from `from` over whitespace.
fn find_before(text: &str, from: usize, target: char) -> Option<usize> {
    let mut skipped = 0;
    for (idx, c) in text.get(..from)?.char_indices().rev() {
        if c == target {
            return Some(idx);
        }
        if !is_gap(c) || skipped == WRAPPER_TOLERANCE {
            return None;
        }
        skipped += 1;
    }
    None
}

/// Offset of `target` found by walking forward from `from` over whitespace.
fn find_after(text: &str, from: usize, target: &str) -> Option<usize> {
    if target.is_empty() {
        return None;
    }
    let mut skipped = 0;
    for (idx, c) in text.get(from..)?.char_indices() {
        let pos = from + idx;
        if text[pos..].starts_with(target) {
            return Some(pos);
        }
        if !is_gap(c) || skipped == WRAPPER_TOLERANCE {
            return None;
        }
        skipped += 1;
    }
    None
}

/// Start of `label: [` opening just before `start`, if any.
fn wrapper_opening(text: &str, start: usize, label: &str) -> Option<usize> {
    let bracket = find_before(text, start, '[')?;
    let colon = find_before(text, bracket, ':')?;
    let label_start = colon.checked_sub(label.len())?;
    text.get(label_start..colon)?
        .eq_ignore_ascii_case(label)
        .then_some(label_start)
}

fn is_short_gap(text: &str, from: usize, to: usize) -> bool {
    match text.get(from..to) {
        Some(gap) => gap.chars().count() <= WRAPPER_TOLERANCE && gap.chars().all(is_gap),
        None => false,
    }
}

/// Find every `label: [...]` annotation that encloses extracted commands.
///
/// Without a delimiter a wrapper holds exactly one command. With one,
/// consecutive commands separated by the delimiter share a wrapper.
pub fn find_wrapped_tasks(
    text: &str,
    candidates: &[CandidateTask],
    label: &str,
    delimiter: Option<&str>,
) -> Vec<WrappedTasks> {
    let mut results = Vec::new();
    // Wrapper start and the offset the next member must follow.
    let mut open: Option<(usize, usize)> = None;

    for candidate in candidates {
        if let Some((_, resume)) = open {
            if !is_short_gap(text, resume, candidate.start) {
                open = None;
            }
        }

        let wrapper_start = match open {
            Some((wrapper_start, _)) => wrapper_start,
            None => match wrapper_opening(text, candidate.start, label) {
                Some(wrapper_start) => wrapper_start,
                None => continue,
            },
        };

        let ends_on_newline = text
            .get(candidate.end..)
            .is_some_and(|rest| rest.starts_with(is_newline));
        let closing = find_after(text, candidate.end, "]").filter(|_| !ends_on_newline);

        if let Some(close) = closing {
            let task_indices = candidates
                .iter()
                .enumerate()
                .filter(|(_, c)| c.start >= wrapper_start && c.end <= close)
                .map(|(i, _)| i)
                .collect();
            results.push(WrappedTasks {
                task_indices,
                wrapper_start,
                wrapper_end: close + 1,
            });
            open = None;
            continue;
        }

        open = delimiter
            .and_then(|d| find_after(text, candidate.end, d).map(|pos| pos + d.len()))
            .map(|resume| (wrapper_start, resume));
    }

    results
}
