//! Single-pass transition state machine for slash commands in prose.
//!
//! Each call to [`transition`] consumes one character and returns the next
//! [`TransitionState`] together with the lifecycle events the character
//! produced. The machine never looks ahead and never re-reads consumed
//! characters, so a full pass over a message is linear in its length.
//!
//! Sections:
//! - `Outside`: background prose, watching for `/` at a word boundary and
//!   for code openers.
//! - `Code`: inline, fenced or `<code>` regions. Commands inside are ignored.
//! - `Command`: the word after `/`.
//! - `Action`: the next word, which may turn out to be a property name.
//! - `PropName` / `PropValue`: `name=value` pairs.

use taskweave_core::types::{parse_finite, PropertyValue};

use crate::charclass::{is_alphanumeric, is_newline, is_whitespace};

/// Longest command, action or property name accepted.
pub const MAX_TOKEN_LEN: usize = 32;

const CODE_TAG: &str = "<code>";
const CODE_TAG_CLOSE: &str = "</code";
const FENCE: &str = "```";
const BARE_LITERALS: [&str; 3] = ["null", "true", "false"];

// =============================================================================
// State and events
// =============================================================================

/// Which handler processes the next character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseSection {
    #[default]
    Outside,
    Code,
    Command,
    Action,
    PropName,
    PropValue,
}

/// State carried from one character to the next.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TransitionState {
    pub section: ParseSection,
    /// The token being accumulated. Emptied on every section change.
    pub buffer: String,
    /// Set while inside a `[...]` wrapper, where `]` and `,` end a command.
    pub has_open_bracket: bool,
}

impl TransitionState {
    fn enter(section: ParseSection, has_open_bracket: bool) -> Self {
        Self {
            section,
            buffer: String::new(),
            has_open_bracket,
        }
    }

    fn outside(has_open_bracket: bool) -> Self {
        Self::enter(ParseSection::Outside, has_open_bracket)
    }

    fn code(marker: &str, has_open_bracket: bool) -> Self {
        Self {
            section: ParseSection::Code,
            buffer: marker.to_string(),
            has_open_bracket,
        }
    }
}

/// A finished token handed to the accumulator.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Command(String),
    Action(String),
    PropName(String),
    PropValue(PropertyValue),
}

/// Lifecycle events produced by a single step.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionEvent {
    /// A new candidate begins at the `/` at `index`.
    Start { index: usize },
    /// A token ended at `index` (the byte offset of the terminating character).
    Commit { token: Token, index: usize },
    /// The open candidate is finished; later commits belong to a new one.
    Complete,
    /// The open candidate, if any, is discarded.
    Cancel,
}

/// The character being consumed and its context.
#[derive(Debug, Clone, Copy)]
pub struct StepInput {
    pub curr: char,
    /// The previous character. `None` means start of input.
    pub prev: Option<char>,
    /// Byte offset of `curr` in the input.
    pub index: usize,
}

/// Advance the machine by one character.
pub fn transition(
    state: TransitionState,
    input: StepInput,
) -> (TransitionState, Vec<TransitionEvent>) {
    let mut events = Vec::new();
    let next = match state.section {
        ParseSection::Outside => on_outside(state, input, &mut events),
        ParseSection::Code => on_code(state, input, &mut events),
        ParseSection::Command => on_command(state, input, &mut events),
        ParseSection::Action => on_action(state, input, &mut events),
        ParseSection::PropName => on_prop_name(state, input, &mut events),
        ParseSection::PropValue => on_prop_value(state, input, &mut events),
    };
    (next, events)
}

// =============================================================================
// Helpers
// =============================================================================

fn is_boundary(prev: Option<char>) -> bool {
    prev.map_or(true, |p| is_whitespace(p) || is_newline(p))
}

fn is_quote(c: char) -> bool {
    c == '\'' || c == '"'
}

/// Bracket flag after leaving a command on `curr`.
fn bracket_after(curr: char, has_open_bracket: bool) -> bool {
    has_open_bracket && curr != ']'
}

fn ends_wrapper_item(curr: char, has_open_bracket: bool) -> bool {
    has_open_bracket && (curr == ']' || curr == ',')
}

fn trailing_run(buffer: &str, c: char) -> usize {
    buffer.chars().rev().take_while(|&b| b == c).count()
}

/// Code marker completed at the end of `buffer`, given the character after it.
///
/// A run of backticks is only judged once a non-backtick arrives, so two,
/// four or five backticks never open a region.
fn code_opener(buffer: &str, curr: char) -> Option<&'static str> {
    if buffer.ends_with(CODE_TAG) {
        return Some(CODE_TAG);
    }
    if curr == '`' {
        return None;
    }
    match trailing_run(buffer, '`') {
        3 => Some(FENCE),
        1 if !is_newline(curr) => Some("`"),
        _ => None,
    }
}

/// Whether `candidate` can still grow into a finite number.
fn is_number_prefix(candidate: &str) -> bool {
    if matches!(candidate, "-" | "." | "-.") || parse_finite(candidate).is_some() {
        return true;
    }
    // Incomplete exponent, as in `1e` or `2.5e-`.
    let unsigned = candidate
        .strip_suffix(|c: char| c == '+' || c == '-')
        .unwrap_or(candidate);
    unsigned
        .strip_suffix(|c: char| c == 'e' || c == 'E')
        .is_some_and(|mantissa| parse_finite(mantissa).is_some())
}

/// Whether `curr` keeps an unquoted value a plausible number or literal.
fn accepts_bare(buffer: &str, curr: char) -> bool {
    let mut candidate = String::with_capacity(buffer.len() + curr.len_utf8());
    candidate.push_str(buffer);
    candidate.push(curr);
    is_number_prefix(&candidate) || BARE_LITERALS.iter().any(|lit| lit.starts_with(&candidate))
}

/// Leave a command on a non-identifier character. A backtick right after
/// whitespace opens an inline code region.
fn leave_on_symbol(input: StepInput, has_open_bracket: bool) -> TransitionState {
    if input.curr == '`' && input.prev.is_some_and(is_whitespace) {
        TransitionState::code("`", has_open_bracket)
    } else {
        TransitionState::outside(bracket_after(input.curr, has_open_bracket))
    }
}

// =============================================================================
// Section handlers
// =============================================================================

fn on_outside(
    state: TransitionState,
    input: StepInput,
    events: &mut Vec<TransitionEvent>,
) -> TransitionState {
    let TransitionState {
        mut buffer,
        mut has_open_bracket,
        ..
    } = state;
    let StepInput { curr, prev, index } = input;

    match prev {
        Some('[') => has_open_bracket = true,
        Some(p) if p == ']' || is_newline(p) => has_open_bracket = false,
        Some(p) if !is_whitespace(p) && p != ',' => has_open_bracket = false,
        _ => {}
    }

    if let Some(marker) = code_opener(&buffer, curr) {
        let mut next = TransitionState::code(marker, has_open_bracket);
        next.buffer.push(curr);
        return next;
    }

    let starts_command = is_boundary(prev)
        || prev == Some('[')
        || (has_open_bracket && prev == Some(','));
    if curr == '/' && starts_command {
        events.push(TransitionEvent::Start { index });
        return TransitionState::enter(ParseSection::Command, has_open_bracket);
    }

    if is_whitespace(curr) || is_newline(curr) {
        return TransitionState::outside(has_open_bracket);
    }

    buffer.push(curr);
    TransitionState {
        section: ParseSection::Outside,
        buffer,
        has_open_bracket,
    }
}

fn on_code(
    state: TransitionState,
    input: StepInput,
    events: &mut Vec<TransitionEvent>,
) -> TransitionState {
    let TransitionState {
        mut buffer,
        has_open_bracket,
        ..
    } = state;
    let curr = input.curr;

    if buffer.starts_with(FENCE) {
        // Any backtick pair after the opener closes the fence. The rest of
        // the closing run is swallowed so its last tick cannot open inline
        // code, and the first character after it is handled as prose.
        let closing_run = buffer[FENCE.len()..].ends_with("``");
        if closing_run && curr != '`' {
            events.push(TransitionEvent::Cancel);
            return on_outside(TransitionState::outside(has_open_bracket), input, events);
        }
    } else {
        let closes = if buffer.starts_with('<') {
            curr == '>' && buffer.ends_with(CODE_TAG_CLOSE)
        } else {
            is_newline(curr) || curr == '`'
        };
        if closes {
            events.push(TransitionEvent::Cancel);
            return TransitionState::outside(has_open_bracket);
        }
    }

    buffer.push(curr);
    TransitionState {
        section: ParseSection::Code,
        buffer,
        has_open_bracket,
    }
}

fn on_command(
    state: TransitionState,
    input: StepInput,
    events: &mut Vec<TransitionEvent>,
) -> TransitionState {
    let TransitionState {
        mut buffer,
        has_open_bracket,
        ..
    } = state;
    let StepInput { curr, index, .. } = input;

    let terminates =
        is_whitespace(curr) || is_newline(curr) || ends_wrapper_item(curr, has_open_bracket);
    if curr == '/' || (terminates && buffer.is_empty()) {
        events.push(TransitionEvent::Cancel);
        return TransitionState::outside(has_open_bracket);
    }

    if terminates {
        events.push(TransitionEvent::Commit {
            token: Token::Command(buffer),
            index,
        });
        if is_whitespace(curr) {
            return TransitionState::enter(ParseSection::Action, has_open_bracket);
        }
        events.push(TransitionEvent::Complete);
        return TransitionState::outside(bracket_after(curr, has_open_bracket));
    }

    if !is_alphanumeric(curr) || buffer.len() >= MAX_TOKEN_LEN {
        events.push(TransitionEvent::Cancel);
        return TransitionState::outside(has_open_bracket);
    }

    buffer.push(curr);
    TransitionState {
        section: ParseSection::Command,
        buffer,
        has_open_bracket,
    }
}

fn on_action(
    state: TransitionState,
    input: StepInput,
    events: &mut Vec<TransitionEvent>,
) -> TransitionState {
    let TransitionState {
        mut buffer,
        has_open_bracket,
        ..
    } = state;
    let StepInput { curr, prev, index } = input;

    if is_newline(curr) || ends_wrapper_item(curr, has_open_bracket) {
        if !buffer.is_empty() {
            events.push(TransitionEvent::Commit {
                token: Token::Action(buffer),
                index,
            });
        }
        events.push(TransitionEvent::Complete);
        return TransitionState::outside(bracket_after(curr, has_open_bracket));
    }

    if is_whitespace(curr) {
        if buffer.is_empty() {
            return TransitionState::enter(ParseSection::Action, has_open_bracket);
        }
        events.push(TransitionEvent::Commit {
            token: Token::Action(buffer),
            index,
        });
        return TransitionState::enter(ParseSection::PropName, has_open_bracket);
    }

    if curr == '/' {
        if !prev.is_some_and(is_whitespace) {
            events.push(TransitionEvent::Complete);
            return TransitionState::outside(has_open_bracket);
        }
        if !buffer.is_empty() {
            events.push(TransitionEvent::Commit {
                token: Token::Action(buffer),
                index,
            });
        }
        events.push(TransitionEvent::Complete);
        events.push(TransitionEvent::Start { index });
        return TransitionState::enter(ParseSection::Command, has_open_bracket);
    }

    if curr == '=' {
        if buffer.is_empty() {
            events.push(TransitionEvent::Complete);
            return TransitionState::outside(has_open_bracket);
        }
        events.push(TransitionEvent::Commit {
            token: Token::PropName(buffer),
            index,
        });
        return TransitionState::enter(ParseSection::PropValue, has_open_bracket);
    }

    if !is_alphanumeric(curr) {
        events.push(TransitionEvent::Complete);
        return leave_on_symbol(input, has_open_bracket);
    }

    if buffer.len() >= MAX_TOKEN_LEN {
        events.push(TransitionEvent::Complete);
        return TransitionState::outside(has_open_bracket);
    }

    buffer.push(curr);
    TransitionState {
        section: ParseSection::Action,
        buffer,
        has_open_bracket,
    }
}

fn on_prop_name(
    state: TransitionState,
    input: StepInput,
    events: &mut Vec<TransitionEvent>,
) -> TransitionState {
    let TransitionState {
        mut buffer,
        has_open_bracket,
        ..
    } = state;
    let StepInput { curr, prev, index } = input;

    if curr == '=' {
        if buffer.is_empty() {
            events.push(TransitionEvent::Complete);
            return TransitionState::outside(has_open_bracket);
        }
        events.push(TransitionEvent::Commit {
            token: Token::PropName(buffer),
            index,
        });
        return TransitionState::enter(ParseSection::PropValue, has_open_bracket);
    }

    if curr == '/' {
        events.push(TransitionEvent::Complete);
        if prev.is_some_and(is_whitespace) {
            events.push(TransitionEvent::Start { index });
            return TransitionState::enter(ParseSection::Command, has_open_bracket);
        }
        return TransitionState::outside(has_open_bracket);
    }

    if is_whitespace(curr) {
        if buffer.is_empty() {
            return TransitionState::enter(ParseSection::PropName, has_open_bracket);
        }
        // A bare word with no `=` ends the command.
        events.push(TransitionEvent::Complete);
        return TransitionState::outside(has_open_bracket);
    }

    if is_newline(curr) {
        events.push(TransitionEvent::Complete);
        return TransitionState::outside(has_open_bracket);
    }

    if !is_alphanumeric(curr) {
        events.push(TransitionEvent::Complete);
        return leave_on_symbol(input, has_open_bracket);
    }

    if buffer.len() >= MAX_TOKEN_LEN {
        events.push(TransitionEvent::Complete);
        return TransitionState::outside(has_open_bracket);
    }

    buffer.push(curr);
    TransitionState {
        section: ParseSection::PropName,
        buffer,
        has_open_bracket,
    }
}

fn on_prop_value(
    state: TransitionState,
    input: StepInput,
    events: &mut Vec<TransitionEvent>,
) -> TransitionState {
    let TransitionState {
        mut buffer,
        has_open_bracket,
        ..
    } = state;
    let StepInput { curr, index, .. } = input;

    if let Some(quote) = buffer.chars().next().filter(|&c| is_quote(c)) {
        // Only an unescaped matching quote closes the string.
        if curr == quote && trailing_run(&buffer, '\\') % 2 == 0 {
            let value = buffer[quote.len_utf8()..].to_string();
            events.push(TransitionEvent::Commit {
                token: Token::PropValue(PropertyValue::String(value)),
                index,
            });
            return TransitionState::enter(ParseSection::PropName, has_open_bracket);
        }
        buffer.push(curr);
        return TransitionState {
            section: ParseSection::PropValue,
            buffer,
            has_open_bracket,
        };
    }

    if buffer.is_empty() && is_quote(curr) {
        buffer.push(curr);
        return TransitionState {
            section: ParseSection::PropValue,
            buffer,
            has_open_bracket,
        };
    }

    if is_whitespace(curr) || is_newline(curr) || ends_wrapper_item(curr, has_open_bracket) {
        let Some(value) = PropertyValue::from_bare_literal(&buffer) else {
            events.push(TransitionEvent::Complete);
            return TransitionState::outside(bracket_after(curr, has_open_bracket));
        };
        events.push(TransitionEvent::Commit {
            token: Token::PropValue(value),
            index,
        });
        if is_whitespace(curr) {
            return TransitionState::enter(ParseSection::PropName, has_open_bracket);
        }
        events.push(TransitionEvent::Complete);
        return TransitionState::outside(bracket_after(curr, has_open_bracket));
    }

    if accepts_bare(&buffer, curr) {
        buffer.push(curr);
        return TransitionState {
            section: ParseSection::PropValue,
            buffer,
            has_open_bracket,
        };
    }

    events.push(TransitionEvent::Complete);
    TransitionState::outside(bracket_after(curr, has_open_bracket))
}
