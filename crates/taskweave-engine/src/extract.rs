//! Text-mode task extraction.
//!
//! Drives the transition state machine over a message and folds its
//! lifecycle events into [`CandidateTask`] records with byte offsets.

use taskweave_core::schema::TaskResolver;
use taskweave_core::types::{CandidateTask, Properties, PropertyValue};

use crate::transition::{transition, StepInput, Token, TransitionEvent, TransitionState};

/// A command being assembled from committed tokens.
#[derive(Debug, Clone, Default)]
struct PendingCommand {
    start: usize,
    end: usize,
    command: Option<String>,
    action: Option<String>,
    /// Property names in commit order, each with its value once committed.
    properties: Vec<(String, Option<PropertyValue>)>,
}

/// Folds transition events into candidate tasks.
struct CommandAccumulator<'r> {
    resolver: &'r dyn TaskResolver,
    current: Option<PendingCommand>,
    tasks: Vec<CandidateTask>,
}

impl<'r> CommandAccumulator<'r> {
    fn new(resolver: &'r dyn TaskResolver) -> Self {
        Self {
            resolver,
            current: None,
            tasks: Vec::new(),
        }
    }

    fn apply(&mut self, event: TransitionEvent) {
        match event {
            TransitionEvent::Start { index } => {
                self.current = Some(PendingCommand {
                    start: index,
                    end: index,
                    ..PendingCommand::default()
                });
            }
            TransitionEvent::Commit { token, index } => self.commit(token, index),
            TransitionEvent::Complete => self.complete(),
            TransitionEvent::Cancel => self.current = None,
        }
    }

    fn commit(&mut self, token: Token, index: usize) {
        let Some(pending) = self.current.as_mut() else {
            return;
        };
        match token {
            Token::Command(command) => {
                pending.command = Some(command);
                pending.end = index;
            }
            Token::Action(action) => {
                pending.action = Some(action);
                pending.end = index;
            }
            Token::PropName(name) => pending.properties.push((name, None)),
            Token::PropValue(value) => {
                // The closing quote sits at `index`, so a string ends one past it.
                pending.end = if value.is_string() { index + 1 } else { index };
                if let Some((_, slot @ None)) = pending.properties.last_mut() {
                    *slot = Some(value);
                }
            }
        }
    }

    fn complete(&mut self) {
        let Some(pending) = self.current.take() else {
            return;
        };
        let Some(command) = pending.command else {
            return;
        };

        let task = self
            .resolver
            .command_to_task(&command, pending.action.as_deref());

        let properties: Properties = pending
            .properties
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect();

        self.tasks.push(CandidateTask {
            task,
            command,
            action: pending.action,
            properties: (!properties.is_empty()).then_some(properties),
            start: pending.start,
            end: pending.end,
        });
    }
}

/// Incremental extractor for text that arrives in chunks.
///
/// Section, buffer, bracket flag, previous character and byte offset are
/// carried across chunk boundaries, so pushing a message in pieces yields
/// the same candidates as pushing it whole.
pub struct StreamingExtractor<'r> {
    state: TransitionState,
    prev: Option<char>,
    offset: usize,
    accumulator: CommandAccumulator<'r>,
}

impl<'r> StreamingExtractor<'r> {
    pub fn new(resolver: &'r dyn TaskResolver) -> Self {
        Self {
            state: TransitionState::default(),
            // A synthetic newline before the first character makes a
            // leading `/` a valid command start.
            prev: Some('\n'),
            offset: 0,
            accumulator: CommandAccumulator::new(resolver),
        }
    }

    /// Feed the next chunk of text.
    pub fn push(&mut self, chunk: &str) {
        for (local, curr) in chunk.char_indices() {
            self.step(curr, self.offset + local);
        }
        self.offset += chunk.len();
    }

    /// Candidates completed so far.
    pub fn completed(&self) -> &[CandidateTask] {
        &self.accumulator.tasks
    }

    /// Flush a trailing in-progress command and return every candidate.
    pub fn finish(mut self) -> Vec<CandidateTask> {
        self.step('\n', self.offset);
        self.accumulator.tasks
    }

    fn step(&mut self, curr: char, index: usize) {
        let state = std::mem::take(&mut self.state);
        let (next, events) = transition(
            state,
            StepInput {
                curr,
                prev: self.prev,
                index,
            },
        );
        self.state = next;
        self.prev = Some(curr);
        for event in events {
            self.accumulator.apply(event);
        }
    }
}

/// Extract every candidate task from a complete message.
pub fn extract_tasks(text: &str, resolver: &dyn TaskResolver) -> Vec<CandidateTask> {
    let mut extractor = StreamingExtractor::new(resolver);
    extractor.push(text);
    extractor.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskweave_core::types::TaskId;

    fn resolve(command: &str, action: Option<&str>) -> Option<TaskId> {
        match (command, action) {
            ("routine", Some("add")) => Some(TaskId::new("RoutineAdd")),
            ("add", _) => Some(TaskId::new("Add")),
            _ => None,
        }
    }

    fn extract(text: &str) -> Vec<CandidateTask> {
        extract_tasks(text, &resolve)
    }

    fn string(s: &str) -> PropertyValue {
        PropertyValue::String(s.to_string())
    }

    #[test]
    fn test_simple_command() {
        let tasks = extract("/command");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].command, "command");
        assert_eq!(tasks[0].action, None);
        assert_eq!(tasks[0].properties, None);
        assert_eq!(tasks[0].task, None);
        assert_eq!((tasks[0].start, tasks[0].end), (0, 8));
    }

    #[test]
    fn test_command_and_action_resolve_task() {
        let tasks = extract("Sure! /routine add");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].task, Some(TaskId::new("RoutineAdd")));
        assert_eq!(tasks[0].action.as_deref(), Some("add"));
        assert_eq!(&"Sure! /routine add"[tasks[0].start..tasks[0].end], "/routine add");
    }

    #[test]
    fn test_command_needs_boundary() {
        assert!(extract("a/command").is_empty());
        assert!(extract("http://example.com/path").is_empty());
        assert_eq!(extract("x\n/command").len(), 1);
        assert_eq!(extract("x\t/command").len(), 1);
    }

    #[test]
    fn test_triple_fenced_command_ignored() {
        assert!(extract("```/command action```").is_empty());
        assert!(extract("```\n/command action\n```").is_empty());
    }

    #[test]
    fn test_non_triple_backticks_do_not_fence() {
        for ticks in ["``", "````", "`````"] {
            let text = format!("{ticks} /command action {ticks}");
            let tasks = extract(&text);
            assert_eq!(tasks.len(), 1, "{text}");
            assert_eq!(tasks[0].command, "command");
            assert_eq!(tasks[0].action.as_deref(), Some("action"));
        }
    }

    #[test]
    fn test_command_after_fence_on_same_line() {
        let text = "```js\nlet x;\n``` then /add name='x'";
        let tasks = extract(text);
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].command, "add");
        assert_eq!(tasks[0].properties.as_ref().unwrap()["name"], string("x"));
        assert_eq!(&text[tasks[0].start..tasks[0].end], "/add name='x'");

        // A longer closing run behaves the same.
        assert_eq!(extract("```\ncode\n````` /add").len(), 1);
    }

    #[test]
    fn test_inline_code_ignored() {
        assert!(extract("run `/command action` later").is_empty());
        let tasks = extract("run `code` then /command");
        assert_eq!(tasks.len(), 1);
    }

    #[test]
    fn test_code_tag_ignored() {
        assert!(extract("see <code>/command action</code> here").is_empty());
        assert_eq!(extract("<code>x</code> /command").len(), 1);
    }

    #[test]
    fn test_quoted_value_keeps_code_verbatim() {
        let tasks = extract("/command1 action1 text='```/note find```'");
        assert_eq!(tasks.len(), 1);
        let props = tasks[0].properties.as_ref().unwrap();
        assert_eq!(props["text"], string("```/note find```"));
    }

    #[test]
    fn test_numeric_values() {
        let tasks = extract("/command prop1=-2.3");
        let props = tasks[0].properties.as_ref().unwrap();
        assert_eq!(serde_json::to_string(&props["prop1"]).unwrap(), "-2.3");

        let tasks = extract("/command prop1=123");
        let props = tasks[0].properties.as_ref().unwrap();
        assert_eq!(props["prop1"], PropertyValue::Number(123.into()));
    }

    #[test]
    fn test_malformed_number_aborts_properties() {
        let tasks = extract("/command prop1=0.3\" prop2='x'");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].command, "command");
        assert_eq!(tasks[0].properties, None);
        assert_eq!(tasks[0].end, 8);
    }

    #[test]
    fn test_full_add_scenario() {
        let text = "/add name='Get Oat Milk' description='Reminder to buy oat milk' dueDate='2023-10-06T09:00:00Z' isComplete=false";
        let tasks = extract(text);
        assert_eq!(tasks.len(), 1);
        let task = &tasks[0];
        assert_eq!(task.command, "add");
        assert_eq!(task.action, None);
        assert_eq!((task.start, task.end), (0, text.len()));
        let props = task.properties.as_ref().unwrap();
        assert_eq!(props.len(), 4);
        assert_eq!(props["name"], string("Get Oat Milk"));
        assert_eq!(props["description"], string("Reminder to buy oat milk"));
        assert_eq!(props["dueDate"], string("2023-10-06T09:00:00Z"));
        assert_eq!(props["isComplete"], PropertyValue::Bool(false));
    }

    #[test]
    fn test_string_end_includes_closing_quote() {
        let text = "/add name=\"Milk\" and more";
        let tasks = extract(text);
        assert_eq!(&text[tasks[0].start..tasks[0].end], "/add name=\"Milk\"");
    }

    #[test]
    fn test_escaped_quote_preserved_raw() {
        let tasks = extract(r"/add name='it\'s' x");
        let props = tasks[0].properties.as_ref().unwrap();
        assert_eq!(props["name"], string(r"it\'s"));
    }

    #[test]
    fn test_quoted_value_spans_lines() {
        let tasks = extract("/add note='line one\nline two'\nbye");
        let props = tasks[0].properties.as_ref().unwrap();
        assert_eq!(props["note"], string("line one\nline two"));
    }

    #[test]
    fn test_dangling_property_name_dropped() {
        let tasks = extract("/add name=");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].properties, None);
    }

    #[test]
    fn test_multiple_commands() {
        let tasks = extract("/add name='a' /routine add\n/add");
        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[1].task, Some(TaskId::new("RoutineAdd")));
        assert!(tasks.iter().all(|t| t.start <= t.end));
    }

    #[test]
    fn test_bare_word_ends_command() {
        let tasks = extract("/add milk please now");
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].action.as_deref(), Some("milk"));
        assert_eq!(tasks[0].properties, None);
    }

    #[test]
    fn test_wrapped_commands_extracted() {
        let tasks = extract("suggested:[/command1,/command2]");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].command, "command1");
        assert_eq!(tasks[1].command, "command2");
        assert_eq!((tasks[1].start, tasks[1].end), (21, 30));
    }

    #[test]
    fn test_unicode_offsets_are_char_boundaries() {
        let text = "Voilà 🙂 /add name='café' — done";
        let tasks = extract(text);
        assert_eq!(tasks.len(), 1);
        assert_eq!(&text[tasks[0].start..tasks[0].end], "/add name='café'");
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let text = "ok /add name='x' count=2\nsuggested: [/routine add]";
        assert_eq!(extract(text), extract(text));
    }

    #[test]
    fn test_streaming_matches_whole_text() {
        let text = "Hi /add name='Oat milk' count=2\n```/skip```\n[/routine add, /add]";
        let whole = extract(text);

        for split in 1..text.len() {
            if !text.is_char_boundary(split) {
                continue;
            }
            let mut streaming = StreamingExtractor::new(&resolve);
            streaming.push(&text[..split]);
            streaming.push(&text[split..]);
            assert_eq!(streaming.finish(), whole, "split at {split}");
        }
    }

    #[test]
    fn test_streaming_completed_so_far() {
        let mut streaming = StreamingExtractor::new(&resolve);
        streaming.push("/add\n/rout");
        assert_eq!(streaming.completed().len(), 1);
        streaming.push("ine add");
        let tasks = streaming.finish();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[1].task, Some(TaskId::new("RoutineAdd")));
    }

    #[test]
    fn test_pathological_slashes_are_linear() {
        let text = "a/a".repeat(50_000);
        assert!(extract(&text).is_empty());
        let text = "/a/".repeat(50_000);
        assert!(extract(&text).is_empty());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        /// Characters the state machine reacts to, plus a multibyte one.
        const MARKUP: &str = "[a-z0-9 /=,'\"`<>\\[\\]\n.\\-é]{0,80}";

        fn check_spans(text: &str) -> Result<(), TestCaseError> {
            let tasks = extract(text);
            for task in &tasks {
                prop_assert!(task.start <= task.end, "{task:?}");
                prop_assert!(task.end <= text.len(), "{task:?}");
                prop_assert!(text.is_char_boundary(task.start));
                prop_assert!(text.is_char_boundary(task.end));
                prop_assert_eq!(text[task.start..].chars().next(), Some('/'));
            }
            prop_assert_eq!(extract(text), tasks);
            Ok(())
        }

        proptest! {
            #[test]
            fn test_spans_within_markup_text(text in MARKUP) {
                check_spans(&text)?;
            }

            #[test]
            fn test_spans_within_arbitrary_text(text in any::<String>()) {
                check_spans(&text)?;
            }

            #[test]
            fn test_streaming_split_matches_whole(
                text in MARKUP,
                split in any::<prop::sample::Index>(),
            ) {
                let mut at = split.index(text.len() + 1);
                while !text.is_char_boundary(at) {
                    at -= 1;
                }
                let mut streaming = StreamingExtractor::new(&resolve);
                streaming.push(&text[..at]);
                streaming.push(&text[at..]);
                prop_assert_eq!(streaming.finish(), extract(&text));
            }
        }
    }
}
