//! Excising task spans from a message.

/// Remove every `(start, end)` byte span from `text`.
///
/// Spans are applied from the highest start to the lowest, so removing a
/// later span never shifts one still pending. Each span is clamped to the
/// shrinking result and to char boundaries; overlapping spans are fine.
pub fn remove_tasks(text: &str, spans: &[(usize, usize)]) -> String {
    let mut ordered = spans.to_vec();
    ordered.sort_by(|a, b| b.0.cmp(&a.0));

    let mut result = text.to_string();
    for (start, end) in ordered {
        let end = floor_char_boundary(&result, end.min(result.len()));
        let start = floor_char_boundary(&result, start.min(end));
        result.replace_range(start..end, "");
    }
    result
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}
