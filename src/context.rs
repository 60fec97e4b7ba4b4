use crate::models::TextRange;

pub const SELECTION_MARKER: &str = "[SELECTION]";
pub const DEFAULT_CONTEXT_CHARS: usize = 100;

/// Surrounding text of a selection, limited to `max_chars` on each side and
/// to the range's own container, with the selection replaced by a marker.
/// Without a range the context is empty.
pub fn extract_context(range: Option<&TextRange>, max_chars: usize) -> String {
    let Some(range) = range else {
        return String::new();
    };

    let chars: Vec<char> = range.container().chars().collect();
    let before_start = range.start().saturating_sub(max_chars);
    let after_end = range.end().saturating_add(max_chars).min(chars.len());

    let before: String = chars[before_start..range.start()].iter().collect();
    let after: String = chars[range.end()..after_end].iter().collect();

    format!("{before}{SELECTION_MARKER}{after}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marks_the_selection_inside_its_container() {
        let text = "the powerhouse of the mitochondria, which produces energy";
        let start = text.find("mitochondria").expect("word present");
        let range = TextRange::new(text, start, start + "mitochondria".len());

        assert_eq!(
            extract_context(Some(&range), DEFAULT_CONTEXT_CHARS),
            "the powerhouse of the [SELECTION], which produces energy"
        );
    }

    #[test]
    fn limits_each_side_to_max_chars() {
        let text = format!("{}target{}", "a".repeat(150), "b".repeat(150));
        let range = TextRange::new(text.as_str(), 150, 156);

        let context = extract_context(Some(&range), 100);
        assert_eq!(context, format!("{}[SELECTION]{}", "a".repeat(100), "b".repeat(100)));
    }

    #[test]
    fn counts_characters_not_bytes() {
        let text = "éééé café ñññ";
        let range = TextRange::new(text, 5, 9);

        assert_eq!(extract_context(Some(&range), 2), "é [SELECTION] ñ");
    }

    #[test]
    fn missing_range_yields_empty_context() {
        assert_eq!(extract_context(None, DEFAULT_CONTEXT_CHARS), "");
    }
}
