//! Reasoning-trace stripping for models that think out loud.

pub const THINK_START: &str = "<think>";
pub const THINK_END: &str = "</think>";

/// Return only the text after the last `</think>`, trimmed.
///
/// Text without a complete reasoning block is returned unchanged, so
/// cleaning is idempotent.
pub fn clean(raw: &str) -> String {
    let Some(end) = raw.rfind(THINK_END) else {
        return raw.to_string();
    };

    if !raw[..end].contains(THINK_START) {
        return raw.to_string();
    }

    raw[end + THINK_END.len()..].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_block_is_unchanged() {
        assert_eq!(clean("  plain answer "), "  plain answer ");
    }

    #[test]
    fn test_single_block() {
        assert_eq!(clean("<think>hmm</think>\n\nThe answer is 4."), "The answer is 4.");
    }

    #[test]
    fn test_last_block_wins() {
        let raw = "<think>a</think>draft<think>b</think>  final ";
        assert_eq!(clean(raw), "final");
    }

    #[test]
    fn test_idempotent() {
        let once = clean("<think>x</think> done");
        assert_eq!(clean(&once), once);
        assert_eq!(clean("already clean"), "already clean");
    }

    #[test]
    fn test_unmatched_end_marker_is_unchanged() {
        assert_eq!(clean("stray </think> text"), "stray </think> text");
    }

    #[test]
    fn test_unterminated_block_is_unchanged() {
        assert_eq!(clean("<think>still thinking"), "<think>still thinking");
    }
}
