/// Telegram rejects messages longer than this.
pub const TELEGRAM_MAX_LEN: usize = 4096;
/// Discord rejects messages longer than this.
pub const DISCORD_MAX_LEN: usize = 2000;

/// Split `text` into chunks of at most `max_len` chars, cutting at the last
/// newline that fits and falling back to a hard cut mid-line. Whitespace at
/// the start of every following chunk is dropped.
pub fn split_message(text: &str, max_len: usize) -> Vec<String> {
    let max_len = max_len.max(1);
    let mut chunks = Vec::new();
    let mut rest = text;

    while let Some(hard_cut) = rest.char_indices().nth(max_len).map(|(i, _)| i) {
        // A newline sitting exactly at `max_len` still yields a chunk that fits.
        let window_end = hard_cut + rest[hard_cut..].chars().next().map_or(0, char::len_utf8);
        let cut = rest[..window_end].rfind('\n').unwrap_or(hard_cut);

        // A cut at 0 means a leading newline, which the trim below consumes.
        if cut > 0 {
            chunks.push(rest[..cut].to_string());
        }
        rest = rest[cut..].trim_start();
    }

    if !rest.is_empty() {
        chunks.push(rest.to_string());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        assert_eq!(split_message("short text", 2000), vec!["short text"]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(split_message("", 100).is_empty());
    }

    #[test]
    fn test_repeated_lines_respect_limit() {
        let text = "a\n".repeat(1000);
        let chunks = split_message(&text, 100);

        assert!(chunks.iter().all(|c| char_len(c) <= 100));
        let total_a: usize = chunks.iter().map(|c| c.matches('a').count()).sum();
        assert_eq!(total_a, 1000);
        // Each cut consumes exactly one newline, so rejoining restores the text.
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn test_prefers_last_newline() {
        let text = "first line\nsecond line\nthird";
        assert_eq!(
            split_message(text, 15),
            vec!["first line", "second line", "third"]
        );
    }

    #[test]
    fn test_newline_exactly_at_limit() {
        let text = "abcde\nfgh";
        assert_eq!(split_message(text, 5), vec!["abcde", "fgh"]);
    }

    #[test]
    fn test_hard_cut_without_newline() {
        let text = "x".repeat(250);
        let chunks = split_message(&text, 100);
        assert_eq!(chunks.len(), 3);
        assert_eq!(char_len(&chunks[0]), 100);
        assert_eq!(char_len(&chunks[1]), 100);
        assert_eq!(char_len(&chunks[2]), 50);
    }

    #[test]
    fn test_leading_whitespace_after_cut_is_trimmed() {
        let text = "hello world";
        assert_eq!(split_message(text, 6), vec!["hello ", "world"]);
    }

    #[test]
    fn test_leading_newline_does_not_emit_empty_chunk() {
        let text = format!("\n{}", "y".repeat(10));
        assert_eq!(split_message(&text, 5), vec!["yyyyy", "yyyyy"]);
    }

    #[test]
    fn test_multibyte_chars_cut_on_boundaries() {
        let text = "é".repeat(7);
        let chunks = split_message(&text, 3);
        assert_eq!(chunks, vec!["ééé", "ééé", "é"]);
    }

    #[test]
    fn test_limits_match_platforms() {
        assert_eq!(TELEGRAM_MAX_LEN, 4096);
        assert_eq!(DISCORD_MAX_LEN, 2000);
    }
}
