//! Message size helpers
//!
//! Telegram refuses messages above 4096 characters. Profile cards can grow
//! with long bios and project lists, so outgoing text is cut into chunks
//! below that limit, preferring paragraph and line boundaries.

/// Leaves room for the "(i/n)" prefix added to multi-part messages
pub const MAX_MESSAGE_LENGTH: usize = 4000;

/// Split `text` into chunks of at most `MAX_MESSAGE_LENGTH` characters
pub fn split_message(text: &str) -> Vec<String> {
    split_with_limit(text, MAX_MESSAGE_LENGTH)
}

fn split_with_limit(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split('\n') {
        let line_len = line.chars().count();

        // +1 for the newline that joins it to the current chunk
        if current_len > 0 && current_len + 1 + line_len > limit {
            chunks.push(current.trim_end().to_string());
            current.clear();
            current_len = 0;
        }

        if line_len > limit {
            for piece in hard_wrap(line, limit) {
                if current_len > 0 {
                    chunks.push(current.trim_end().to_string());
                }
                current_len = piece.chars().count();
                current = piece;
            }
            continue;
        }

        if current_len > 0 {
            current.push('\n');
            current_len += 1;
        }
        current.push_str(line);
        current_len += line_len;
    }

    if !current.trim().is_empty() {
        chunks.push(current.trim_end().to_string());
    }
    chunks.retain(|chunk| !chunk.is_empty());
    chunks
}

/// Cut one overlong line, on whitespace when possible
fn hard_wrap(line: &str, limit: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in line.split(' ') {
        let word_len = word.chars().count();
        if current_len > 0 && current_len + 1 + word_len > limit {
            pieces.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if word_len > limit {
            let chars: Vec<char> = word.chars().collect();
            for slice in chars.chunks(limit) {
                if current_len > 0 {
                    pieces.push(std::mem::take(&mut current));
                }
                current = slice.iter().collect();
                current_len = slice.len();
            }
            continue;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }
    if current_len > 0 {
        pieces.push(current);
    }
    pieces
}

/// Prefix each chunk with its position when a message was split
pub fn number_chunks(chunks: Vec<String>) -> Vec<String> {
    let total = chunks.len();
    if total <= 1 {
        return chunks;
    }
    chunks
        .into_iter()
        .enumerate()
        .map(|(i, chunk)| format!("({}/{})\n\n{}", i + 1, total, chunk))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_message_untouched() {
        assert_eq!(split_message("hello"), vec!["hello".to_string()]);
    }

    #[test]
    fn test_splits_on_line_boundaries() {
        let text = "aaaa\nbbbb\ncccc";
        let chunks = split_with_limit(text, 9);
        assert_eq!(chunks, vec!["aaaa\nbbbb", "cccc"]);
    }

    #[test]
    fn test_long_line_is_wrapped_on_words() {
        let chunks = split_with_limit("one two three four", 8);
        assert_eq!(chunks, vec!["one two", "three", "four"]);
    }

    #[test]
    fn test_long_word_is_cut_on_char_boundaries() {
        let chunks = split_with_limit("ççççççç", 3);
        assert_eq!(chunks, vec!["ççç", "ççç", "ç"]);
    }

    #[test]
    fn test_every_chunk_within_limit() {
        let text = "Skills: Rust, Go\n".repeat(600);
        let chunks = split_message(&text);
        assert!(chunks.len() > 1);
        assert!(chunks
            .iter()
            .all(|chunk| chunk.chars().count() <= MAX_MESSAGE_LENGTH));
    }

    #[test]
    fn test_number_chunks() {
        assert_eq!(number_chunks(vec!["a".to_string()]), vec!["a".to_string()]);
        let numbered = number_chunks(vec!["a".to_string(), "b".to_string()]);
        assert_eq!(numbered, vec!["(1/2)\n\na", "(2/2)\n\nb"]);
    }
}
