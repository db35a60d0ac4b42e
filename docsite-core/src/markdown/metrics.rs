//! Word count and reading time estimates.

use super::split_code_blocks;

/// Reading speed used when none is configured
pub const DEFAULT_WORDS_PER_MINUTE: usize = 200;

/// Markdown syntax characters stripped before counting
const SYNTAX_CHARS: &[char] = &[
    '#', '*', '_', '`', '~', '>', '|', '[', ']', '(', ')', '!', '-',
];

/// Count words in markdown source, ignoring code blocks
///
/// Syntax characters are removed first, so `**bold**` counts as one word
/// and a bare `---` rule counts as none.
pub fn word_count(markdown: &str) -> usize {
    split_code_blocks(markdown)
        .into_iter()
        .filter(|segment| !segment.is_code)
        .flat_map(|segment| segment.text.split_whitespace())
        .filter(|token| token.chars().any(|c| !SYNTAX_CHARS.contains(&c)))
        .count()
}

/// Whole minutes to read `words`, never below one
pub fn reading_time(words: usize, words_per_minute: usize) -> usize {
    let wpm = if words_per_minute == 0 {
        DEFAULT_WORDS_PER_MINUTE
    } else {
        words_per_minute
    };
    words.div_ceil(wpm).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_words() {
        assert_eq!(word_count("one two  three\nfour"), 4);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_syntax_is_ignored() {
        assert_eq!(word_count("# Title\n\n**bold** and _it_\n\n---\n\n> quoted"), 5);
        assert_eq!(word_count("- [ ] task"), 1);
    }

    #[test]
    fn test_fenced_code_is_ignored() {
        let md = "Intro words\n\n```rust\nfn main() { println!(\"hi\"); }\n```\n\nOutro";
        assert_eq!(word_count(md), 3);
    }

    #[test]
    fn test_indented_code_is_ignored() {
        assert_eq!(word_count("Example:\n\n    let x = 1;\n    let y = 2;\n"), 1);
    }

    #[test]
    fn test_reading_time() {
        assert_eq!(reading_time(0, 200), 1);
        assert_eq!(reading_time(1, 200), 1);
        assert_eq!(reading_time(200, 200), 1);
        assert_eq!(reading_time(201, 200), 2);
        assert_eq!(reading_time(400, 200), 2);
        assert_eq!(reading_time(1000, 0), 5);
    }
}
