//! Paragraph/sentence text splitter.
//!
//! Splits on blank-line paragraph boundaries first; a paragraph over the
//! limit is split into sentences which are greedily packed back into chunks.
//! Pure and deterministic: the same input always yields the same chunks, in
//! input order, with no text dropped.

use regex::Regex;
use std::sync::OnceLock;

/// Configuration for the splitter.
#[derive(Debug, Clone)]
pub struct ChunkerConfig {
    /// Maximum characters per chunk. A single sentence longer than this is
    /// still emitted whole rather than truncated.
    pub max_chars: usize,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self { max_chars: 2000 }
    }
}

fn paragraph_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n\s*\n").unwrap())
}

fn sentence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^.!?]*[.!?]+").unwrap())
}

/// Split text into chunks of at most `max_chars` characters.
pub fn split(text: &str, max_chars: usize) -> Vec<String> {
    let mut chunks = Vec::new();

    for para in paragraph_re().split(text) {
        let para = para.trim();
        if para.is_empty() {
            continue;
        }
        if para.len() <= max_chars {
            chunks.push(para.to_string());
        } else {
            pack_sentences(para, max_chars, &mut chunks);
        }
    }

    chunks
}

/// Split an oversized paragraph into sentences and greedily pack them.
fn pack_sentences(para: &str, max_chars: usize, chunks: &mut Vec<String>) {
    let mut sentences: Vec<&str> = Vec::new();
    let mut consumed = 0;
    for m in sentence_re().find_iter(para) {
        let s = m.as_str().trim();
        if !s.is_empty() {
            sentences.push(s);
        }
        consumed = m.end();
    }
    // A trailing run without terminal punctuation is still a sentence.
    let tail = para[consumed..].trim();
    if !tail.is_empty() {
        sentences.push(tail);
    }

    let mut chunk = String::new();
    for sentence in sentences {
        if chunk.is_empty() {
            chunk.push_str(sentence);
        } else if chunk.len() + 1 + sentence.len() <= max_chars {
            chunk.push(' ');
            chunk.push_str(sentence);
        } else {
            chunks.push(std::mem::take(&mut chunk));
            chunk.push_str(sentence);
        }
    }
    if !chunk.is_empty() {
        chunks.push(chunk);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(s: &str) -> String {
        s.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_small_paragraphs_pass_through_verbatim() {
        let text = "First paragraph.\n\nSecond paragraph.";
        let chunks = split(text, 2000);
        assert_eq!(chunks, vec!["First paragraph.", "Second paragraph."]);
    }

    #[test]
    fn test_oversized_paragraph_packs_sentences() {
        let text = "One two three. Four five six. Seven eight nine.";
        let chunks = split(text, 32);
        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.len() <= 32, "chunk over limit: {c:?}");
        }
        assert_eq!(normalize(&chunks.join(" ")), normalize(text));
    }

    #[test]
    fn test_single_oversized_sentence_kept_whole() {
        let long = format!("{} end.", "word ".repeat(100));
        let chunks = split(&long, 50);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].len() > 50, "oversized sentence must not be truncated");
        assert_eq!(normalize(&chunks[0]), normalize(&long));
    }

    #[test]
    fn test_trailing_text_without_punctuation_is_preserved() {
        let text = format!("A sentence. {}", "tail without punctuation ".repeat(20));
        let chunks = split(&text, 40);
        assert_eq!(normalize(&chunks.join(" ")), normalize(&text));
    }

    #[test]
    fn test_round_trip_modulo_whitespace() {
        let text = "Intro paragraph with some words.\n\n\
                    Methods were applied! Were they sound? Yes.\n\n   \n\
                    Conclusion paragraph.";
        for max in [10usize, 25, 80, 2000] {
            let chunks = split(text, max);
            assert_eq!(
                normalize(&chunks.join(" ")),
                normalize(text),
                "round trip failed for max_chars={max}"
            );
        }
    }

    #[test]
    fn test_bound_holds_except_oversized_sentences() {
        let text = "Short. Also short. A noticeably longer sentence here.";
        for max in [15usize, 30, 60] {
            for chunk in split(text, max) {
                let single_sentence = !chunk.trim_end_matches(['.', '!', '?']).contains(['.', '!', '?']);
                assert!(
                    chunk.len() <= max || single_sentence,
                    "multi-sentence chunk over limit: {chunk:?}"
                );
            }
        }
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert!(split("", 2000).is_empty());
        assert!(split("\n\n  \n\n", 2000).is_empty());
    }

    #[test]
    fn test_deterministic() {
        let text = "Alpha beta gamma. Delta epsilon. Zeta eta theta iota.";
        assert_eq!(split(text, 30), split(text, 30));
    }
}
