//! Text chunking with overlap

use unicode_segmentation::UnicodeSegmentation;

/// Splits text into chunks of at most `chunk_size` characters.
///
/// Chunks are packed from whole sentences. A sentence longer than a chunk
/// is broken at word boundaries, and a single oversized word at character
/// boundaries. Each new chunk starts with up to `overlap` characters from
/// the end of the previous one when they fit.
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

impl TextChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Split `text` into ordered, non-empty chunks
    pub fn chunk(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        // Whether `current` holds text beyond the overlap it was seeded with
        let mut has_new = false;

        for piece in self.pieces(text) {
            let piece_len = char_len(piece);

            if !current.is_empty() && char_len(&current) + piece_len > self.chunk_size {
                if has_new {
                    let overlap = self.get_overlap_text(&current);
                    push_chunk(&mut chunks, &current);
                    current = if char_len(&overlap) + piece_len <= self.chunk_size {
                        overlap
                    } else {
                        String::new()
                    };
                } else {
                    current.clear();
                }
                has_new = false;
            }

            current.push_str(piece);
            has_new |= !piece.trim().is_empty();
        }

        if has_new {
            push_chunk(&mut chunks, &current);
        }
        chunks
    }

    /// Sentence-sized pieces, each no longer than a chunk
    fn pieces<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut pieces = Vec::new();
        for sentence in text.split_sentence_bounds() {
            if char_len(sentence) <= self.chunk_size {
                pieces.push(sentence);
                continue;
            }
            for word in sentence.split_word_bounds() {
                if char_len(word) <= self.chunk_size {
                    pieces.push(word);
                } else {
                    pieces.extend(split_chars(word, self.chunk_size));
                }
            }
        }
        pieces
    }

    /// Tail of `text` used to seed the next chunk, starting at a word boundary
    fn get_overlap_text(&self, text: &str) -> String {
        if self.overlap == 0 {
            return String::new();
        }

        let total = char_len(text);
        if total <= self.overlap {
            return text.to_string();
        }

        let start = text
            .char_indices()
            .nth(total - self.overlap)
            .map(|(i, _)| i)
            .unwrap_or(0);
        let overlap_text = &text[start..];

        for (boundary, skip) in [(". ", 2), (" ", 1)] {
            if let Some(pos) = overlap_text.find(boundary) {
                let rest = &overlap_text[pos + skip..];
                if !rest.trim().is_empty() {
                    return rest.to_string();
                }
            }
        }
        overlap_text.to_string()
    }
}

fn push_chunk(chunks: &mut Vec<String>, text: &str) {
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

fn split_chars(s: &str, size: usize) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut count = 0;
    for (i, _) in s.char_indices() {
        if count == size {
            parts.push(&s[start..i]);
            start = i;
            count = 0;
        }
        count += 1;
    }
    if start < s.len() {
        parts.push(&s[start..]);
    }
    parts
}

#[cfg(test)]
mod tests {
    use super::*;

    const POLICY: &str = "All employees must use multi-factor authentication. \
        Passwords are rotated every ninety days. \
        Remote access requires the corporate VPN. \
        Security incidents are reported to the SOC within one hour. \
        Laptops are encrypted with full-disk encryption.";

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunker = TextChunker::new(512, 50);
        assert_eq!(chunker.chunk("A short policy."), vec!["A short policy."]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        let chunker = TextChunker::new(512, 50);
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("   \n\n ").is_empty());
    }

    #[test]
    fn test_chunks_respect_size() {
        let chunker = TextChunker::new(80, 20);
        let chunks = chunker.chunk(POLICY);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 80, "chunk too long: {chunk:?}");
        }
        assert!(chunks[0].starts_with("All employees"));
        assert!(chunks.last().unwrap().ends_with("full-disk encryption."));
    }

    #[test]
    fn test_consecutive_chunks_overlap() {
        let chunker = TextChunker::new(100, 30);
        let chunks = chunker.chunk(POLICY);

        assert!(chunks.len() > 1);
        let tail: String = chunks[0].split_whitespace().last().unwrap().to_string();
        assert!(chunks[1].contains(&tail), "{:?} / {:?}", chunks[0], chunks[1]);
    }

    #[test]
    fn test_oversized_word_split_by_chars() {
        let chunker = TextChunker::new(10, 0);
        let word = "x".repeat(25);
        let chunks = chunker.chunk(&word);

        assert_eq!(chunks, vec!["x".repeat(10), "x".repeat(10), "x".repeat(5)]);
    }

    #[test]
    fn test_repeated_content_is_kept() {
        let chunker = TextChunker::new(9, 0);
        let chunks = chunker.chunk("Row one. Row one. Row one.");
        assert_eq!(chunks, vec!["Row one.", "Row one.", "Row one."]);
    }

    #[test]
    fn test_trailing_whitespace_does_not_emit_overlap_chunk() {
        let chunker = TextChunker::new(10, 4);
        let chunks = chunker.chunk("aaaa bbbb cccc   ");
        assert_eq!(chunks, vec!["aaaa bbbb", "bbb cccc"]);
    }

    #[test]
    fn test_multibyte_text() {
        let chunker = TextChunker::new(8, 2);
        let chunks = chunker.chunk("Sécurité des données numériques é");
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 8);
        }
        assert!(!chunks.is_empty());
    }
}
