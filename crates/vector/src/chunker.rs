//! Split text into overlapping fixed-size character windows.

use crate::error::{Error, Result};

/// Splits a document into the pieces that get embedded and indexed.
pub trait TextSplitter: Send + Sync {
    /// Always returns at least one chunk.
    fn split(&self, text: &str) -> Vec<String>;

    fn name(&self) -> &str;
}

/// Sliding window over characters, `max_length` wide, advancing by
/// `max_length - overlap`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacterTextSplitter {
    max_length: usize,
    overlap: usize,
}

impl CharacterTextSplitter {
    /// Rejects configurations whose stride would not be positive.
    pub fn new(max_length: usize, overlap: usize) -> Result<Self> {
        if max_length == 0 || overlap >= max_length {
            return Err(Error::InvalidChunking {
                max_length,
                overlap,
            });
        }
        Ok(Self {
            max_length,
            overlap,
        })
    }

    pub fn max_length(&self) -> usize {
        self.max_length
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    fn stride(&self) -> usize {
        self.max_length - self.overlap
    }
}

impl TextSplitter for CharacterTextSplitter {
    fn split(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        if chars.len() <= self.max_length {
            return vec![text.to_string()];
        }

        let mut chunks = Vec::new();
        let mut start = 0;
        loop {
            let end = (start + self.max_length).min(chars.len());
            chunks.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            start += self.stride();
        }
        chunks
    }

    fn name(&self) -> &str {
        "character"
    }
}

/// One-shot split with validation.
pub fn split(text: &str, max_length: usize, overlap: usize) -> Result<Vec<String>> {
    Ok(CharacterTextSplitter::new(max_length, overlap)?.split(text))
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    /// Undo the overlap between consecutive windows.
    fn reassemble(chunks: &[String], overlap: usize) -> String {
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            if i == 0 {
                out.push_str(chunk);
            } else {
                out.extend(chunk.chars().skip(overlap));
            }
        }
        out
    }

    #[test]
    fn empty_text_yields_one_empty_chunk() {
        assert_eq!(split("", 10, 2).unwrap(), vec![String::new()]);
    }

    #[rstest]
    #[case("a")]
    #[case("exactly10!")]
    #[case("短文本")]
    fn short_text_is_not_split(#[case] text: &str) {
        assert_eq!(split(text, 10, 2).unwrap(), vec![text.to_string()]);
    }

    #[test]
    fn windows_slide_by_stride_and_stop_at_the_end() {
        let chunks = split("abcdefghijkl", 5, 2).unwrap();
        assert_eq!(chunks, vec!["abcde", "defgh", "ghijk", "jkl"]);
    }

    #[test]
    fn last_window_ending_exactly_at_the_end_adds_no_tail() {
        let chunks = split("abcdefgh", 5, 2).unwrap();
        assert_eq!(chunks, vec!["abcde", "defgh"]);
    }

    #[rstest]
    #[case(200, 20)]
    #[case(7, 3)]
    #[case(5, 0)]
    #[case(3, 2)]
    fn windows_reassemble_to_the_original(#[case] max_length: usize, #[case] overlap: usize) {
        let text = "虚拟内存把逻辑地址空间与物理内存分离, paging splits memory into frames. "
            .repeat(9);
        let chunks = split(&text, max_length, overlap).unwrap();
        assert!(chunks.iter().all(|c| c.chars().count() <= max_length));
        assert_eq!(reassemble(&chunks, overlap), text);
    }

    #[rstest]
    #[case(10, 10)]
    #[case(10, 11)]
    #[case(0, 0)]
    fn non_positive_stride_is_rejected(#[case] max_length: usize, #[case] overlap: usize) {
        assert!(matches!(
            CharacterTextSplitter::new(max_length, overlap),
            Err(Error::InvalidChunking { .. })
        ));
    }
}
