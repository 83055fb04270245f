//! Reading time estimate

use super::post::ContentBlock;
use crate::config::{EmptyPostMinutes, ReadingTimeConfig};

/// Count the words of a post: each heading plus the plain text of each body
pub fn count_words(content: &[ContentBlock]) -> usize {
    content
        .iter()
        .map(|block| {
            block.heading.split_whitespace().count()
                + block.body.as_text().split_whitespace().count()
        })
        .sum()
}

#[derive(Debug, Clone, Copy)]
pub struct ReadingTime {
    words_per_minute: usize,
    empty_post: EmptyPostMinutes,
}

impl ReadingTime {
    pub fn new(config: &ReadingTimeConfig) -> Self {
        Self {
            words_per_minute: config.words_per_minute.max(1) as usize,
            empty_post: config.empty_post,
        }
    }

    /// Whole minutes, rounded up
    pub fn minutes_for_words(&self, words: usize) -> usize {
        if words == 0 {
            return match self.empty_post {
                EmptyPostMinutes::Zero => 0,
                EmptyPostMinutes::One => 1,
            };
        }
        words.div_ceil(self.words_per_minute)
    }

    pub fn estimate(&self, content: &[ContentBlock]) -> usize {
        self.minutes_for_words(count_words(content))
    }
}

impl Default for ReadingTime {
    fn default() -> Self {
        Self::new(&ReadingTimeConfig::default())
    }
}
