//! Content module - post models, rich text, reading time and the post list

mod post;
mod post_list;
mod reading_time;
mod richtext;

pub use post::{Banner, ContentBlock, PostBody, PostDetail, PostSummary, SummaryData};
pub use post_list::{LoadMoreError, PendingLoad, PostList};
pub use reading_time::{count_words, ReadingTime};
pub use richtext::{Block, BlockKind, Embed, RichText, Span, SpanData, SpanKind};
