// Hard failures of the dedupe pipeline.
//
// These are caller bugs, not runtime conditions: there is no sane fallback
// for an empty cluster or a topic with no text at all, so they propagate.
// Recoverable conditions (extractor outages, over-eager filters) never show
// up here; the entity resolver absorbs them.

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    /// `merge_topics` was handed zero topics.
    #[error("cannot merge an empty cluster of topics")]
    EmptyCluster,

    /// A topic has neither `doc` nor `title`, so there is nothing to vectorize.
    #[error("topic at index {index} has neither a doc nor a title")]
    MalformedTopic { index: usize },

    /// Entity extraction was asked for a topic with neither doc nor title.
    #[error("topic has neither a doc nor a title")]
    MissingText,

    /// Headline entity groups need a title to work from.
    #[error("topic has no title")]
    MissingTitle,
}
