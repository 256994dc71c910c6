// Topic deduplication: normalize, vectorize, cluster and merge a batch.

pub mod model;
pub mod normalize;
pub mod vectorizer;
pub mod similarity;
pub mod cluster;
pub mod merge;
pub mod dedupe;
