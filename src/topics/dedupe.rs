// Batch deduplication: the full normalize -> vectorize -> cluster -> merge run.
//
// Every call fits its own dictionary, latent model and similarity index, and
// drops them on return, so concurrent calls over different slices share
// nothing.

use tracing::info;

use super::cluster::GreedyClusterer;
use super::merge::merge_topics;
use super::model::Topic;
use super::normalize::normalize;
use super::similarity::SimilarityIndex;
use super::vectorizer::CorpusVectorizer;
use crate::error::PipelineError;

/// Merge topics that describe the same event. The output preserves the order
/// of each cluster's seed topic and is never longer than the input.
pub fn combine_duplicate_topics(topics: &[Topic]) -> Result<Vec<Topic>, PipelineError> {
    combine_with(&CorpusVectorizer::default(), topics)
}

/// Same as [`combine_duplicate_topics`] with an explicit vectorizer.
pub fn combine_with(
    vectorizer: &CorpusVectorizer,
    topics: &[Topic],
) -> Result<Vec<Topic>, PipelineError> {
    let documents = topics
        .iter()
        .enumerate()
        .map(|(index, topic)| {
            topic
                .text()
                .map(|text| normalize(&text))
                .ok_or(PipelineError::MalformedTopic { index })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let corpus = vectorizer.fit(&documents);
    let index = SimilarityIndex::build(corpus.vectors());
    let clusters = GreedyClusterer::new(&index, corpus.vectors()).cluster();

    let merged = clusters
        .iter()
        .map(|members| {
            let cluster: Vec<Topic> = members.iter().map(|&i| topics[i].clone()).collect();
            merge_topics(&cluster)
        })
        .collect::<Result<Vec<_>, _>>()?;

    info!(
        input = topics.len(),
        output = merged.len(),
        rank = corpus.rank(),
        "Combined duplicate topics"
    );

    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_topic_reports_index() {
        let topics = vec![
            Topic::from_doc("flood warning"),
            Topic {
                summary: Some("no doc and no title".to_string()),
                ..Default::default()
            },
        ];
        assert_eq!(
            combine_duplicate_topics(&topics),
            Err(PipelineError::MalformedTopic { index: 1 })
        );
    }

    #[test]
    fn test_empty_batch() {
        assert_eq!(combine_duplicate_topics(&[]), Ok(Vec::new()));
    }

    #[test]
    fn test_single_topic_passes_through_with_zero_count() {
        let merged = combine_duplicate_topics(&[Topic::from_doc("volcano erupts")]).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].doc.as_deref(), Some("volcano erupts"));
        assert_eq!(merged[0].count_reduced, Some(0.0));
    }
}
