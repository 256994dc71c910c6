// Combine a cluster of duplicate topics into one representative topic.
//
// Scalars are first-wins in cluster order. Docs are concatenated, seed links
// are unioned by URL, and every titled constituent leaves a trace in
// `related_topics`.
//
// `count_reduced` is the duplicate count scaled down for topics that were
// already aggregated from many streams upstream:
//
//   k = cluster size, s = num_aggregate_streams of the first topic
//   s < 2  ->  k - 1
//   else   ->  (k - 1) / log2(s)
//
// A singleton cluster counts as 0 regardless of s.

use std::collections::HashSet;

use super::model::{FirstWins, RelatedTopic, Topic};
use crate::error::PipelineError;

const DOC_SEPARATOR: &str = "; ";

/// Merge a non-empty, ordered cluster of topics into a new topic.
pub fn merge_topics(cluster: &[Topic]) -> Result<Topic, PipelineError> {
    let first = cluster.first().ok_or(PipelineError::EmptyCluster)?;

    let mut merged = Topic {
        num_aggregate_streams: first.num_aggregate_streams,
        ..Default::default()
    };
    let mut seen_urls: HashSet<&str> = HashSet::new();

    for topic in cluster {
        merged.title.fill_from(&topic.title);
        merged.summary.fill_from(&topic.summary);
        merged.source.fill_from(&topic.source);
        merged.image_url.fill_from(&topic.image_url);
        merged.suggested_query.fill_from(&topic.suggested_query);
        merged.provided_category.fill_from(&topic.provided_category);
        merged.topic_type_id.fill_from(&topic.topic_type_id);
        merged.extra.fill_from(&topic.extra);

        if let Some(doc) = &topic.doc {
            match merged.doc.as_mut() {
                Some(combined) => {
                    combined.push_str(DOC_SEPARATOR);
                    combined.push_str(doc);
                }
                None => merged.doc = Some(doc.clone()),
            }
        }

        for link in &topic.seed_links {
            if seen_urls.insert(link.url.as_str()) {
                merged.seed_links.push(link.clone());
            }
        }

        if let Some(title) = &topic.title {
            merged.related_topics.push(RelatedTopic {
                title: title.clone(),
                source: topic.source.clone().unwrap_or_default(),
            });
        }
    }

    merged.count_reduced = Some(count_reduced(cluster.len(), first.num_aggregate_streams));
    Ok(merged)
}

/// Salience-adjusted duplicate count for a cluster of `size` topics whose
/// seed had already aggregated `streams` upstream streams.
pub fn count_reduced(size: usize, streams: u32) -> f64 {
    let duplicates = size.saturating_sub(1) as f64;
    if streams < 2 {
        duplicates
    } else {
        duplicates / f64::from(streams).log2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topics::model::SeedLink;

    fn link(url: &str) -> SeedLink {
        SeedLink {
            url: url.to_string(),
            title: format!("title for {url}"),
            snippet: String::new(),
        }
    }

    #[test]
    fn test_empty_cluster_is_an_error() {
        assert_eq!(merge_topics(&[]), Err(PipelineError::EmptyCluster));
    }

    #[test]
    fn test_count_reduced_formula() {
        assert_eq!(count_reduced(1, 1), 0.0);
        assert_eq!(count_reduced(3, 1), 2.0);
        assert_eq!(count_reduced(3, 0), 2.0);
        assert!((count_reduced(3, 4) - 1.0).abs() < 1e-12);
        assert!((count_reduced(5, 2) - 4.0).abs() < 1e-12);
        assert_eq!(count_reduced(1, 16), 0.0);
    }

    #[test]
    fn test_first_defined_scalar_wins() {
        let a = Topic {
            title: None,
            summary: Some("first summary".to_string()),
            ..Default::default()
        };
        let b = Topic {
            title: Some("second title".to_string()),
            summary: Some("second summary".to_string()),
            image_url: Some("https://img.example/b.png".to_string()),
            topic_type_id: Some(7),
            ..Default::default()
        };
        let merged = merge_topics(&[a, b]).unwrap();
        assert_eq!(merged.title.as_deref(), Some("second title"));
        assert_eq!(merged.summary.as_deref(), Some("first summary"));
        assert_eq!(merged.image_url.as_deref(), Some("https://img.example/b.png"));
        assert_eq!(merged.topic_type_id, Some(7));
    }

    #[test]
    fn test_docs_joined_in_order_skipping_missing() {
        let merged = merge_topics(&[
            Topic::from_doc("one"),
            Topic::default(),
            Topic::from_doc("three"),
        ])
        .unwrap();
        assert_eq!(merged.doc.as_deref(), Some("one; three"));
    }

    #[test]
    fn test_seed_links_deduplicated_by_url() {
        let a = Topic {
            seed_links: vec![link("https://a"), link("https://b")],
            ..Default::default()
        };
        let mut dup_b = link("https://b");
        dup_b.title = "later copy".to_string();
        let b = Topic {
            seed_links: vec![dup_b, link("https://c")],
            ..Default::default()
        };
        let merged = merge_topics(&[a, b]).unwrap();
        let urls: Vec<&str> = merged.seed_links.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["https://a", "https://b", "https://c"]);
        assert_eq!(merged.seed_links[1].title, "title for https://b");
    }

    #[test]
    fn test_related_topics_trace_every_titled_constituent() {
        let a = Topic {
            title: Some("Storm hits coast".to_string()),
            source: Some("wire".to_string()),
            ..Default::default()
        };
        let b = Topic {
            title: Some("Storm hits coast".to_string()),
            ..Default::default()
        };
        let untitled = Topic::from_doc("no title here");
        let merged = merge_topics(&[a, b, untitled]).unwrap();
        assert_eq!(
            merged.related_topics,
            vec![
                RelatedTopic {
                    title: "Storm hits coast".to_string(),
                    source: "wire".to_string()
                },
                RelatedTopic {
                    title: "Storm hits coast".to_string(),
                    source: String::new()
                },
            ]
        );
    }

    #[test]
    fn test_streams_taken_from_first_topic() {
        let a = Topic {
            num_aggregate_streams: 4,
            ..Default::default()
        };
        let b = Topic {
            num_aggregate_streams: 64,
            ..Default::default()
        };
        let c = Topic::default();
        let merged = merge_topics(&[a, b, c]).unwrap();
        assert_eq!(merged.num_aggregate_streams, 4);
        assert!((merged.count_reduced.unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_inputs_not_mutated() {
        let cluster = vec![Topic::from_doc("a"), Topic::from_doc("b")];
        let before = cluster.clone();
        let _ = merge_topics(&cluster).unwrap();
        assert_eq!(cluster, before);
    }
}
