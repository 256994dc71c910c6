// Colored terminal output for dedupe runs and entity lists.

use colored::Colorize;

use super::truncate_chars;
use crate::entities::resolver::{EntityGroup, EntityGroups};
use crate::topics::model::Topic;

/// Display merged topics with their salience-adjusted duplicate counts.
pub fn display_merged_topics(input_count: usize, merged: &[Topic]) {
    println!(
        "\n{}",
        format!(
            "=== Deduplicated {} topics into {} ===",
            input_count,
            merged.len()
        )
        .bold()
    );
    println!();

    for (i, topic) in merged.iter().enumerate() {
        let title = topic
            .title
            .as_deref()
            .or(topic.doc.as_deref())
            .unwrap_or("(untitled)");
        let count = topic.count_reduced.unwrap_or(0.0);
        let count_str = format!("{count:>5.2}");
        let colored_count = if count >= 2.0 {
            count_str.bright_red()
        } else if count > 0.0 {
            count_str.bright_yellow()
        } else {
            count_str.dimmed()
        };

        println!(
            "  {:>3}. {}  {}",
            i + 1,
            colored_count,
            truncate_chars(title, 70).bold()
        );

        // Show what was folded in, skipping the topic's own title
        for related in topic.related_topics.iter().skip(1) {
            let source = if related.source.is_empty() {
                String::new()
            } else {
                format!(" ({})", related.source)
            };
            println!(
                "         {} {}{}",
                "+".dimmed(),
                truncate_chars(&related.title, 60),
                source.dimmed()
            );
        }
    }

    let duplicates = merged.iter().filter(|t| t.related_topics.len() > 1).count();
    println!();
    println!("  {} clusters merged duplicates", duplicates);
}

/// Display a ranked entity list.
pub fn display_entity_list(entities: &[String]) {
    if entities.is_empty() {
        println!("No entities found.");
        return;
    }

    println!("\n{}", "=== Entities ===".bold());
    for (i, name) in entities.iter().enumerate() {
        println!("  {:>3}. {}", i + 1, name);
    }
}

/// Display grouped entity lists (proper names, Wikipedia-linked).
pub fn display_entity_groups(groups: &EntityGroups) {
    for (group, entities) in groups {
        let heading = match group {
            EntityGroup::Proper => "Proper names",
            EntityGroup::Wikipedia => "Wikipedia-linked",
        };
        println!("\n{}", format!("=== {heading} ({}) ===", entities.len()).bold());

        for entity in entities {
            match &entity.wikipedia_url {
                Some(url) => println!("  - {} {}", entity.name, url.dimmed()),
                None => println!("  - {}", entity.name),
            }
        }
    }
}
