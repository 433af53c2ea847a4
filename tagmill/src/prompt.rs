//! Tag prompt construction and answer parsing
//!
//! The dispatch core carries these prompts as opaque payloads; only this
//! module knows what is actually being asked of the models.

use serde::Deserialize;
use tracing::warn;

use crate::dataset::Record;

/// Build the tagging prompt for one record
pub fn tag_prompt(record: &Record) -> String {
    format!(
        "Give 5 descriptive English tags as 2-3-word phrases in JSON: \
         {{\"tags\":[tag1, tag2, tag3, tag4, tag5]}}. \
         Synopsis title: {} ({}), Genres: {}. \
         No stop words, no dashes, no repetition of title/genres.",
        record.title,
        record.year.as_deref().unwrap_or("unknown"),
        record.genres,
    )
}

#[derive(Debug, Deserialize)]
struct TagAnswer {
    #[serde(default)]
    tags: Vec<String>,
}

/// Parse a model answer into a tag list
///
/// Anything that is not a well-formed `{"tags": [...]}` object becomes the
/// empty list - the same degraded output an exhausted task produces.
pub fn parse_tags(answer: &str) -> Vec<String> {
    match serde_json::from_str::<TagAnswer>(answer) {
        Ok(parsed) => parsed.tags,
        Err(err) => {
            warn!(error = %err, "unparseable tag answer, treating as empty");
            Vec::new()
        }
    }
}
