//! Record I/O and cleanup
//!
//! Ordinary plumbing around the dispatch core: reading the record table from
//! a JSONL file and writing the tagged table back out, plus the cleanup pass
//! for raw records. The core never sees these types - it works on task
//! indices and opaque payloads.

use eyre::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use std::fs;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::info;

/// One input record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub title: String,

    #[serde(default)]
    pub genres: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
}

/// An input record plus its enrichment result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaggedRecord {
    #[serde(flatten)]
    pub record: Record,

    pub tags: Vec<String>,
}

/// Normalizes raw records: trims the title, moving any trailing year into
/// its own field, and tidies pipe-separated genre lists
pub struct Cleaner {
    year: Regex,
    genre_sep: Regex,
}

impl Cleaner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            year: Regex::new(r"\s*\((\d{4})\)\s*$")?,
            genre_sep: Regex::new(r"\s*\|\s*")?,
        })
    }

    /// Clean one record
    ///
    /// `"Toy Story (1995)"` becomes title `"Toy Story"` with year `"1995"`;
    /// `"Adventure|Animation"` becomes `"adventure, animation"`. A record
    /// without a trailing year keeps `year` as it was.
    pub fn clean(&self, record: Record) -> Record {
        let title = record.title.trim();

        let (title, year) = match self.year.captures(title) {
            Some(captures) => {
                let year = captures[1].to_string();
                let stripped = self.year.replace(title, "").to_string();
                (stripped, Some(year))
            }
            None => (title.to_string(), record.year),
        };

        let genres = self.genre_sep.replace_all(&record.genres.to_lowercase(), ", ").to_string();

        Record { title, genres, year }
    }
}

/// Read a JSONL record file, one record per non-empty line
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let file = fs::File::open(path).context(format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut records = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: T =
            serde_json::from_str(&line).context(format!("Malformed record at {}:{}", path.display(), line_no + 1))?;
        records.push(record);
    }

    info!(count = records.len(), path = %path.display(), "read records");
    Ok(records)
}

/// Write records as JSONL, one record per line
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut file = fs::File::create(path).context(format!("Failed to create {}", path.display()))?;

    for record in records {
        let line = serde_json::to_string(record)?;
        writeln!(file, "{}", line)?;
    }

    info!(count = records.len(), path = %path.display(), "wrote records");
    Ok(())
}

/// Merge per-record tag lists back into the original record order
pub fn merge_tags(records: Vec<Record>, tags: Vec<Vec<String>>) -> Vec<TaggedRecord> {
    debug_assert_eq!(records.len(), tags.len());
    records
        .into_iter()
        .zip(tags)
        .map(|(record, tags)| TaggedRecord { record, tags })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(title: &str, genres: &str) -> Record {
        Record {
            title: title.to_string(),
            genres: genres.to_string(),
            year: None,
        }
    }

    #[test]
    fn test_clean_extracts_trailing_year() {
        let cleaner = Cleaner::new().unwrap();

        let cleaned = cleaner.clean(record("  Toy Story (1995)  ", "Adventure|Animation|Children"));

        assert_eq!(cleaned.title, "Toy Story");
        assert_eq!(cleaned.year.as_deref(), Some("1995"));
        assert_eq!(cleaned.genres, "adventure, animation, children");
    }

    #[test]
    fn test_clean_keeps_title_without_year() {
        let cleaner = Cleaner::new().unwrap();

        let cleaned = cleaner.clean(record("Heat", "Action | Crime"));

        assert_eq!(cleaned.title, "Heat");
        assert_eq!(cleaned.year, None);
        assert_eq!(cleaned.genres, "action, crime");
    }

    #[test]
    fn test_clean_ignores_year_in_the_middle() {
        let cleaner = Cleaner::new().unwrap();

        let cleaned = cleaner.clean(record("2001: A Space Odyssey (1968)", ""));

        assert_eq!(cleaned.title, "2001: A Space Odyssey");
        assert_eq!(cleaned.year.as_deref(), Some("1968"));
        assert_eq!(cleaned.genres, "");
    }

    #[test]
    fn test_jsonl_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.jsonl");

        let records = vec![
            Record {
                title: "Toy Story".to_string(),
                genres: "adventure, animation".to_string(),
                year: Some("1995".to_string()),
            },
            record("Heat", "action, crime"),
        ];

        write_records(&path, &records).unwrap();
        let read: Vec<Record> = read_records(&path).unwrap();

        assert_eq!(read, records);
    }

    #[test]
    fn test_read_skips_blank_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.jsonl");
        fs::write(&path, "{\"title\":\"Heat\"}\n\n{\"title\":\"Alien\"}\n").unwrap();

        let read: Vec<Record> = read_records(&path).unwrap();

        assert_eq!(read.len(), 2);
        assert_eq!(read[1].title, "Alien");
        assert_eq!(read[1].genres, "");
    }

    #[test]
    fn test_read_reports_malformed_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("records.jsonl");
        fs::write(&path, "{\"title\":\"Heat\"}\nnot json\n").unwrap();

        let err = read_records::<Record>(&path).unwrap_err();
        assert!(err.to_string().contains(":2"));
    }

    #[test]
    fn test_merge_tags_preserves_order() {
        let records = vec![record("a", ""), record("b", "")];
        let tags = vec![vec!["t1".to_string()], vec![]];

        let tagged = merge_tags(records, tags);

        assert_eq!(tagged[0].record.title, "a");
        assert_eq!(tagged[0].tags, vec!["t1"]);
        assert_eq!(tagged[1].record.title, "b");
        assert!(tagged[1].tags.is_empty());
    }
}
