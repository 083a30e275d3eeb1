//! Quick-command catalog parsing.
//!
//! The catalog is a human-edited text file. `#` starts a comment, trailing
//! whitespace is ignored, and blank lines are skipped. The remaining lines
//! pair up as a title followed by the command it runs:
//!
//! ```text
//! # build things
//! Build
//! cargo build --release
//!
//! Disk usage
//! du -sh .    # current directory only
//! ```

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub title: String,
    pub command: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// First entry whose title matches exactly.
    pub fn find(&self, title: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|entry| entry.title == title)
    }
}

/// Parse catalog text. A trailing title without a command line is dropped.
pub fn parse_catalog(contents: &str) -> Catalog {
    let lines: Vec<&str> = contents.lines().filter_map(meaningful_line).collect();
    let entries = lines
        .chunks_exact(2)
        .map(|pair| CatalogEntry {
            title: pair[0].to_string(),
            command: pair[1].to_string(),
        })
        .collect();
    Catalog { entries }
}

/// Strip the comment and trailing whitespace; `None` if nothing is left.
fn meaningful_line(line: &str) -> Option<&str> {
    let without_comment = match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    };
    let trimmed = without_comment.trim_end();
    if trimmed.trim_start().is_empty() {
        None
    } else {
        Some(trimmed)
    }
}
