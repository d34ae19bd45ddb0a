//! Track identity.

use serde::{Deserialize, Serialize};

/// One playable entry of the playlist.
///
/// `source` is handed to the media backend verbatim (a file path or URL).
/// `title` is what the playlist and the now-playing label show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub source: String,
    pub title: String,
}

impl Track {
    /// Build a track titled after the last path component of its source.
    pub fn from_source(source: impl Into<String>) -> Self {
        let source = source.into();
        let title = display_name(&source).to_string();
        Self { source, title }
    }

    pub fn with_title(source: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
        }
    }
}

/// Last `/`-separated component of a path or URL, ignoring a query string.
fn display_name(source: &str) -> &str {
    let without_query = source.split(['?', '#']).next().unwrap_or(source);
    without_query
        .trim_end_matches('/')
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or(source)
}
