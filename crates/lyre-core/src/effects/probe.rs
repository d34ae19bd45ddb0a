//! Track probing: read tags from a local file to name playlist entries.

use std::path::Path;

use lofty::prelude::*;
use lofty::probe::Probe;

use crate::models::Track;

/// Probe result for one local file.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbedTrack {
    pub track: Track,
    pub artist: Option<String>,
}

impl ProbedTrack {
    /// `Artist - Title` when the artist is tagged, else the title alone.
    pub fn label(&self) -> String {
        match self.artist.as_deref().map(str::trim).filter(|a| !a.is_empty()) {
            Some(artist) => format!("{} - {}", artist, self.track.title),
            None => self.track.title.clone(),
        }
    }
}

/// Read title and artist. Untagged or unreadable files keep
/// their file name as title; probing never fails.
pub fn probe_track(file_path: &str) -> ProbedTrack {
    let fallback = Track::from_source(file_path);

    let tagged = match Probe::open(Path::new(file_path)).and_then(|p| p.read()) {
        Ok(t) => t,
        Err(e) => {
            log::debug!("lyre: no tags for {}: {}", file_path, e);
            return ProbedTrack { track: fallback, artist: None };
        }
    };

    let tag = tagged.primary_tag().or_else(|| tagged.first_tag());
    let title = tag
        .and_then(|t| t.title().map(|s| s.to_string()))
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(fallback.title);
    let artist = tag.and_then(|t| t.artist().map(|s| s.to_string()));

    ProbedTrack {
        track: Track::with_title(file_path, title),
        artist,
    }
}
