//! Curated song table: one hand-picked track per country code.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Deserialize;
use tracing::debug;

use crate::catalog::Region;

const BUILTIN_SONGS: &str = include_str!("../data/songs.toml");

/// Where a track descriptor came from
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackSource {
    Curated,
    Jamendo,
}

/// A playable (or at least displayable) track
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackDescriptor {
    pub title: String,
    pub artist: String,
    pub audio_url: Option<String>,
    pub cover_url: Option<String>,
    /// Web page for the track, if the source has one
    pub share_url: Option<String>,
    pub source: TrackSource,
}

impl TrackDescriptor {
    pub fn is_playable(&self) -> bool {
        self.audio_url.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct SongFile {
    #[serde(default, rename = "song")]
    songs: Vec<SongEntry>,
}

#[derive(Debug, Deserialize)]
struct SongEntry {
    code: String,
    title: String,
    artist: String,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    cover: Option<String>,
}

impl From<SongEntry> for TrackDescriptor {
    fn from(entry: SongEntry) -> Self {
        Self {
            title: entry.title,
            artist: entry.artist,
            audio_url: entry.url.filter(|u| !u.trim().is_empty()),
            cover_url: entry.cover.filter(|u| !u.trim().is_empty()),
            share_url: None,
            source: TrackSource::Curated,
        }
    }
}

/// Static mapping from region code to track
#[derive(Clone, Debug, Default)]
pub struct SongTable {
    songs: HashMap<String, TrackDescriptor>,
}

impl SongTable {
    /// The table shipped with the binary
    pub fn builtin() -> Result<Self> {
        Self::from_toml_str(BUILTIN_SONGS).context("built-in song table is malformed")
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: SongFile = toml::from_str(text)?;
        let songs = file
            .songs
            .into_iter()
            .map(|entry| (entry.code.trim().to_uppercase(), TrackDescriptor::from(entry)))
            .collect();
        Ok(Self { songs })
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Entries from `other` replace entries with the same code
    pub fn merge(&mut self, other: SongTable) {
        for (code, track) in other.songs {
            debug!(%code, title = %track.title, "song table override");
            self.songs.insert(code, track);
        }
    }

    pub fn insert(&mut self, code: impl Into<String>, track: TrackDescriptor) {
        self.songs.insert(code.into(), track);
    }

    pub fn get(&self, code: &str) -> Option<&TrackDescriptor> {
        self.songs.get(code)
    }

    pub fn len(&self) -> usize {
        self.songs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.songs.is_empty()
    }

    /// Regions whose curated track has an audio URL, in catalog order.
    /// These are the only regions known to resolve without the network.
    pub fn playable_pool(&self, regions: &[Region]) -> Vec<Region> {
        regions
            .par_iter()
            .filter(|r| self.get(&r.code).is_some_and(TrackDescriptor::is_playable))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_table_parses() {
        let table = SongTable::builtin().unwrap();
        assert!(!table.is_empty());
        let fra = table.get("FRA").unwrap();
        assert_eq!(fra.source, TrackSource::Curated);
        assert!(fra.is_playable());
    }

    #[test]
    fn test_blank_url_is_absent() {
        let table = SongTable::from_toml_str(
            r#"
            [[song]]
            code = "isl"
            title = "Hoppípolla"
            artist = "Sigur Rós"
            url = "  "
            "#,
        )
        .unwrap();
        let isl = table.get("ISL").unwrap();
        assert_eq!(isl.audio_url, None);
        assert!(!isl.is_playable());
    }

    #[test]
    fn test_merge_overrides_by_code() {
        let mut table = SongTable::from_toml_str(
            "[[song]]\ncode = \"JPN\"\ntitle = \"A\"\nartist = \"B\"\n",
        )
        .unwrap();
        let other = SongTable::from_toml_str(
            "[[song]]\ncode = \"JPN\"\ntitle = \"C\"\nartist = \"D\"\n\
             url = \"https://example.com/c.mp3\"\n",
        )
        .unwrap();
        table.merge(other);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("JPN").unwrap().title, "C");
    }

    #[test]
    fn test_pool_keeps_only_playable_in_order() {
        let table = SongTable::from_toml_str(
            r#"
            [[song]]
            code = "BRA"
            title = "Garota de Ipanema"
            artist = "Tom Jobim"
            url = "https://example.com/bra.mp3"

            [[song]]
            code = "CAN"
            title = "Untitled"
            artist = "Nobody"

            [[song]]
            code = "FRA"
            title = "La Vie en rose"
            artist = "Édith Piaf"
            url = "https://example.com/fra.mp3"
            "#,
        )
        .unwrap();
        let regions = vec![
            Region::new("BRA", "Brazil"),
            Region::new("CAN", "Canada"),
            Region::new("DEU", "Germany"),
            Region::new("FRA", "France"),
        ];
        let pool = table.playable_pool(&regions);
        let codes: Vec<&str> = pool.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["BRA", "FRA"]);
    }
}
