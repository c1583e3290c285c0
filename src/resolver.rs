//! Region → track resolution: curated table first, remote search second.

use tracing::{debug, info};

use crate::catalog::Region;
use crate::error::{SearchError, SearchResult};
use crate::search::{SearchQuery, TrackRecord, TrackSearch, DEFAULT_LIMIT};
use crate::songs::{SongTable, TrackDescriptor};

/// Outcome of a successful lookup
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    Found(TrackDescriptor),
    /// Search worked but nothing playable turned up
    NotFound,
}

pub struct SongResolver<S> {
    songs: SongTable,
    search: S,
    limit: u32,
}

impl<S: TrackSearch> SongResolver<S> {
    pub fn new(songs: SongTable, search: S) -> Self {
        Self {
            songs,
            search,
            limit: DEFAULT_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn songs(&self) -> &SongTable {
        &self.songs
    }

    /// Resolve a region to a track. A curated entry with audio never touches
    /// the network. Without a credential, a curated entry lacking audio is
    /// still returned so its title and artist can be shown.
    pub async fn resolve(&self, region: &Region) -> SearchResult<Resolution> {
        let curated = self.songs.get(&region.code);
        if let Some(track) = curated.filter(|t| t.is_playable()) {
            debug!(code = %region.code, title = %track.title, "curated track");
            return Ok(Resolution::Found(track.clone()));
        }

        match self.search_remote(&region.name).await {
            Ok(Some(track)) => {
                info!(
                    code = %region.code,
                    title = %track.title,
                    artist = %track.artist,
                    "remote track"
                );
                Ok(Resolution::Found(track))
            }
            Ok(None) => {
                info!(code = %region.code, "no playable track found");
                Ok(Resolution::NotFound)
            }
            Err(SearchError::Configuration) => match curated {
                Some(track) => {
                    debug!(code = %region.code, "no credential, showing curated entry");
                    Ok(Resolution::Found(track.clone()))
                }
                None => Err(SearchError::Configuration),
            },
            Err(e) => Err(e),
        }
    }

    /// Free-text search on the name, then one tag search if that came back empty
    async fn search_remote(&self, name: &str) -> SearchResult<Option<TrackDescriptor>> {
        let mut results = self
            .search
            .search(&SearchQuery::new(name).with_limit(self.limit))
            .await?;

        if results.is_empty() {
            debug!(%name, "free-text search empty, trying tag search");
            results = self
                .search
                .search(&SearchQuery::new(format!("tag:{name}")).with_limit(self.limit))
                .await?;
        }

        Ok(results
            .into_iter()
            .find(TrackRecord::has_audio)
            .map(TrackRecord::into_descriptor))
    }
}
