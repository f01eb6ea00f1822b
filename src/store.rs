//! Song storage: analyzed song records and per-song search counters.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::error::AppError;
use crate::models::{Song, SongCounter, SongInfo};

/// Number of songs shown in the "most requested" list.
pub const TOP_SIZE: usize = 10;

#[async_trait]
pub trait SongStore: Send + Sync {
    /// Stores the record under its song id, replacing any previous one.
    async fn save_song_info(&self, info: &SongInfo) -> Result<(), AppError>;

    async fn song_info(&self, song_id: &str) -> Result<Option<SongInfo>, AppError>;

    /// Counts one more search for `song`, creating the counter on first use.
    async fn record_search(&self, song: &Song) -> Result<SongCounter, AppError>;

    /// The [`TOP_SIZE`] most searched songs, most searched first. Equal counts
    /// are ordered by song id.
    async fn top_songs(&self) -> Result<Vec<SongCounter>, AppError>;
}

/// Orders counters for the leaderboard and keeps the first [`TOP_SIZE`].
pub fn rank_counters(mut counters: Vec<SongCounter>) -> Vec<SongCounter> {
    counters.sort_by(|a, b| {
        b.search_count
            .cmp(&a.search_count)
            .then_with(|| a.song_id.cmp(&b.song_id))
    });
    counters.truncate(TOP_SIZE);
    counters
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Default)]
pub struct MemorySongStore {
    infos: RwLock<HashMap<String, SongInfo>>,
    counters: RwLock<HashMap<String, SongCounter>>,
}

impl MemorySongStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SongStore for MemorySongStore {
    async fn save_song_info(&self, info: &SongInfo) -> Result<(), AppError> {
        self.infos
            .write()
            .await
            .insert(info.song_id.clone(), info.clone());
        Ok(())
    }

    async fn song_info(&self, song_id: &str) -> Result<Option<SongInfo>, AppError> {
        Ok(self.infos.read().await.get(song_id).cloned())
    }

    async fn record_search(&self, song: &Song) -> Result<SongCounter, AppError> {
        // Holding the write guard makes read-increment-write atomic.
        let mut counters = self.counters.write().await;
        let counter = counters
            .entry(song.id())
            .and_modify(|c| c.search_count += 1)
            .or_insert_with(|| SongCounter::first_search(song.clone()));
        Ok(counter.clone())
    }

    async fn top_songs(&self) -> Result<Vec<SongCounter>, AppError> {
        let counters = self.counters.read().await.values().cloned().collect();
        Ok(rank_counters(counters))
    }
}
