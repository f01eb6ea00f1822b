//! Postgres backend for [`SongStore`].

use anyhow::Result;
use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::types::Json;
use sqlx::FromRow;
use tracing::info;

use crate::error::AppError;
use crate::models::{Song, SongCounter, SongEntity, SongInfo, SongSentiment};
use crate::store::{SongStore, TOP_SIZE};

pub async fn connect(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn init_db(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS song_info (
            song_id VARCHAR PRIMARY KEY,
            score REAL NOT NULL,
            magnitude REAL NOT NULL,
            top_entities JSONB NOT NULL DEFAULT '[]',
            lyrics TEXT NOT NULL,
            related_video_ids JSONB NOT NULL DEFAULT '[]',
            updated_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP
        );
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS song_counters (
            song_id VARCHAR PRIMARY KEY,
            artist VARCHAR NOT NULL,
            title VARCHAR NOT NULL,
            search_count BIGINT NOT NULL DEFAULT 1
        );
        "#,
    )
    .execute(pool)
    .await?;

    // Leaderboard query sorts on this.
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS song_counters_search_count_idx ON song_counters (search_count DESC);",
    )
    .execute(pool)
    .await?;

    info!("🗄️ Song tables ready");
    Ok(())
}

#[derive(Debug, FromRow)]
pub struct SongInfoRow {
    pub song_id: String,
    pub score: f32,
    pub magnitude: f32,
    pub top_entities: Json<Vec<SongEntity>>,
    pub lyrics: String,
    pub related_video_ids: Json<Vec<String>>,
}

impl From<SongInfoRow> for SongInfo {
    fn from(row: SongInfoRow) -> Self {
        SongInfo {
            song_id: row.song_id,
            sentiment: SongSentiment {
                score: row.score,
                magnitude: row.magnitude,
            },
            top_entities: row.top_entities.0,
            lyrics: row.lyrics,
            related_video_ids: row.related_video_ids.0,
        }
    }
}

impl From<&SongInfo> for SongInfoRow {
    fn from(info: &SongInfo) -> Self {
        SongInfoRow {
            song_id: info.song_id.clone(),
            score: info.sentiment.score,
            magnitude: info.sentiment.magnitude,
            top_entities: Json(info.top_entities.clone()),
            lyrics: info.lyrics.clone(),
            related_video_ids: Json(info.related_video_ids.clone()),
        }
    }
}

#[derive(Debug, FromRow)]
pub struct SongCounterRow {
    pub song_id: String,
    pub artist: String,
    pub title: String,
    pub search_count: i64,
}

impl From<SongCounterRow> for SongCounter {
    fn from(row: SongCounterRow) -> Self {
        SongCounter {
            song_id: row.song_id,
            song: Song::new(row.artist, row.title),
            search_count: row.search_count,
        }
    }
}

pub struct PgSongStore {
    pool: PgPool,
}

impl PgSongStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SongStore for PgSongStore {
    async fn save_song_info(&self, info: &SongInfo) -> Result<(), AppError> {
        let row = SongInfoRow::from(info);
        // Single upsert statement, so a record is written whole or not at all.
        sqlx::query(
            r#"
            INSERT INTO song_info (song_id, score, magnitude, top_entities, lyrics, related_video_ids)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (song_id) DO UPDATE SET
                score = EXCLUDED.score,
                magnitude = EXCLUDED.magnitude,
                top_entities = EXCLUDED.top_entities,
                lyrics = EXCLUDED.lyrics,
                related_video_ids = EXCLUDED.related_video_ids,
                updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(&row.song_id)
        .bind(row.score)
        .bind(row.magnitude)
        .bind(&row.top_entities)
        .bind(&row.lyrics)
        .bind(&row.related_video_ids)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn song_info(&self, song_id: &str) -> Result<Option<SongInfo>, AppError> {
        let row: Option<SongInfoRow> = sqlx::query_as(
            r#"SELECT song_id, score, magnitude, top_entities, lyrics, related_video_ids
               FROM song_info WHERE song_id = $1"#,
        )
        .bind(song_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(SongInfo::from))
    }

    async fn record_search(&self, song: &Song) -> Result<SongCounter, AppError> {
        let row: SongCounterRow = sqlx::query_as(
            r#"
            INSERT INTO song_counters (song_id, artist, title, search_count)
            VALUES ($1, $2, $3, 1)
            ON CONFLICT (song_id) DO UPDATE SET search_count = song_counters.search_count + 1
            RETURNING song_id, artist, title, search_count
            "#,
        )
        .bind(song.id())
        .bind(&song.artist)
        .bind(&song.title)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn top_songs(&self) -> Result<Vec<SongCounter>, AppError> {
        let rows: Vec<SongCounterRow> = sqlx::query_as(
            r#"SELECT song_id, artist, title, search_count
               FROM song_counters
               ORDER BY search_count DESC, song_id ASC
               LIMIT $1"#,
        )
        .bind(TOP_SIZE as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(SongCounter::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Executor;
    use std::sync::Arc;

    /// Store backed by a fresh schema named after the test, or `None` when
    /// `DATABASE_URL` is not set.
    async fn pg_store(schema: &str) -> Option<PgSongStore> {
        let Ok(url) = std::env::var("DATABASE_URL") else {
            eprintln!("DATABASE_URL not set, skipping Postgres test");
            return None;
        };

        let admin = connect(&url, 1).await.unwrap();
        admin
            .execute(format!("DROP SCHEMA IF EXISTS {schema} CASCADE").as_str())
            .await
            .unwrap();
        admin
            .execute(format!("CREATE SCHEMA {schema}").as_str())
            .await
            .unwrap();

        let search_path = format!("SET search_path TO {schema}");
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .after_connect(move |conn, _meta| {
                let search_path = search_path.clone();
                Box::pin(async move { conn.execute(search_path.as_str()).await.map(|_| ()) })
            })
            .connect(&url)
            .await
            .unwrap();
        init_db(&pool).await.unwrap();

        Some(PgSongStore::new(pool))
    }

    fn numbered_song(i: usize) -> Song {
        Song::new(i.to_string(), i.to_string())
    }

    #[tokio::test]
    async fn test_pg_only_ten_most_searched_are_returned() {
        let Some(store) = pg_store("lyrics_test_top_ten").await else {
            return;
        };
        assert!(store.top_songs().await.unwrap().is_empty());

        for i in 1..=15 {
            let song = numbered_song(i);
            for _ in 0..i {
                store.record_search(&song).await.unwrap();
            }
        }

        let top = store.top_songs().await.unwrap();
        let counts: Vec<i64> = top.iter().map(|c| c.search_count).collect();
        assert_eq!(counts, (6..=15).rev().collect::<Vec<i64>>());
        assert_eq!(top[0].song, numbered_song(15));
        assert_eq!(top[9].song, numbered_song(6));
    }

    #[tokio::test]
    async fn test_pg_ties_ordered_by_song_id() {
        let Some(store) = pg_store("lyrics_test_ties").await else {
            return;
        };
        for id in ["b", "a", "c", "c"] {
            store.record_search(&Song::new(id, id)).await.unwrap();
        }

        let top = store.top_songs().await.unwrap();
        let ids: Vec<&str> = top.iter().map(|c| c.song_id.as_str()).collect();
        assert_eq!(ids, vec!["c-c", "a-a", "b-b"]);
    }

    #[tokio::test]
    async fn test_pg_concurrent_searches_are_all_counted() {
        let Some(store) = pg_store("lyrics_test_concurrent").await else {
            return;
        };
        let store = Arc::new(store);
        let song = Song::new("Drake", "Toosie Slide");

        let tasks: Vec<_> = (0..50)
            .map(|_| {
                let store = store.clone();
                let song = song.clone();
                tokio::spawn(async move { store.record_search(&song).await.unwrap() })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let top = store.top_songs().await.unwrap();
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].search_count, 50);
        assert_eq!(top[0].song, song);
    }

    #[tokio::test]
    async fn test_pg_song_info_is_overwritten_whole() {
        let Some(store) = pg_store("lyrics_test_song_info").await else {
            return;
        };
        assert!(store.song_info("Drake-Toosie Slide").await.unwrap().is_none());

        let first = SongInfo {
            song_id: "Drake-Toosie Slide".to_string(),
            sentiment: SongSentiment { score: 0.25, magnitude: 4.5 },
            top_entities: vec![SongEntity::new("Drake", 0.75, "PERSON", "")],
            lyrics: "Right foot up, left foot slide".to_string(),
            related_video_ids: vec!["xWggTb45brM".to_string()],
        };
        store.save_song_info(&first).await.unwrap();
        assert_eq!(
            store.song_info("Drake-Toosie Slide").await.unwrap(),
            Some(first)
        );

        let second = SongInfo {
            song_id: "Drake-Toosie Slide".to_string(),
            sentiment: SongSentiment { score: -0.5, magnitude: 2.0 },
            top_entities: vec![],
            lyrics: "Left foot up".to_string(),
            related_video_ids: vec![],
        };
        store.save_song_info(&second).await.unwrap();
        assert_eq!(
            store.song_info("Drake-Toosie Slide").await.unwrap(),
            Some(second)
        );
    }

    #[test]
    fn test_song_info_row_mapping() {
        let info = SongInfo {
            song_id: "Drake-Toosie Slide".to_string(),
            sentiment: SongSentiment { score: 0.3, magnitude: 6.1 },
            top_entities: vec![SongEntity::new("Drake", 0.7, "PERSON", "")],
            lyrics: "It go right foot up".to_string(),
            related_video_ids: vec!["abc".to_string(), "def".to_string()],
        };

        let row = SongInfoRow::from(&info);
        assert_eq!(row.score, 0.3);
        assert_eq!(row.related_video_ids.0.len(), 2);
        assert_eq!(SongInfo::from(row), info);
    }

    #[test]
    fn test_counter_row_mapping() {
        let counter = SongCounter::from(SongCounterRow {
            song_id: "Drake-Toosie Slide".to_string(),
            artist: "Drake".to_string(),
            title: "Toosie Slide".to_string(),
            search_count: 7,
        });
        assert_eq!(counter.song, Song::new("Drake", "Toosie Slide"));
        assert_eq!(counter.search_count, 7);
    }
}
