//! Domain records shared by the analysis helpers, the store and the API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use utoipa::ToSchema;

/// A song as the user searched for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Song {
    pub artist: String,
    pub title: String,
}

impl Song {
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            title: title.into(),
        }
    }

    /// Storage key for everything attached to this song.
    pub fn id(&self) -> String {
        format!("{}-{}", self.artist, self.title)
    }
}

/// A named entity found in the lyrics, reduced to what the frontend shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SongEntity {
    pub name: String,
    /// Importance of the entity in the lyrics. Summed across repeated mentions,
    /// so aggregated values can exceed 1.0.
    pub salience: f64,
    #[schema(value_type = Vec<String>)]
    pub types: BTreeSet<String>,
    #[serde(default)]
    pub wikipedia_url: String,
}

impl SongEntity {
    pub fn new(
        name: impl Into<String>,
        salience: f64,
        entity_type: impl Into<String>,
        wikipedia_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            salience,
            types: BTreeSet::from([entity_type.into()]),
            wikipedia_url: wikipedia_url.into(),
        }
    }
}

/// Document level sentiment.
///
/// `score` ranges from -1.0 (negative) to 1.0 (positive); `magnitude` is the
/// overall strength of emotion, from 0.0 upwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct SongSentiment {
    pub score: f32,
    pub magnitude: f32,
}

/// Everything known about an analyzed song.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SongInfo {
    pub song_id: String,
    pub sentiment: SongSentiment,
    #[serde(default)]
    pub top_entities: Vec<SongEntity>,
    pub lyrics: String,
    /// YouTube video ids related to the most salient entity.
    #[serde(default)]
    pub related_video_ids: Vec<String>,
}

/// How often a song has been looked up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SongCounter {
    pub song_id: String,
    pub song: Song,
    pub search_count: i64,
}

impl SongCounter {
    /// Counter for a song that is being searched for the first time.
    pub fn first_search(song: Song) -> Self {
        Self {
            song_id: song.id(),
            song,
            search_count: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_song_id_joins_artist_and_title() {
        assert_eq!(Song::new("Drake", "Toosie Slide").id(), "Drake-Toosie Slide");
    }

    #[test]
    fn test_song_info_uses_camel_case_on_the_wire() {
        let info = SongInfo {
            song_id: "Drake-Toosie Slide".to_string(),
            sentiment: SongSentiment { score: 0.5, magnitude: 3.0 },
            top_entities: vec![SongEntity::new("Drake", 0.7, "PERSON", "")],
            lyrics: "It go right foot up".to_string(),
            related_video_ids: vec!["xWggTb45brM".to_string()],
        };

        let value = serde_json::to_value(&info).unwrap();
        assert_eq!(value["songId"], "Drake-Toosie Slide");
        assert_eq!(value["topEntities"][0]["types"][0], "PERSON");
        assert_eq!(value["topEntities"][0]["wikipediaUrl"], "");
        assert_eq!(value["relatedVideoIds"][0], "xWggTb45brM");

        let back: SongInfo = serde_json::from_value(value).unwrap();
        assert_eq!(back, info);
    }

    #[test]
    fn test_first_search_starts_at_one() {
        let counter = SongCounter::first_search(Song::new("Drake", "Toosie Slide"));
        assert_eq!(counter.search_count, 1);
        assert_eq!(counter.song_id, "Drake-Toosie Slide");
    }
}
