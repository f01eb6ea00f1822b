//! Reshaping of Natural Language API results for the frontend.
//!
//! The API does the scoring; this module only turns its output into something
//! a listener can read: a coarse sentiment label and a short, deduplicated list
//! of the most salient entities.

use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;

use crate::language::RawEntity;
use crate::models::{SongEntity, SongSentiment};

/// How many entities end up in a song's top list.
pub const MAX_ENTITIES: usize = 10;

const NEUTRAL_MAGNITUDE_THRESHOLD: f32 = 2.0;
const NEGATIVE_SCORE_THRESHOLD: f32 = -0.15;
const POSITIVE_SCORE_THRESHOLD: f32 = 0.15;

/// Metadata key the API uses for the entity's Wikipedia article.
const WIKIPEDIA_URL_KEY: &str = "wikipedia_url";

/// Coarse reading of a (score, magnitude) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Interpretation {
    Neutral,
    Negative,
    Positive,
    Mixed,
}

impl Interpretation {
    pub fn description(self) -> &'static str {
        match self {
            Interpretation::Neutral => "This song doesn't convey any positive or negative feelings.",
            Interpretation::Negative => "This song is predominantly negative.",
            Interpretation::Positive => "This song is predominantly positive",
            Interpretation::Mixed => "This song has a lot of mixed feelings",
        }
    }
}

/// Classifies a sentiment. Rules are checked in order and all comparisons are
/// strict, so values sitting exactly on a threshold fall through.
pub fn interpret(score: f32, magnitude: f32) -> Interpretation {
    if magnitude < NEUTRAL_MAGNITUDE_THRESHOLD {
        return Interpretation::Neutral;
    }

    if score < NEGATIVE_SCORE_THRESHOLD {
        return Interpretation::Negative;
    }

    if score > POSITIVE_SCORE_THRESHOLD {
        return Interpretation::Positive;
    }

    Interpretation::Mixed
}

impl SongSentiment {
    pub fn interpretation(&self) -> Interpretation {
        interpret(self.score, self.magnitude)
    }
}

/// Keeps name, salience, type and Wikipedia link of each API entity. Every raw
/// entity carries exactly one type, so each set starts with a single tag.
pub fn simplify_entities(raw: &[RawEntity]) -> Vec<SongEntity> {
    raw.iter()
        .map(|entity| {
            SongEntity::new(
                entity.name.clone(),
                entity.salience,
                entity.entity_type.clone(),
                entity
                    .metadata
                    .get(WIKIPEDIA_URL_KEY)
                    .cloned()
                    .unwrap_or_default(),
            )
        })
        .collect()
}

/// Merges entities sharing a name and returns the [`MAX_ENTITIES`] most
/// salient ones, highest first.
///
/// Salience of a merged entity is the sum over its mentions and its types are
/// the union of theirs. The first non-empty Wikipedia link wins. Entities with
/// equal salience keep the order in which their name first appeared.
pub fn top_salient_entities(entities: Vec<SongEntity>) -> Vec<SongEntity> {
    let mut merged: Vec<SongEntity> = Vec::with_capacity(entities.len());
    let mut positions: HashMap<String, usize> = HashMap::new();

    for entity in entities {
        match positions.get(&entity.name) {
            Some(&pos) => {
                let existing = &mut merged[pos];
                existing.salience += entity.salience;
                existing.types.extend(entity.types);
                if existing.wikipedia_url.is_empty() {
                    existing.wikipedia_url = entity.wikipedia_url;
                }
            }
            None => {
                positions.insert(entity.name.clone(), merged.len());
                merged.push(entity);
            }
        }
    }

    // sort_by is stable
    merged.sort_by(|a, b| b.salience.total_cmp(&a.salience));
    merged.truncate(MAX_ENTITIES);
    merged
}
