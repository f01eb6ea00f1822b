use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Form, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

use crate::analysis::{self, Interpretation};
use crate::error::AppError;
use crate::language::LanguageClient;
use crate::models::{Song, SongCounter, SongEntity, SongInfo, SongSentiment};
use crate::store::SongStore;

pub struct AppState {
    pub language: LanguageClient,
    pub store: Arc<dyn SongStore>,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        analyze_sentiment,
        analyze_entities,
        get_song_info,
        save_song_info,
        record_song_request,
        top_songs
    ),
    components(
        schemas(
            LyricsForm,
            SongInfoForm,
            SongRequestForm,
            SentimentResponse,
            Interpretation,
            Song,
            SongCounter,
            SongEntity,
            SongInfo,
            SongSentiment
        )
    ),
    tags(
        (name = "analysis", description = "Lyrics analysis through the Natural Language API"),
        (name = "songs", description = "Stored song records and popularity")
    )
)]
pub struct ApiDoc;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        .route("/sentiment", post(analyze_sentiment))
        .route("/entity", post(analyze_entities))
        .route("/song-info", get(get_song_info).post(save_song_info))
        .route("/song-request", post(record_song_request))
        .route("/top", get(top_songs))
        .with_state(state)
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LyricsForm {
    pub lyrics: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct SongInfoQuery {
    /// Song id, `<artist>-<title>`
    pub id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SongInfoForm {
    /// JSON encoded [`SongInfo`]
    #[serde(rename = "songInfo")]
    pub song_info: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SongRequestForm {
    pub artist: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SentimentResponse {
    pub score: f32,
    pub magnitude: f32,
    pub interpretation: Interpretation,
    pub description: String,
}

impl From<SongSentiment> for SentimentResponse {
    fn from(sentiment: SongSentiment) -> Self {
        let interpretation = sentiment.interpretation();
        Self {
            score: sentiment.score,
            magnitude: sentiment.magnitude,
            interpretation,
            description: interpretation.description().to_string(),
        }
    }
}

fn required(value: Option<String>, name: &str) -> Result<String, AppError> {
    value
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| AppError::missing_field(name))
}

async fn health() -> &'static str {
    "OK"
}

/// Document sentiment of the lyrics with a readable interpretation.
#[utoipa::path(
    post,
    path = "/sentiment",
    request_body(content = LyricsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Sentiment of the lyrics", body = SentimentResponse),
        (status = 400, description = "Missing lyrics"),
        (status = 502, description = "Natural Language API failure")
    ),
    tag = "analysis"
)]
pub async fn analyze_sentiment(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LyricsForm>,
) -> Result<Json<SentimentResponse>, AppError> {
    let lyrics = required(form.lyrics, "lyrics")?;
    let sentiment = state.language.analyze_sentiment(&lyrics).await?;

    let response = SentimentResponse::from(sentiment);
    info!(
        score = response.score,
        magnitude = response.magnitude,
        interpretation = ?response.interpretation,
        "🧠 Sentiment analyzed"
    );
    Ok(Json(response))
}

/// The most salient entities of the lyrics, repeated mentions merged.
#[utoipa::path(
    post,
    path = "/entity",
    request_body(content = LyricsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Top entities, most salient first", body = [SongEntity]),
        (status = 400, description = "Missing lyrics"),
        (status = 502, description = "Natural Language API failure")
    ),
    tag = "analysis"
)]
pub async fn analyze_entities(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LyricsForm>,
) -> Result<Json<Vec<SongEntity>>, AppError> {
    let lyrics = required(form.lyrics, "lyrics")?;
    let raw = state.language.analyze_entities(&lyrics).await?;
    let raw_count = raw.len();

    let top = analysis::top_salient_entities(analysis::simplify_entities(&raw));
    info!(raw = raw_count, kept = top.len(), "🧠 Entities analyzed");
    Ok(Json(top))
}

#[utoipa::path(
    get,
    path = "/song-info",
    params(SongInfoQuery),
    responses(
        (status = 200, description = "Stored song record", body = SongInfo),
        (status = 400, description = "Missing id"),
        (status = 404, description = "No record for this song")
    ),
    tag = "songs"
)]
pub async fn get_song_info(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SongInfoQuery>,
) -> Result<Json<SongInfo>, AppError> {
    let id = required(query.id, "id")?;
    match state.store.song_info(&id).await? {
        Some(info) => Ok(Json(info)),
        None => Err(AppError::NotFound(format!("no song info for '{id}'"))),
    }
}

/// Stores the full analysis of a song, replacing an earlier one.
#[utoipa::path(
    post,
    path = "/song-info",
    request_body(content = SongInfoForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 201, description = "Record stored", body = SongInfo),
        (status = 400, description = "Missing or malformed songInfo")
    ),
    tag = "songs"
)]
pub async fn save_song_info(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SongInfoForm>,
) -> Result<(StatusCode, Json<SongInfo>), AppError> {
    let raw = required(form.song_info, "songInfo")?;
    let info: SongInfo = serde_json::from_str(&raw)
        .map_err(|e| AppError::BadRequest(format!("malformed songInfo: {e}")))?;
    if info.song_id.trim().is_empty() {
        return Err(AppError::missing_field("songInfo.songId"));
    }

    state.store.save_song_info(&info).await?;
    info!(song_id = %info.song_id, "💾 Song info saved");
    Ok((StatusCode::CREATED, Json(info)))
}

/// Counts a search for a song.
#[utoipa::path(
    post,
    path = "/song-request",
    request_body(content = SongRequestForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Updated counter", body = SongCounter),
        (status = 400, description = "Missing artist or title")
    ),
    tag = "songs"
)]
pub async fn record_song_request(
    State(state): State<Arc<AppState>>,
    Form(form): Form<SongRequestForm>,
) -> Result<Json<SongCounter>, AppError> {
    let song = Song::new(
        required(form.artist, "artist")?,
        required(form.title, "title")?,
    );
    let counter = state.store.record_search(&song).await?;
    Ok(Json(counter))
}

/// The most requested songs.
#[utoipa::path(
    get,
    path = "/top",
    responses(
        (status = 200, description = "Most searched songs first", body = [SongCounter])
    ),
    tag = "songs"
)]
pub async fn top_songs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<SongCounter>>, AppError> {
    Ok(Json(state.store.top_songs().await?))
}
