//! JSON routes over the directory.
//!
//! Each request opens its own [`Store`] on a blocking worker and drops it
//! before the response is written, so a connection never outlives the
//! request that used it.

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        FromRequest, FromRequestParts, Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;

use crate::db::Store;
use crate::error::{DirectoryError, Entity};
use crate::models::{ArtistForm, ShowForm, VenueForm};
use crate::queries::{
    ArtistDetail, ArtistListing, LocaleGroup, SearchResults, ShowListing, VenueDetail,
};

#[derive(Clone)]
pub struct AppState {
    database: Arc<PathBuf>,
}

impl AppState {
    pub fn new(database: PathBuf) -> Self {
        Self {
            database: Arc::new(database),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/venues", get(list_venues))
        .route("/venues/search", post(search_venues))
        .route("/venues/create", post(create_venue))
        .route("/venues/:id", get(show_venue).delete(delete_venue))
        .route("/venues/:id/edit", get(edit_venue).post(edit_venue_submission))
        .route("/artists", get(list_artists))
        .route("/artists/search", post(search_artists))
        .route("/artists/create", post(create_artist))
        .route("/artists/:id", get(show_artist).delete(delete_artist))
        .route("/artists/:id/edit", get(edit_artist).post(edit_artist_submission))
        .route("/shows", get(list_shows))
        .route("/shows/create", post(create_show))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SearchRequest {
    #[serde(default)]
    search_term: String,
}

/// JSON body whose rejections answer with an [`ErrorBody`].
#[derive(FromRequest)]
#[from_request(via(Json), rejection(ApiError))]
struct Payload<T>(T);

/// Path parameters whose rejections answer with an [`ErrorBody`].
#[derive(FromRequestParts)]
#[from_request(via(Path), rejection(ApiError))]
struct Id<T>(T);

#[derive(Debug, Serialize)]
struct Created {
    id: i64,
    message: String,
}

impl Created {
    fn listed(id: i64, what: impl std::fmt::Display) -> Self {
        Self {
            id,
            message: format!("{what} was successfully listed!"),
        }
    }
}

/// Edit page payload: the record's current values as a submittable form.
#[derive(Debug, Serialize)]
struct EditPage<F> {
    id: i64,
    form: F,
}

#[derive(Debug, Serialize)]
struct Success {
    success: bool,
}

const SUCCESS: Success = Success { success: true };

/// Error body, `{code, message}`.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_SERVER_ERROR",
            message: message.into(),
        }
    }
}

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        let (status, code) = match &err {
            DirectoryError::NotFound { .. } => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            DirectoryError::Validation { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR")
            }
            DirectoryError::Persistence { .. } => (StatusCode::BAD_REQUEST, "PERSISTENCE_FAILED"),
            DirectoryError::ServerFault { .. } | DirectoryError::Store(_) => {
                tracing::error!(error = ?err, "directory fault");
                return Self::internal(err.to_string());
            }
        };
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            code: "INVALID_REQUEST",
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self {
            status: rejection.status(),
            code: "INVALID_REQUEST",
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, code = self.code, message = %self.message, "request failed");
        } else {
            tracing::warn!(status = %self.status, code = self.code, message = %self.message, "request rejected");
        }
        let body = ErrorBody {
            code: self.code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}

async fn with_store<T, F>(state: &AppState, work: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut Store) -> Result<T, DirectoryError> + Send + 'static,
{
    let database = Arc::clone(&state.database);
    let outcome = tokio::task::spawn_blocking(move || -> Result<T, DirectoryError> {
        let mut store = Store::open(&database)?;
        work(&mut store)
    })
    .await
    .map_err(|err| ApiError::internal(format!("store worker failed: {err}")))?;
    outcome.map_err(ApiError::from)
}

fn not_found(entity: Entity, id: i64) -> DirectoryError {
    DirectoryError::NotFound { entity, id }
}

async fn list_venues(State(state): State<AppState>) -> Result<Json<Vec<LocaleGroup>>, ApiError> {
    let areas = with_store(&state, |store| store.venues_by_locale(Utc::now())).await?;
    Ok(Json(areas))
}

async fn search_venues(
    State(state): State<AppState>,
    Payload(request): Payload<SearchRequest>,
) -> Result<Json<SearchResults>, ApiError> {
    let results = with_store(&state, move |store| {
        store.search_venues(&request.search_term, Utc::now())
    })
    .await?;
    Ok(Json(results))
}

async fn show_venue(
    State(state): State<AppState>,
    Id(id): Id<i64>,
) -> Result<Json<VenueDetail>, ApiError> {
    let venue = with_store(&state, move |store| store.venue_detail(id, Utc::now())).await?;
    Ok(Json(venue))
}

async fn create_venue(
    State(state): State<AppState>,
    Payload(form): Payload<VenueForm>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let name = format!("Venue {}", form.display_name());
    let id = with_store(&state, move |store| store.create_venue(&form)).await?;
    Ok((StatusCode::CREATED, Json(Created::listed(id, name))))
}

async fn edit_venue(
    State(state): State<AppState>,
    Id(id): Id<i64>,
) -> Result<Json<EditPage<VenueForm>>, ApiError> {
    let venue = with_store(&state, move |store| {
        store.get_venue(id)?.ok_or_else(|| not_found(Entity::Venue, id))
    })
    .await?;
    Ok(Json(EditPage {
        id,
        form: VenueForm::from(&venue),
    }))
}

async fn edit_venue_submission(
    State(state): State<AppState>,
    Id(id): Id<i64>,
    Payload(form): Payload<VenueForm>,
) -> Result<Json<Success>, ApiError> {
    with_store(&state, move |store| store.update_venue(id, &form)).await?;
    Ok(Json(SUCCESS))
}

async fn delete_venue(
    State(state): State<AppState>,
    Id(id): Id<i64>,
) -> Result<Json<Success>, ApiError> {
    with_store(&state, move |store| store.delete_venue(id)).await?;
    Ok(Json(SUCCESS))
}

async fn list_artists(State(state): State<AppState>) -> Result<Json<Vec<ArtistListing>>, ApiError> {
    let artists = with_store(&state, |store| store.list_artists()).await?;
    Ok(Json(artists))
}

async fn search_artists(
    State(state): State<AppState>,
    Payload(request): Payload<SearchRequest>,
) -> Result<Json<SearchResults>, ApiError> {
    let results = with_store(&state, move |store| {
        store.search_artists(&request.search_term, Utc::now())
    })
    .await?;
    Ok(Json(results))
}

async fn show_artist(
    State(state): State<AppState>,
    Id(id): Id<i64>,
) -> Result<Json<ArtistDetail>, ApiError> {
    let artist = with_store(&state, move |store| store.artist_detail(id, Utc::now())).await?;
    Ok(Json(artist))
}

async fn create_artist(
    State(state): State<AppState>,
    Payload(form): Payload<ArtistForm>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let name = format!("Artist {}", form.display_name());
    let id = with_store(&state, move |store| store.create_artist(&form)).await?;
    Ok((StatusCode::CREATED, Json(Created::listed(id, name))))
}

async fn edit_artist(
    State(state): State<AppState>,
    Id(id): Id<i64>,
) -> Result<Json<EditPage<ArtistForm>>, ApiError> {
    let artist = with_store(&state, move |store| {
        store.get_artist(id)?.ok_or_else(|| not_found(Entity::Artist, id))
    })
    .await?;
    Ok(Json(EditPage {
        id,
        form: ArtistForm::from(&artist),
    }))
}

async fn edit_artist_submission(
    State(state): State<AppState>,
    Id(id): Id<i64>,
    Payload(form): Payload<ArtistForm>,
) -> Result<Json<Success>, ApiError> {
    with_store(&state, move |store| store.update_artist(id, &form)).await?;
    Ok(Json(SUCCESS))
}

async fn delete_artist(
    State(state): State<AppState>,
    Id(id): Id<i64>,
) -> Result<Json<Success>, ApiError> {
    with_store(&state, move |store| store.delete_artist(id)).await?;
    Ok(Json(SUCCESS))
}

async fn list_shows(State(state): State<AppState>) -> Result<Json<Vec<ShowListing>>, ApiError> {
    let shows = with_store(&state, |store| store.list_shows(Utc::now())).await?;
    Ok(Json(shows))
}

async fn create_show(
    State(state): State<AppState>,
    Payload(form): Payload<ShowForm>,
) -> Result<(StatusCode, Json<Created>), ApiError> {
    let id = with_store(&state, move |store| store.create_show(&form)).await?;
    Ok((StatusCode::CREATED, Json(Created::listed(id, "Show"))))
}
