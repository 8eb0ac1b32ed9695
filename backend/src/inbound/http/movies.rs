//! Movie catalogue handlers.
//!
//! ```text
//! GET    /api/v1/movies
//! GET    /api/v1/movies/{title}
//! POST   /api/v1/movies {"title":"Metropolis", ..., "poster":{"contentType":"image/png","data":"<base64>"}}
//! PATCH  /api/v1/movies/{title}
//! DELETE /api/v1/movies/{title}
//! GET    /api/v1/movies/{title}/stream   (honours Range: bytes=<start>-<end>)
//! ```
//!
//! Media travels inside the JSON body as base64 so uploads and fields are
//! validated together.

use actix_web::http::{StatusCode, header};
use actix_web::{HttpRequest, HttpResponse, delete, get, patch, post, web};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::domain::ports::{MovieStream, STREAM_CONTENT_TYPE};
use crate::domain::{Error, MediaAsset, Movie, MovieDraft, MoviePatch, MovieWithShowtimes};
use crate::inbound::http::ApiResult;
use crate::inbound::http::session::SessionContext;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{FieldName, decode_media, parse_title};

/// Base64-encoded file carried in a JSON body.
#[derive(Debug, Clone, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaUpload {
    #[schema(example = "image/png")]
    pub content_type: String,
    /// Standard base64 of the file contents.
    pub data: String,
}

/// Movie creation body.
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateMovieRequest {
    pub title: String,
    pub description: String,
    pub genre: String,
    /// Running time in seconds as declared by the uploader.
    #[serde(default)]
    pub duration_seconds: Option<u32>,
    #[serde(default)]
    pub poster: Option<MediaUpload>,
    #[serde(default)]
    pub video: Option<MediaUpload>,
}

/// Partial movie update; media are replaced only when supplied.
#[derive(Debug, Default, Deserialize, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMovieRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub genre: Option<String>,
    pub duration_seconds: Option<u32>,
    pub poster: Option<MediaUpload>,
    pub video: Option<MediaUpload>,
}

fn decode(upload: Option<&MediaUpload>, field: &'static str) -> Result<Option<MediaAsset>, Error> {
    upload
        .map(|media| decode_media(&media.content_type, &media.data, FieldName::new(field)))
        .transpose()
}

/// List every movie with its showtimes.
#[utoipa::path(
    get,
    path = "/api/v1/movies",
    responses(
        (status = 200, description = "Movies", body = [MovieWithShowtimes]),
        (status = 401, description = "Unauthorised", body = Error)
    ),
    tags = ["movies"],
    operation_id = "listMovies"
)]
#[get("/movies")]
pub async fn list_movies(
    state: web::Data<HttpState>,
    session: SessionContext,
) -> ApiResult<web::Json<Vec<MovieWithShowtimes>>> {
    session.require_principal()?;
    Ok(web::Json(state.movies.list_movies().await?))
}

/// Fetch one movie with its showtimes.
#[utoipa::path(
    get,
    path = "/api/v1/movies/{title}",
    params(("title" = String, Path, description = "Movie title")),
    responses(
        (status = 200, description = "Movie", body = MovieWithShowtimes),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Not found", body = Error)
    ),
    tags = ["movies"],
    operation_id = "getMovie"
)]
#[get("/movies/{title}")]
pub async fn get_movie(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<MovieWithShowtimes>> {
    session.require_principal()?;
    let title = parse_title(&path)?;
    Ok(web::Json(state.movies.find_movie(&title).await?))
}

/// Add a movie with its poster and video.
#[utoipa::path(
    post,
    path = "/api/v1/movies",
    request_body = CreateMovieRequest,
    responses(
        (status = 201, description = "Movie created", body = Movie),
        (status = 400, description = "Invalid request or media", body = Error),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 409, description = "Title already exists", body = Error)
    ),
    tags = ["movies"],
    operation_id = "createMovie"
)]
#[post("/movies")]
pub async fn create_movie(
    state: web::Data<HttpState>,
    session: SessionContext,
    payload: web::Json<CreateMovieRequest>,
) -> ApiResult<HttpResponse> {
    let principal = session.require_admin()?;
    let request = payload.into_inner();
    let draft = MovieDraft::new(
        &request.title,
        &request.description,
        &request.genre,
        request.duration_seconds,
    )?;
    let poster = decode(request.poster.as_ref(), "poster")?;
    let video = decode(request.video.as_ref(), "video")?;
    let movie = state
        .movies
        .create_movie(&principal, draft, poster, video)
        .await?;
    Ok(HttpResponse::Created().json(movie))
}

/// Change a movie.
#[utoipa::path(
    patch,
    path = "/api/v1/movies/{title}",
    params(("title" = String, Path, description = "Movie title")),
    request_body = UpdateMovieRequest,
    responses(
        (status = 200, description = "Movie updated", body = Movie),
        (status = 400, description = "Invalid request or media", body = Error),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Not found", body = Error),
        (status = 409, description = "Title already exists", body = Error)
    ),
    tags = ["movies"],
    operation_id = "updateMovie"
)]
#[patch("/movies/{title}")]
pub async fn update_movie(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    payload: web::Json<UpdateMovieRequest>,
) -> ApiResult<web::Json<Movie>> {
    let principal = session.require_admin()?;
    let title = parse_title(&path)?;
    let request = payload.into_inner();
    let movie_patch = MoviePatch::new(
        request.title.as_deref(),
        request.description.as_deref(),
        request.genre.as_deref(),
        request.duration_seconds,
    )?;
    let poster = decode(request.poster.as_ref(), "poster")?;
    let video = decode(request.video.as_ref(), "video")?;
    let movie = state
        .movies
        .update_movie(&principal, &title, movie_patch, poster, video)
        .await?;
    Ok(web::Json(movie))
}

/// Remove a movie that has no showtimes.
#[utoipa::path(
    delete,
    path = "/api/v1/movies/{title}",
    params(("title" = String, Path, description = "Movie title")),
    responses(
        (status = 200, description = "Movie deleted", body = Movie),
        (status = 403, description = "Forbidden", body = Error),
        (status = 404, description = "Not found", body = Error),
        (status = 409, description = "Movie still has showtimes", body = Error)
    ),
    tags = ["movies"],
    operation_id = "deleteMovie"
)]
#[delete("/movies/{title}")]
pub async fn delete_movie(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
) -> ApiResult<web::Json<Movie>> {
    let principal = session.require_admin()?;
    let title = parse_title(&path)?;
    Ok(web::Json(state.movies.delete_movie(&principal, &title).await?))
}

/// Stream a movie's video, whole or by byte range.
#[utoipa::path(
    get,
    path = "/api/v1/movies/{title}/stream",
    params(
        ("title" = String, Path, description = "Movie title"),
        ("Range" = Option<String>, Header, description = "bytes=<start>-<end>")
    ),
    responses(
        (status = 200, description = "Whole video", content_type = "video/mp4"),
        (status = 206, description = "Requested byte range", content_type = "video/mp4"),
        (status = 401, description = "Unauthorised", body = Error),
        (status = 404, description = "Unknown movie or unsatisfiable range", body = Error)
    ),
    tags = ["movies"],
    operation_id = "streamMovie"
)]
#[get("/movies/{title}/stream")]
pub async fn stream_movie(
    state: web::Data<HttpState>,
    session: SessionContext,
    path: web::Path<String>,
    req: HttpRequest,
) -> ApiResult<HttpResponse> {
    session.require_principal()?;
    let title = parse_title(&path)?;
    let range_header = req
        .headers()
        .get(header::RANGE)
        .map(|value| {
            value
                .to_str()
                .map(str::to_owned)
                .map_err(|_| Error::not_found("invalid range"))
        })
        .transpose()?;
    let stream = state.movies.stream_movie(&title, range_header).await?;
    Ok(stream_response(stream))
}

fn stream_response(stream: MovieStream) -> HttpResponse {
    let length = stream.content_length();
    let mut builder = match stream.range {
        Some(range) => {
            let mut partial = HttpResponse::build(StatusCode::PARTIAL_CONTENT);
            partial.insert_header((header::CONTENT_RANGE, range.content_range(stream.size)));
            partial
        }
        None => HttpResponse::Ok(),
    };
    let body = stream.chunks.map(|chunk| {
        chunk.map(web::Bytes::from).map_err(|err| {
            error!(error = %err, "video stream failed mid-response");
            Error::internal("video stream interrupted")
        })
    });
    builder
        .insert_header((header::ACCEPT_RANGES, "bytes"))
        .content_type(STREAM_CONTENT_TYPE)
        .no_chunking(length)
        .streaming(body)
}

#[cfg(test)]
#[path = "movies_tests.rs"]
mod tests;
