//! Movie catalogue entities and uploaded media.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{Error, MovieId, Showtime};

const TITLE_MAX: usize = 200;
const GENRE_MAX: usize = 64;
const DESCRIPTION_MAX: usize = 4000;

/// Accepted content types for posters.
pub const POSTER_CONTENT_TYPES: [&str; 4] = ["image/jpeg", "image/jpg", "image/png", "image/x-png"];
/// Accepted content types for feature videos.
pub const VIDEO_CONTENT_TYPES: [&str; 2] = ["video/mp4", "video/mkv"];

/// Validation errors for catalogue input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MovieValidationError {
    #[error("title must not be empty")]
    EmptyTitle,
    #[error("title must be at most {max} characters")]
    TitleTooLong { max: usize },
    #[error("title must not contain '/'")]
    TitleContainsSlash,
    #[error("genre must not be empty")]
    EmptyGenre,
    #[error("genre must be at most {max} characters")]
    GenreTooLong { max: usize },
    #[error("description must be at most {max} characters")]
    DescriptionTooLong { max: usize },
    #[error("{kind} file is required")]
    MissingMedia { kind: MediaKind },
    #[error("{kind} file is empty")]
    EmptyMedia { kind: MediaKind },
    #[error("unsupported {kind} content type '{content_type}'")]
    UnsupportedContentType {
        kind: MediaKind,
        content_type: String,
    },
}

impl From<MovieValidationError> for Error {
    fn from(value: MovieValidationError) -> Self {
        Error::invalid_request(value.to_string())
    }
}

/// Unique movie title, also used as the public lookup key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(try_from = "String", into = "String")]
#[schema(value_type = String, example = "Metropolis")]
pub struct MovieTitle(String);

impl MovieTitle {
    /// Validate a title. Surrounding whitespace is removed.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, MovieValidationError> {
        let trimmed = raw.as_ref().trim();
        if trimmed.is_empty() {
            return Err(MovieValidationError::EmptyTitle);
        }
        if trimmed.chars().count() > TITLE_MAX {
            return Err(MovieValidationError::TitleTooLong { max: TITLE_MAX });
        }
        if trimmed.contains('/') {
            return Err(MovieValidationError::TitleContainsSlash);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Borrow the title.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for MovieTitle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MovieTitle {
    type Error = MovieValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<MovieTitle> for String {
    fn from(value: MovieTitle) -> Self {
        value.0
    }
}

/// Location of a stored media object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MediaRef {
    /// Public URL handed to clients.
    pub url: String,
    /// Store-specific key used for deletion and streaming.
    pub key: String,
}

/// Catalogue entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: MovieId,
    pub title: MovieTitle,
    pub description: String,
    pub genre: String,
    pub poster: MediaRef,
    pub video: MediaRef,
    /// Running time in seconds.
    pub duration_seconds: u32,
    pub resolutions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A movie with every showtime scheduled for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MovieWithShowtimes {
    #[serde(flatten)]
    pub movie: Movie,
    pub showtimes: Vec<Showtime>,
}

fn validate_genre(raw: &str) -> Result<String, MovieValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MovieValidationError::EmptyGenre);
    }
    if trimmed.chars().count() > GENRE_MAX {
        return Err(MovieValidationError::GenreTooLong { max: GENRE_MAX });
    }
    Ok(trimmed.to_owned())
}

fn validate_description(raw: &str) -> Result<String, MovieValidationError> {
    let trimmed = raw.trim();
    if trimmed.chars().count() > DESCRIPTION_MAX {
        return Err(MovieValidationError::DescriptionTooLong {
            max: DESCRIPTION_MAX,
        });
    }
    Ok(trimmed.to_owned())
}

/// Validated fields for a new movie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovieDraft {
    pub title: MovieTitle,
    pub description: String,
    pub genre: String,
    /// Running time declared by the uploader, in seconds.
    pub declared_duration: Option<u32>,
}

impl MovieDraft {
    /// Validate raw input.
    pub fn new(
        title: &str,
        description: &str,
        genre: &str,
        declared_duration: Option<u32>,
    ) -> Result<Self, MovieValidationError> {
        Ok(Self {
            title: MovieTitle::new(title)?,
            description: validate_description(description)?,
            genre: validate_genre(genre)?,
            declared_duration,
        })
    }
}

/// Partial update for a movie.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoviePatch {
    pub title: Option<MovieTitle>,
    pub description: Option<String>,
    pub genre: Option<String>,
    /// Running time passed to the probe; ignored unless a new video is sent.
    pub declared_duration: Option<u32>,
}

impl MoviePatch {
    /// Validate raw optional input.
    pub fn new(
        title: Option<&str>,
        description: Option<&str>,
        genre: Option<&str>,
        declared_duration: Option<u32>,
    ) -> Result<Self, MovieValidationError> {
        Ok(Self {
            title: title.map(MovieTitle::new).transpose()?,
            description: description.map(validate_description).transpose()?,
            genre: genre.map(validate_genre).transpose()?,
            declared_duration,
        })
    }
}

/// Which slot an uploaded file fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Poster,
    Video,
}

impl MediaKind {
    /// Destination folder in the media store.
    pub const fn folder(self) -> &'static str {
        match self {
            Self::Poster => "posters",
            Self::Video => "videos",
        }
    }

    const fn allowed_content_types(self) -> &'static [&'static str] {
        match self {
            Self::Poster => &POSTER_CONTENT_TYPES,
            Self::Video => &VIDEO_CONTENT_TYPES,
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Poster => f.write_str("poster"),
            Self::Video => f.write_str("video"),
        }
    }
}

/// Uploaded file contents.
#[derive(Clone, PartialEq, Eq)]
pub struct MediaAsset {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for MediaAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaAsset")
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

impl MediaAsset {
    /// Build an asset, normalising the content type.
    pub fn new(content_type: impl AsRef<str>, bytes: Vec<u8>) -> Self {
        Self {
            content_type: content_type.as_ref().trim().to_ascii_lowercase(),
            bytes,
        }
    }

    /// Check the asset is non-empty and of an accepted type for `kind`.
    pub fn validate(&self, kind: MediaKind) -> Result<(), MovieValidationError> {
        if self.bytes.is_empty() {
            return Err(MovieValidationError::EmptyMedia { kind });
        }
        if !kind
            .allowed_content_types()
            .contains(&self.content_type.as_str())
        {
            return Err(MovieValidationError::UnsupportedContentType {
                kind,
                content_type: self.content_type.clone(),
            });
        }
        Ok(())
    }
}

/// Validate an optional asset that must be present.
pub fn require_media(
    asset: Option<&MediaAsset>,
    kind: MediaKind,
) -> Result<&MediaAsset, MovieValidationError> {
    let asset = asset.ok_or(MovieValidationError::MissingMedia { kind })?;
    asset.validate(kind)?;
    Ok(asset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", MovieValidationError::EmptyTitle)]
    #[case("   ", MovieValidationError::EmptyTitle)]
    #[case("AC/DC Live", MovieValidationError::TitleContainsSlash)]
    fn title_rejects_bad_input(#[case] raw: &str, #[case] expected: MovieValidationError) {
        assert_eq!(MovieTitle::new(raw), Err(expected));
    }

    #[rstest]
    fn title_is_trimmed() {
        let title = MovieTitle::new("  Metropolis ").expect("valid title");
        assert_eq!(title.as_str(), "Metropolis");
    }

    #[rstest]
    #[case(MediaKind::Poster, "image/png")]
    #[case(MediaKind::Poster, "IMAGE/JPEG")]
    #[case(MediaKind::Video, "video/mp4")]
    #[case(MediaKind::Video, "video/mkv")]
    fn accepted_content_types(#[case] kind: MediaKind, #[case] content_type: &str) {
        let asset = MediaAsset::new(content_type, vec![1, 2, 3]);
        assert!(asset.validate(kind).is_ok());
    }

    #[rstest]
    #[case(MediaKind::Poster, "image/gif")]
    #[case(MediaKind::Video, "video/avi")]
    #[case(MediaKind::Video, "image/png")]
    fn rejected_content_types(#[case] kind: MediaKind, #[case] content_type: &str) {
        let asset = MediaAsset::new(content_type, vec![1]);
        let err = asset.validate(kind).expect_err("rejected");
        assert!(matches!(
            err,
            MovieValidationError::UnsupportedContentType { .. }
        ));
    }

    #[rstest]
    fn missing_media_is_reported_by_kind() {
        let err = require_media(None, MediaKind::Video).expect_err("missing");
        assert_eq!(err.to_string(), "video file is required");
    }

    #[rstest]
    fn empty_media_is_rejected() {
        let asset = MediaAsset::new("image/png", Vec::new());
        let err = require_media(Some(&asset), MediaKind::Poster).expect_err("empty");
        assert_eq!(err, MovieValidationError::EmptyMedia { kind: MediaKind::Poster });
    }

    #[rstest]
    fn media_folders_match_kind() {
        assert_eq!(MediaKind::Poster.folder(), "posters");
        assert_eq!(MediaKind::Video.folder(), "videos");
    }
}
