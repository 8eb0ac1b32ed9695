//! UUID-backed identifiers for the aggregate roots.

use thiserror::Error;
use uuid::Uuid;

/// Error returned when an identifier string is not a UUID.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} must be a valid UUID")]
pub struct InvalidId {
    kind: &'static str,
}

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord,
            serde::Serialize, serde::Deserialize, utoipa::ToSchema,
        )]
        #[serde(transparent)]
        #[schema(value_type = String, format = Uuid)]
        pub struct $name(Uuid);

        impl $name {
            /// Parse an identifier from its hyphenated string form.
            pub fn new(id: impl AsRef<str>) -> Result<Self, InvalidId> {
                let raw = id.as_ref();
                if raw.trim() != raw {
                    return Err(InvalidId { kind: $kind });
                }
                Uuid::parse_str(raw)
                    .map(Self)
                    .map_err(|_| InvalidId { kind: $kind })
            }

            /// Generate a new random identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Wrap an existing UUID.
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Access the underlying UUID.
            pub const fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidId;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::new(s)
            }
        }
    };
}

define_id!(
    /// Stable user identifier.
    UserId,
    "user id"
);
define_id!(
    /// Stable movie identifier.
    MovieId,
    "movie id"
);
define_id!(
    /// Stable showtime identifier.
    ShowtimeId,
    "showtime id"
);
define_id!(
    /// Stable reservation identifier.
    ReservationId,
    "reservation id"
);
