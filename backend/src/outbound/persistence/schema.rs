//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the migrations under `backend/migrations`.
//! `diesel print-schema` regenerates them from a live database.

diesel::table! {
    /// Accounts with their credentials and role.
    users (id) {
        id -> Uuid,
        /// Lowercased, unique.
        email -> Varchar,
        username -> Nullable<Varchar>,
        password_hash -> Text,
        /// `CUSTOMER` or `ADMIN`.
        role -> Varchar,
        /// Identity issued by an external provider.
        external_id -> Nullable<Varchar>,
        refresh_credential -> Nullable<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Catalogue entries with media object references.
    movies (id) {
        id -> Uuid,
        title -> Varchar,
        description -> Text,
        genre -> Varchar,
        poster_url -> Text,
        poster_key -> Text,
        video_url -> Text,
        video_key -> Text,
        duration_seconds -> Int4,
        resolutions -> Array<Text>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Screenings; `capacity` counts unreserved seats.
    showtimes (id) {
        id -> Uuid,
        movie_id -> Uuid,
        start_time -> Timestamptz,
        end_time -> Timestamptz,
        location -> Varchar,
        capacity -> Int4,
        total_capacity -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Seat holds; unique per (user, showtime).
    reservations (id) {
        id -> Uuid,
        user_id -> Uuid,
        showtime_id -> Uuid,
        seats_reserved -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(showtimes -> movies (movie_id));
diesel::joinable!(reservations -> showtimes (showtime_id));
diesel::joinable!(reservations -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(movies, reservations, showtimes, users);
