//! `MovieRepository` and `ShowtimeRepository` over the in-memory tables.

use async_trait::async_trait;

use crate::domain::ports::{
    DeletedShowtime, MovieChanges, MoviePersistenceError, MovieRepository, NewMovieRecord,
    ShowtimeChanges, ShowtimePersistenceError, ShowtimeRepository,
};
use crate::domain::{
    Movie, MovieId, MovieTitle, MovieWithShowtimes, NewShowtime, Showtime, ShowtimeId,
    ShowtimeWithMovie, UserId,
};

use super::{MemoryDatabase, Tables};

fn with_showtimes(tables: &Tables, movie: &Movie) -> MovieWithShowtimes {
    MovieWithShowtimes {
        movie: movie.clone(),
        showtimes: tables.showtimes_of(&movie.id),
    }
}

#[async_trait]
impl MovieRepository for MemoryDatabase {
    async fn insert(&self, record: &NewMovieRecord) -> Result<Movie, MoviePersistenceError> {
        let now = self.now();
        let mut tables = self.tables();
        if tables.movie_title_taken(record.title.as_str(), None) {
            return Err(MoviePersistenceError::duplicate_title(record.title.as_str()));
        }
        let movie = Movie {
            id: MovieId::random(),
            title: record.title.clone(),
            description: record.description.clone(),
            genre: record.genre.clone(),
            poster: record.poster.clone(),
            video: record.video.clone(),
            duration_seconds: record.duration_seconds,
            resolutions: record.resolutions.clone(),
            created_at: now,
            updated_at: now,
        };
        tables.movies.insert(movie.id, movie.clone());
        Ok(movie)
    }

    async fn find_by_title(
        &self,
        title: &MovieTitle,
    ) -> Result<Option<Movie>, MoviePersistenceError> {
        Ok(self
            .tables()
            .movies
            .values()
            .find(|movie| &movie.title == title)
            .cloned())
    }

    async fn find_with_showtimes(
        &self,
        title: &MovieTitle,
    ) -> Result<Option<MovieWithShowtimes>, MoviePersistenceError> {
        let tables = self.tables();
        Ok(tables
            .movies
            .values()
            .find(|movie| &movie.title == title)
            .map(|movie| with_showtimes(&tables, movie)))
    }

    async fn list_with_showtimes(&self) -> Result<Vec<MovieWithShowtimes>, MoviePersistenceError> {
        let tables = self.tables();
        let mut movies: Vec<MovieWithShowtimes> = tables
            .movies
            .values()
            .map(|movie| with_showtimes(&tables, movie))
            .collect();
        movies.sort_by(|a, b| a.movie.title.as_str().cmp(b.movie.title.as_str()));
        Ok(movies)
    }

    async fn update(
        &self,
        id: &MovieId,
        changes: &MovieChanges,
    ) -> Result<Option<Movie>, MoviePersistenceError> {
        let now = self.now();
        let mut tables = self.tables();
        if let Some(title) = &changes.title {
            if tables.movie_title_taken(title.as_str(), Some(*id)) {
                return Err(MoviePersistenceError::duplicate_title(title.as_str()));
            }
        }
        let Some(movie) = tables.movies.get_mut(id) else {
            return Ok(None);
        };
        if let Some(title) = &changes.title {
            movie.title = title.clone();
        }
        if let Some(description) = &changes.description {
            movie.description = description.clone();
        }
        if let Some(genre) = &changes.genre {
            movie.genre = genre.clone();
        }
        if let Some(poster) = &changes.poster {
            movie.poster = poster.clone();
        }
        if let Some(video) = &changes.video {
            movie.video = video.clone();
        }
        if let Some(duration) = changes.duration_seconds {
            movie.duration_seconds = duration;
        }
        if let Some(resolutions) = &changes.resolutions {
            movie.resolutions = resolutions.clone();
        }
        movie.updated_at = now;
        Ok(Some(movie.clone()))
    }

    async fn delete(&self, id: &MovieId) -> Result<Option<Movie>, MoviePersistenceError> {
        let mut tables = self.tables();
        let Some(movie) = tables.movies.get(id) else {
            return Ok(None);
        };
        if tables.showtimes.values().any(|showtime| &showtime.movie_id == id) {
            return Err(MoviePersistenceError::has_showtimes(movie.title.as_str()));
        }
        Ok(tables.movies.remove(id))
    }

    async fn reservation_holders(&self, id: &MovieId) -> Result<Vec<UserId>, MoviePersistenceError> {
        Ok(self.tables().holders_of(id))
    }
}

#[async_trait]
impl ShowtimeRepository for MemoryDatabase {
    async fn insert(
        &self,
        movie_id: &MovieId,
        showtime: &NewShowtime,
    ) -> Result<Showtime, ShowtimePersistenceError> {
        let now = self.now();
        let mut tables = self.tables();
        if !tables.movies.contains_key(movie_id) {
            return Err(ShowtimePersistenceError::query("movie no longer exists"));
        }
        let created = Showtime {
            id: ShowtimeId::random(),
            movie_id: *movie_id,
            start_time: showtime.start_time,
            end_time: showtime.end_time,
            location: showtime.location.clone(),
            capacity: showtime.capacity,
            total_capacity: showtime.capacity,
            created_at: now,
            updated_at: now,
        };
        tables.showtimes.insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_for_movie(
        &self,
        movie_id: &MovieId,
    ) -> Result<Vec<Showtime>, ShowtimePersistenceError> {
        Ok(self.tables().showtimes_of(movie_id))
    }

    async fn list_with_movies(&self) -> Result<Vec<ShowtimeWithMovie>, ShowtimePersistenceError> {
        let tables = self.tables();
        let mut listed: Vec<ShowtimeWithMovie> = tables
            .showtimes
            .values()
            .filter_map(|showtime| {
                tables.movies.get(&showtime.movie_id).map(|movie| ShowtimeWithMovie {
                    showtime: showtime.clone(),
                    movie: movie.clone(),
                })
            })
            .collect();
        listed.sort_by(|a, b| {
            a.showtime
                .start_time
                .cmp(&b.showtime.start_time)
                .then(a.showtime.id.cmp(&b.showtime.id))
        });
        Ok(listed)
    }

    async fn update(
        &self,
        id: &ShowtimeId,
        changes: &ShowtimeChanges,
    ) -> Result<Option<Showtime>, ShowtimePersistenceError> {
        let now = self.now();
        let mut tables = self.tables();
        let Some(showtime) = tables.showtimes.get_mut(id) else {
            return Ok(None);
        };
        if let Some(total) = changes.total_capacity {
            let reserved = showtime.reserved_seats();
            if total < reserved {
                return Err(ShowtimePersistenceError::capacity_below_reserved(reserved));
            }
            showtime.total_capacity = total;
            showtime.capacity = total - reserved;
        }
        if let Some(start) = changes.start_time {
            showtime.start_time = start;
        }
        if let Some(end) = changes.end_time {
            showtime.end_time = end;
        }
        if let Some(location) = &changes.location {
            showtime.location = location.clone();
        }
        showtime.updated_at = now;
        Ok(Some(showtime.clone()))
    }

    async fn delete(
        &self,
        id: &ShowtimeId,
    ) -> Result<Option<DeletedShowtime>, ShowtimePersistenceError> {
        let mut tables = self.tables();
        let Some(showtime) = tables.showtimes.remove(id) else {
            return Ok(None);
        };
        let mut affected_users: Vec<UserId> = Vec::new();
        tables.reservations.retain(|_, reservation| {
            if &reservation.showtime_id == id {
                affected_users.push(reservation.user_id);
                return false;
            }
            true
        });
        affected_users.sort();
        affected_users.dedup();
        Ok(Some(DeletedShowtime {
            showtime,
            affected_users,
        }))
    }
}
