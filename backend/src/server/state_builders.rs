//! Builders for the driven adapters and the service-backed HTTP state.

use std::sync::Arc;

use mockable::DefaultClock;
use tracing::{info, warn};

use cinema::domain::ports::{
    CacheStore, DeclaredVideoProbe, MediaStore, MovieRepository, ReservationRepository,
    ShowtimeRepository, UserAccounts, UserRepository,
};
use cinema::domain::{
    CacheAside, CacheTtls, CatalogService, Email, Error, ErrorCode, IdentityService, NewUser,
    Password, ReservationService, Role, SchedulingService, UserLookup,
};
use cinema::inbound::http::state::{HttpState, HttpStatePorts};
use cinema::outbound::cache::{MemoryCacheStore, RedisCacheStore, RedisConfig};
use cinema::outbound::media::FilesystemMediaStore;
use cinema::outbound::memory::MemoryDatabase;
use cinema::outbound::password_hasher::Argon2PasswordHasher;
use cinema::outbound::persistence::{
    DbPool, DieselMovieRepository, DieselReservationRepository, DieselShowtimeRepository,
    DieselUserRepository, run_pending_migrations,
};

use super::StartupError;
use super::config::{AdminSeed, ServerSettings};

/// Storage behind the repository ports.
#[derive(Clone)]
pub enum Persistence {
    Postgres(DbPool),
    Memory(Arc<MemoryDatabase>),
}

/// Driven adapters shared by every service.
#[derive(Clone)]
pub struct Adapters {
    pub persistence: Persistence,
    pub cache: Arc<dyn CacheStore>,
    pub media: Arc<FilesystemMediaStore>,
    pub ttls: CacheTtls,
}

/// Migrate and connect to PostgreSQL, or fall back to in-memory tables.
pub async fn build_persistence(settings: &ServerSettings) -> Result<Persistence, StartupError> {
    let Some(config) = settings.pool_config() else {
        warn!("no database_url configured; using in-memory repositories");
        return Ok(Persistence::Memory(Arc::new(MemoryDatabase::new(
            Arc::new(DefaultClock),
        ))));
    };
    run_pending_migrations(config.database_url()).await?;
    let pool = DbPool::new(config).await?;
    info!("database pool ready");
    Ok(Persistence::Postgres(pool))
}

/// Connect to Redis, or fall back to an in-process cache.
pub async fn build_cache(settings: &ServerSettings) -> Result<Arc<dyn CacheStore>, StartupError> {
    match settings.redis_url() {
        Some(url) => {
            let store = RedisCacheStore::connect(RedisConfig::new(url)).await?;
            info!("redis cache ready");
            Ok(Arc::new(store))
        }
        None => {
            warn!("no redis_url configured; caching in process");
            Ok(Arc::new(MemoryCacheStore::new(Arc::new(DefaultClock))))
        }
    }
}

/// Open the media directory named in `settings`.
pub fn build_media(settings: &ServerSettings) -> Result<Arc<FilesystemMediaStore>, StartupError> {
    let store = FilesystemMediaStore::open(settings.media_root(), settings.media_base_url())?;
    Ok(Arc::new(store))
}

fn wire_ports<U, M, T, R, S>(
    repos: (Arc<U>, Arc<M>, Arc<T>, Arc<R>),
    media: Arc<S>,
    cache: Arc<dyn CacheStore>,
    ttls: &CacheTtls,
) -> HttpStatePorts
where
    U: UserRepository + 'static,
    M: MovieRepository + 'static,
    T: ShowtimeRepository + 'static,
    R: ReservationRepository + 'static,
    S: MediaStore + 'static,
{
    let (users, movies, showtimes, reservations) = repos;
    let aside = CacheAside::new(cache);
    HttpStatePorts {
        users: Arc::new(IdentityService::new(
            users,
            Arc::new(Argon2PasswordHasher::default()),
            aside.clone(),
            ttls,
        )),
        movies: Arc::new(CatalogService::new(
            movies.clone(),
            media,
            Arc::new(DeclaredVideoProbe),
            aside.clone(),
            ttls,
        )),
        showtimes: Arc::new(SchedulingService::new(
            movies.clone(),
            showtimes.clone(),
            aside.clone(),
            ttls,
        )),
        reservations: Arc::new(ReservationService::new(
            movies,
            showtimes,
            reservations,
            aside,
            ttls,
        )),
    }
}

/// Build the HTTP state over the chosen adapters.
pub fn build_http_state(adapters: &Adapters) -> HttpState {
    let Adapters {
        persistence,
        cache,
        media,
        ttls,
    } = adapters;
    let ports = match persistence {
        Persistence::Postgres(pool) => wire_ports(
            (
                Arc::new(DieselUserRepository::new(pool.clone())),
                Arc::new(DieselMovieRepository::new(pool.clone())),
                Arc::new(DieselShowtimeRepository::new(pool.clone())),
                Arc::new(DieselReservationRepository::new(pool.clone())),
            ),
            media.clone(),
            cache.clone(),
            ttls,
        ),
        Persistence::Memory(db) => wire_ports(
            (db.clone(), db.clone(), db.clone(), db.clone()),
            media.clone(),
            cache.clone(),
            ttls,
        ),
    };
    HttpState::new(ports)
}

/// Create the configured administrator unless the email is already taken.
pub async fn seed_admin(users: &dyn UserAccounts, seed: &AdminSeed) -> Result<(), StartupError> {
    let email = Email::new(&seed.email).map_err(Error::from)?;
    match users.find_user(&UserLookup::ByEmail(email.clone())).await {
        Ok(existing) => {
            if existing.role != Role::Admin {
                warn!(user_id = %existing.id, "admin seed email belongs to a customer account");
            }
            return Ok(());
        }
        Err(err) if err.code() == ErrorCode::NotFound => {}
        Err(err) => return Err(err.into()),
    }
    let admin = users
        .create_user(
            NewUser {
                email,
                password: Password::new(seed.password.clone()).map_err(Error::from)?,
                username: None,
            },
            Role::Admin,
        )
        .await?;
    info!(user_id = %admin.id, "seeded administrator account");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use cinema::domain::Principal;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Harness {
        state: HttpState,
        _media_dir: TempDir,
    }

    #[fixture]
    fn harness() -> Harness {
        let media_dir = TempDir::new().expect("temp dir");
        let media = FilesystemMediaStore::open(media_dir.path(), "/media").expect("media store");
        let adapters = Adapters {
            persistence: Persistence::Memory(Arc::new(MemoryDatabase::new(Arc::new(
                DefaultClock,
            )))),
            cache: Arc::new(MemoryCacheStore::new(Arc::new(DefaultClock))),
            media: Arc::new(media),
            ttls: CacheTtls::default(),
        };
        Harness {
            state: build_http_state(&adapters),
            _media_dir: media_dir,
        }
    }

    fn seed() -> AdminSeed {
        AdminSeed {
            email: "root@cinema.test".to_owned(),
            password: "correct horse battery".to_owned(),
        }
    }

    #[rstest]
    #[tokio::test]
    async fn memory_state_serves_accounts(harness: Harness) {
        let users = harness.state.users.clone();
        seed_admin(users.as_ref(), &seed()).await.expect("seeded");

        let admin = users
            .verify_credentials(
                &Email::new("root@cinema.test").expect("email"),
                &Password::candidate("correct horse battery"),
            )
            .await
            .expect("admin can sign in");
        assert_eq!(admin.role, Role::Admin);

        let listed = users
            .list_users(&Principal::new(admin.id, admin.role))
            .await
            .expect("admin lists users");
        assert_eq!(listed.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn seeding_twice_keeps_one_account(harness: Harness) {
        let users = harness.state.users.clone();
        seed_admin(users.as_ref(), &seed()).await.expect("first seed");
        seed_admin(users.as_ref(), &seed()).await.expect("second seed");

        let admin = users
            .find_user(&UserLookup::ByEmail(
                Email::new("root@cinema.test").expect("email"),
            ))
            .await
            .expect("admin exists");
        let listed = users
            .list_users(&Principal::new(admin.id, Role::Admin))
            .await
            .expect("list");
        assert_eq!(listed.len(), 1);
    }

    #[rstest]
    #[tokio::test]
    async fn weak_seed_password_is_rejected(harness: Harness) {
        let weak = AdminSeed {
            password: "x".to_owned(),
            ..seed()
        };
        assert!(matches!(
            seed_admin(harness.state.users.as_ref(), &weak).await,
            Err(StartupError::Domain(_))
        ));
    }
}
