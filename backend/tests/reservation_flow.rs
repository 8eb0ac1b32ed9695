//! End-to-end reservation flows over the real services, in-memory
//! repositories, and the in-process cache.

use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use cinema::domain::ports::{
    CacheKey, CacheStore, DeclaredVideoProbe, MovieCatalog, MovieRepository, SeatReservations,
    ShowtimeScheduling, UserAccounts,
};
use cinema::domain::{
    CacheAside, CacheTtls, CatalogService, Email, ErrorCode, IdentityService, MediaAsset,
    MovieDraft, MovieTitle, NewShowtime, NewUser, Password, Principal, ReservationOutcome,
    ReservationService, Role, SchedulingService, ShowtimePatch,
};
use cinema::outbound::cache::MemoryCacheStore;
use cinema::outbound::media::FilesystemMediaStore;
use cinema::outbound::memory::MemoryDatabase;
use cinema::outbound::password_hasher::Argon2PasswordHasher;
use futures::future::join_all;
use mockable::DefaultClock;
use rstest::{fixture, rstest};
use tempfile::TempDir;

struct World {
    db: Arc<MemoryDatabase>,
    cache: Arc<MemoryCacheStore>,
    users: IdentityService<MemoryDatabase, Argon2PasswordHasher>,
    catalog: CatalogService<MemoryDatabase, FilesystemMediaStore, DeclaredVideoProbe>,
    scheduling: SchedulingService<MemoryDatabase, MemoryDatabase>,
    reservations: ReservationService<MemoryDatabase, MemoryDatabase, MemoryDatabase>,
    _media_dir: TempDir,
}

#[fixture]
fn world() -> World {
    let media_dir = TempDir::new().expect("temp dir");
    let media = Arc::new(FilesystemMediaStore::open(media_dir.path(), "/media").expect("media"));
    let db = Arc::new(MemoryDatabase::new(Arc::new(DefaultClock)));
    let cache = Arc::new(MemoryCacheStore::new(Arc::new(DefaultClock)));
    let aside = CacheAside::new(cache.clone());
    let ttls = CacheTtls::default();
    World {
        users: IdentityService::new(
            db.clone(),
            Arc::new(Argon2PasswordHasher::with_cost(64, 1).expect("argon2 cost")),
            aside.clone(),
            &ttls,
        ),
        catalog: CatalogService::new(
            db.clone(),
            media,
            Arc::new(DeclaredVideoProbe),
            aside.clone(),
            &ttls,
        ),
        scheduling: SchedulingService::new(db.clone(), db.clone(), aside.clone(), &ttls),
        reservations: ReservationService::new(db.clone(), db.clone(), db.clone(), aside, &ttls),
        db,
        cache,
        _media_dir: media_dir,
    }
}

fn title(raw: &str) -> MovieTitle {
    MovieTitle::new(raw).expect("valid title")
}

fn opening_night() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 20, 0, 0)
        .single()
        .expect("valid instant")
}

fn signup(email: &str) -> NewUser {
    NewUser {
        email: Email::new(email).expect("email"),
        password: Password::new("popcorn-and-soda").expect("password"),
        username: None,
    }
}

impl World {
    async fn account(&self, email: &str, role: Role) -> Principal {
        let user = self
            .users
            .create_user(signup(email), role)
            .await
            .expect("account created");
        Principal::new(user.id, user.role)
    }

    async fn movie(&self, admin: &Principal, raw_title: &str) -> Result<(), cinema::domain::Error> {
        self.catalog
            .create_movie(
                admin,
                MovieDraft::new(raw_title, "A dream within a dream", "Science fiction", Some(8880))
                    .expect("draft"),
                Some(MediaAsset::new("image/png", b"poster".to_vec())),
                Some(MediaAsset::new("video/mp4", b"feature".to_vec())),
            )
            .await
            .map(|_| ())
    }

    async fn screening(&self, admin: &Principal, raw_title: &str, capacity: i64) {
        self.screening_at(admin, raw_title, capacity, opening_night())
            .await;
    }

    async fn screening_at(
        &self,
        admin: &Principal,
        raw_title: &str,
        capacity: i64,
        start: DateTime<Utc>,
    ) {
        self.scheduling
            .create_showtime(
                admin,
                &title(raw_title),
                NewShowtime::new(start, start + Duration::hours(3), "Screen 1", capacity)
                    .expect("showtime"),
            )
            .await
            .expect("showtime created");
    }

    async fn capacity(&self, raw_title: &str) -> u32 {
        self.scheduling
            .find_showtime(&title(raw_title))
            .await
            .expect("showtime")
            .showtime
            .capacity
    }

    async fn admin_with_screening(&self, capacity: i64) -> Principal {
        let admin = self.account("admin@cinema.test", Role::Admin).await;
        self.movie(&admin, "Inception").await.expect("movie created");
        self.screening(&admin, "Inception", capacity).await;
        admin
    }
}

#[rstest]
#[tokio::test]
async fn sold_out_showtime_rejects_further_seats(world: World) {
    world.admin_with_screening(50).await;
    let first = world.account("first@cinema.test", Role::Customer).await;
    let second = world.account("second@cinema.test", Role::Customer).await;

    let outcome = world
        .reservations
        .create_reservation(&first, &title("Inception"), 50)
        .await
        .expect("reservation");
    assert!(matches!(outcome, ReservationOutcome::Confirmed(_)));
    assert_eq!(world.capacity("Inception").await, 0);

    let outcome = world
        .reservations
        .create_reservation(&second, &title("Inception"), 1)
        .await
        .expect("outcome");
    assert_eq!(
        outcome,
        ReservationOutcome::InsufficientCapacity {
            requested: 1,
            available: 0
        }
    );
    assert_eq!(world.capacity("Inception").await, 0);
}

#[rstest]
#[tokio::test]
async fn resizing_and_cancelling_conserve_capacity(world: World) {
    world.admin_with_screening(50).await;
    let customer = world.account("ada@cinema.test", Role::Customer).await;
    let inception = title("Inception");

    world
        .reservations
        .create_reservation(&customer, &inception, 10)
        .await
        .expect("reserved");
    assert_eq!(world.capacity("Inception").await, 40);

    world
        .reservations
        .update_reservation(&customer, &inception, 5)
        .await
        .expect("shrunk");
    assert_eq!(world.capacity("Inception").await, 45);

    world
        .reservations
        .update_reservation(&customer, &inception, 20)
        .await
        .expect("grown");
    assert_eq!(world.capacity("Inception").await, 30);

    let mine = world
        .reservations
        .find_my_reservations(&customer)
        .await
        .expect("listing");
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].reservation.seats_reserved, 20);

    let cancelled = world
        .reservations
        .cancel_reservation(&customer, &inception)
        .await
        .expect("cancelled");
    assert_eq!(cancelled.seats_reserved, 20);
    assert_eq!(world.capacity("Inception").await, 50);
    assert!(
        world
            .reservations
            .find_my_reservations(&customer)
            .await
            .expect("listing")
            .is_empty()
    );
}

#[rstest]
#[tokio::test]
async fn duplicate_titles_conflict_without_new_rows(world: World) {
    let admin = world.account("admin@cinema.test", Role::Admin).await;
    world.movie(&admin, "Inception").await.expect("first movie");

    let err = world
        .movie(&admin, "Inception")
        .await
        .expect_err("duplicate title");
    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(
        world.db.list_with_showtimes().await.expect("rows").len(),
        1
    );
}

#[rstest]
#[tokio::test]
async fn missing_movies_are_not_cached(world: World) {
    let missing = title("NoSuchTitle");

    let err = world
        .catalog
        .find_movie(&missing)
        .await
        .expect_err("not found");
    assert_eq!(err.code(), ErrorCode::NotFound);
    assert_eq!(
        world
            .cache
            .get(&CacheKey::Movie(missing))
            .await
            .expect("cache read"),
        None
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_bookings_never_oversell(world: World) {
    world.admin_with_screening(50).await;
    let mut customers = Vec::new();
    for n in 0..20 {
        customers.push(
            world
                .account(&format!("fan{n}@cinema.test"), Role::Customer)
                .await,
        );
    }
    let inception = title("Inception");

    let outcomes = join_all(customers.iter().map(|customer| {
        world
            .reservations
            .create_reservation(customer, &inception, 5)
    }))
    .await;

    let confirmed = outcomes
        .into_iter()
        .map(|outcome| outcome.expect("no errors"))
        .filter(|outcome| matches!(outcome, ReservationOutcome::Confirmed(_)))
        .count();
    assert_eq!(confirmed, 10);
    assert_eq!(world.capacity("Inception").await, 0);
}

#[rstest]
#[tokio::test]
async fn cancelling_a_showtime_releases_every_reservation(world: World) {
    let admin = world.admin_with_screening(10).await;
    let customer = world.account("ada@cinema.test", Role::Customer).await;
    world
        .reservations
        .create_reservation(&customer, &title("Inception"), 4)
        .await
        .expect("reserved");
    assert_eq!(
        world
            .reservations
            .find_my_reservations(&customer)
            .await
            .expect("listing")
            .len(),
        1
    );

    world
        .scheduling
        .delete_showtime(&admin, &title("Inception"), None)
        .await
        .expect("showtime deleted");

    assert!(
        world
            .reservations
            .find_my_reservations(&customer)
            .await
            .expect("listing")
            .is_empty()
    );
    assert!(
        world
            .reservations
            .list_all_reservations(&admin)
            .await
            .expect("admin listing")
            .is_empty()
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_signups_with_one_email_admit_exactly_one(world: World) {
    let admin = world.account("admin@cinema.test", Role::Admin).await;

    let results = join_all((0..4).map(|_| {
        world
            .users
            .create_user(signup("twin@cinema.test"), Role::Customer)
    }))
    .await;

    let created = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(created, 1);
    for err in results.into_iter().filter_map(Result::err) {
        assert_eq!(err.code(), ErrorCode::Conflict);
    }
    let accounts = world.users.list_users(&admin).await.expect("listing");
    let twins = accounts
        .iter()
        .filter(|user| user.email.as_str() == "twin@cinema.test")
        .count();
    assert_eq!(twins, 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_movie_creation_with_one_title_admits_exactly_one(world: World) {
    let admin = world.account("admin@cinema.test", Role::Admin).await;

    let results = join_all((0..4).map(|_| world.movie(&admin, "Inception"))).await;

    let created = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(created, 1);
    for err in results.into_iter().filter_map(Result::err) {
        assert_eq!(err.code(), ErrorCode::Conflict);
    }
    assert_eq!(
        world.db.list_with_showtimes().await.expect("rows").len(),
        1
    );
}

#[rstest]
#[tokio::test]
async fn cached_reservation_lists_follow_showtime_changes(world: World) {
    let admin = world.admin_with_screening(10).await;
    let customer = world.account("ada@cinema.test", Role::Customer).await;
    world
        .reservations
        .create_reservation(&customer, &title("Inception"), 2)
        .await
        .expect("reserved");
    let mine = world
        .reservations
        .find_my_reservations(&customer)
        .await
        .expect("listing");
    assert_eq!(mine[0].showtime.location.as_str(), "Screen 1");
    world
        .reservations
        .list_all_reservations(&admin)
        .await
        .expect("admin listing");

    let patch = ShowtimePatch::new(None, None, None, Some("Screen 7"), None).expect("patch");
    world
        .scheduling
        .update_showtime(&admin, &title("Inception"), patch)
        .await
        .expect("moved");

    let mine = world
        .reservations
        .find_my_reservations(&customer)
        .await
        .expect("listing");
    let all = world
        .reservations
        .list_all_reservations(&admin)
        .await
        .expect("admin listing");
    assert_eq!(mine[0].showtime.location.as_str(), "Screen 7");
    assert_eq!(all[0].showtime.location.as_str(), "Screen 7");
}

#[rstest]
#[tokio::test]
async fn cached_reservation_lists_follow_other_bookings(world: World) {
    world.admin_with_screening(10).await;
    let ada = world.account("ada@cinema.test", Role::Customer).await;
    let bob = world.account("bob@cinema.test", Role::Customer).await;
    world
        .reservations
        .create_reservation(&ada, &title("Inception"), 2)
        .await
        .expect("ada reserved");
    let before = world
        .reservations
        .find_my_reservations(&ada)
        .await
        .expect("listing");
    assert_eq!(before[0].showtime.capacity, 8);

    world
        .reservations
        .create_reservation(&bob, &title("Inception"), 3)
        .await
        .expect("bob reserved");

    let after = world
        .reservations
        .find_my_reservations(&ada)
        .await
        .expect("listing");
    assert_eq!(after[0].showtime.capacity, 5);
}

#[rstest]
#[tokio::test]
async fn reservations_survive_an_earlier_screening_being_added(world: World) {
    let admin = world.admin_with_screening(10).await;
    let customer = world.account("ada@cinema.test", Role::Customer).await;
    let inception = title("Inception");
    world
        .reservations
        .create_reservation(&customer, &inception, 4)
        .await
        .expect("reserved");
    world
        .screening_at(&admin, "Inception", 30, opening_night() - Duration::days(1))
        .await;

    let outcome = world
        .reservations
        .update_reservation(&customer, &inception, 6)
        .await
        .expect("resized");
    assert_eq!(outcome.confirmed().map(|r| r.seats_reserved), Some(6));

    let cancelled = world
        .reservations
        .cancel_reservation(&customer, &inception)
        .await
        .expect("cancelled");
    assert_eq!(cancelled.seats_reserved, 6);

    let capacities: Vec<u32> = world
        .scheduling
        .list_showtimes()
        .await
        .expect("listing")
        .into_iter()
        .map(|entry| entry.showtime.capacity)
        .collect();
    assert_eq!(capacities, vec![30, 10]);
}
