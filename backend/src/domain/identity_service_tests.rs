//! Tests for the identity service.

use std::sync::Arc;

use rstest::rstest;

use super::*;
use crate::domain::ports::{DeletedUser, MockPasswordHasher, MockUserRepository};
use crate::domain::service_test_support::{RecordingCache, sample_user, title};
use crate::domain::{ErrorCode, StoredCredentials};

type Service = IdentityService<MockUserRepository, MockPasswordHasher>;

fn hasher() -> MockPasswordHasher {
    let mut hasher = MockPasswordHasher::new();
    hasher
        .expect_hash()
        .returning(|_| Ok(PasswordHash::new("salt$hash")));
    hasher
        .expect_verify()
        .returning(|password, _| password.expose() == "correct horse");
    hasher
}

fn make_service(repo: MockUserRepository, cache: &Arc<RecordingCache>) -> Service {
    IdentityService::new(
        Arc::new(repo),
        Arc::new(hasher()),
        cache.aside(),
        &CacheTtls::default(),
    )
}

fn signup(email: &str) -> NewUser {
    NewUser {
        email: Email::new(email).expect("valid email"),
        password: Password::new("correct horse").expect("valid password"),
        username: None,
    }
}

#[tokio::test]
async fn create_user_rejects_taken_email_without_inserting() {
    let existing = sample_user("ada@example.com", Role::Customer);
    let mut repo = MockUserRepository::new();
    repo.expect_find()
        .times(1)
        .return_once(move |_| Ok(Some(existing)));
    repo.expect_insert().never();
    let cache = RecordingCache::shared();

    let err = make_service(repo, &cache)
        .create_user(signup("ada@example.com"), Role::Customer)
        .await
        .expect_err("duplicate email");

    assert_eq!(err.code(), ErrorCode::Conflict);
}

#[tokio::test]
async fn create_user_stores_hash_and_invalidates_list() {
    let mut repo = MockUserRepository::new();
    repo.expect_find().times(1).return_once(|_| Ok(None));
    repo.expect_insert()
        .withf(|record| record.password_hash.as_str() == "salt$hash" && record.role == Role::Customer)
        .times(1)
        .return_once(|record| {
            let mut user = sample_user(record.email.as_str(), record.role);
            user.id = record.id;
            Ok(user)
        });
    let cache = RecordingCache::shared();
    cache.seed(&CacheKey::AllUsers, "[]");

    let user = make_service(repo, &cache)
        .create_user(signup("grace@example.com"), Role::Customer)
        .await
        .expect("user created");

    assert_eq!(user.email.as_str(), "grace@example.com");
    assert!(!cache.contains(&CacheKey::AllUsers));
}

#[tokio::test]
async fn create_user_maps_racing_duplicate_to_conflict() {
    let mut repo = MockUserRepository::new();
    repo.expect_find().times(1).return_once(|_| Ok(None));
    repo.expect_insert()
        .times(1)
        .return_once(|_| Err(UserPersistenceError::duplicate("email")));
    let cache = RecordingCache::shared();

    let err = make_service(repo, &cache)
        .create_user(signup("ada@example.com"), Role::Customer)
        .await
        .expect_err("duplicate");

    assert_eq!(err.code(), ErrorCode::Conflict);
    assert_eq!(err.message(), "user with this email already exists");
}

#[tokio::test]
async fn find_user_reads_through_and_caches() {
    let user = sample_user("ada@example.com", Role::Customer);
    let lookup = UserLookup::ById(user.id);
    let returned = user.clone();
    let mut repo = MockUserRepository::new();
    repo.expect_find()
        .times(1)
        .return_once(move |_| Ok(Some(returned)));
    let cache = RecordingCache::shared();
    let service = make_service(repo, &cache);

    let first = service.find_user(&lookup).await.expect("found");
    let second = service.find_user(&lookup).await.expect("cached");

    assert_eq!(first, user);
    assert_eq!(second, user);
    assert!(cache.contains(&CacheKey::User(lookup)));
}

#[tokio::test]
async fn find_user_does_not_cache_misses() {
    let mut repo = MockUserRepository::new();
    repo.expect_find().times(2).returning(|_| Ok(None));
    let cache = RecordingCache::shared();
    let service = make_service(repo, &cache);
    let lookup = UserLookup::ByEmail(Email::new("nobody@example.com").expect("valid"));

    for _ in 0..2 {
        let err = service.find_user(&lookup).await.expect_err("missing");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }
    assert!(!cache.contains(&CacheKey::User(lookup)));
}

#[rstest]
#[case(UserPersistenceError::connection("refused"), ErrorCode::ServiceUnavailable)]
#[case(UserPersistenceError::query("syntax"), ErrorCode::InternalError)]
#[tokio::test]
async fn repository_failures_are_not_reported_as_missing(
    #[case] failure: UserPersistenceError,
    #[case] expected: ErrorCode,
) {
    let mut repo = MockUserRepository::new();
    repo.expect_find().times(1).return_once(move |_| Err(failure));
    let cache = RecordingCache::shared();

    let err = make_service(repo, &cache)
        .find_user(&UserLookup::ById(UserId::random()))
        .await
        .expect_err("failure surfaces");

    assert_eq!(err.code(), expected);
}

#[rstest]
#[case("correct horse", true)]
#[case("wrong horse", false)]
#[tokio::test]
async fn verify_credentials_checks_the_hash(#[case] candidate: &str, #[case] accepted: bool) {
    let user = sample_user("ada@example.com", Role::Customer);
    let mut repo = MockUserRepository::new();
    repo.expect_find_credentials().times(1).return_once(move |_| {
        Ok(Some(StoredCredentials {
            user,
            password_hash: PasswordHash::new("salt$hash"),
        }))
    });
    let cache = RecordingCache::shared();

    let result = make_service(repo, &cache)
        .verify_credentials(
            &Email::new("ada@example.com").expect("valid"),
            &Password::candidate(candidate),
        )
        .await;

    match result {
        Ok(_) => assert!(accepted),
        Err(err) => {
            assert!(!accepted);
            assert_eq!(err.code(), ErrorCode::Unauthorized);
        }
    }
}

#[tokio::test]
async fn verify_credentials_hides_unknown_emails() {
    let mut repo = MockUserRepository::new();
    repo.expect_find_credentials()
        .times(1)
        .return_once(|_| Ok(None));
    let cache = RecordingCache::shared();

    let err = make_service(repo, &cache)
        .verify_credentials(
            &Email::new("ghost@example.com").expect("valid"),
            &Password::candidate("correct horse"),
        )
        .await
        .expect_err("unknown email");

    assert_eq!(err.code(), ErrorCode::Unauthorized);
    assert_eq!(err.message(), "invalid credentials");
}

#[tokio::test]
async fn customers_cannot_update_other_accounts() {
    let mut repo = MockUserRepository::new();
    repo.expect_update().never();
    let cache = RecordingCache::shared();
    let principal = Principal::new(UserId::random(), Role::Customer);

    let err = make_service(repo, &cache)
        .update_user(&principal, &UserId::random(), UserPatch::default())
        .await
        .expect_err("forbidden");

    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn customers_cannot_promote_themselves() {
    let me = UserId::random();
    let mut repo = MockUserRepository::new();
    repo.expect_update().never();
    let cache = RecordingCache::shared();
    let patch = UserPatch {
        role: Some(Role::Admin),
        ..UserPatch::default()
    };

    let err = make_service(repo, &cache)
        .update_user(&Principal::new(me, Role::Customer), &me, patch)
        .await
        .expect_err("forbidden");

    assert_eq!(err.code(), ErrorCode::Forbidden);
}

#[tokio::test]
async fn update_user_invalidates_old_and_new_email_keys() {
    let current = sample_user("old@example.com", Role::Customer);
    let id = current.id;
    let mut updated = current.clone();
    updated.email = Email::new("new@example.com").expect("valid");
    let returned = updated.clone();
    let current_clone = current.clone();

    let mut repo = MockUserRepository::new();
    repo.expect_find().times(2).returning(move |lookup| match lookup {
        UserLookup::ById(_) => Ok(Some(current_clone.clone())),
        _ => Ok(None),
    });
    repo.expect_update()
        .times(1)
        .return_once(move |_, _| Ok(Some(returned)));
    let cache = RecordingCache::shared();
    let old_key = CacheKey::User(UserLookup::ByEmail(current.email.clone()));
    cache.seed(&old_key, "{}");

    let patch = UserPatch {
        email: Some(updated.email.clone()),
        ..UserPatch::default()
    };
    let result = make_service(repo, &cache)
        .update_user(&Principal::new(id, Role::Customer), &id, patch)
        .await
        .expect("updated");

    assert_eq!(result.email.as_str(), "new@example.com");
    assert!(cache.was_deleted(&old_key));
    assert!(cache.was_deleted(&CacheKey::User(UserLookup::ByEmail(updated.email))));
    assert!(cache.was_deleted(&CacheKey::AllUsers));
}

#[tokio::test]
async fn delete_user_invalidates_released_showtimes() {
    let user = sample_user("ada@example.com", Role::Customer);
    let id = user.id;
    let neighbour = UserId::random();
    let mut repo = MockUserRepository::new();
    repo.expect_delete().times(1).return_once(move |_| {
        Ok(Some(DeletedUser {
            user,
            released_titles: vec![title("Metropolis")],
            co_holders: vec![neighbour],
        }))
    });
    let cache = RecordingCache::shared();
    let admin = Principal::new(UserId::random(), Role::Admin);

    make_service(repo, &cache)
        .delete_user(&admin, &id)
        .await
        .expect("deleted");

    for key in [
        CacheKey::UserReservations(id),
        CacheKey::UserReservations(neighbour),
        CacheKey::AllReservations,
        CacheKey::Showtime(title("Metropolis")),
        CacheKey::Movie(title("Metropolis")),
        CacheKey::AllUsers,
    ] {
        assert!(cache.was_deleted(&key), "expected {key} to be invalidated");
    }
}

#[tokio::test]
async fn external_login_links_existing_email() {
    let existing = sample_user("ada@example.com", Role::Customer);
    let mut linked = existing.clone();
    linked.external_id = Some(ExternalId::new("google|123").expect("valid"));
    let found = existing.clone();
    let mut repo = MockUserRepository::new();
    repo.expect_find().times(2).returning(move |lookup| match lookup {
        UserLookup::ByExternalId(_) => Ok(None),
        _ => Ok(Some(found.clone())),
    });
    repo.expect_update()
        .withf(|_, changes| changes.external_id.is_some() && changes.email.is_none())
        .times(1)
        .return_once(move |_, _| Ok(Some(linked)));
    repo.expect_insert().never();
    let cache = RecordingCache::shared();

    let user = make_service(repo, &cache)
        .get_or_create_by_external_id(
            Email::new("ada@example.com").expect("valid"),
            ExternalId::new("google|123").expect("valid"),
            None,
        )
        .await
        .expect("linked");

    assert_eq!(user.id, existing.id);
    assert!(user.external_id.is_some());
}

#[tokio::test]
async fn external_login_returns_known_identity() {
    let known = sample_user("ada@example.com", Role::Customer);
    let expected = known.clone();
    let mut repo = MockUserRepository::new();
    repo.expect_find()
        .times(1)
        .return_once(move |_| Ok(Some(known)));
    repo.expect_insert().never();
    let cache = RecordingCache::shared();

    let user = make_service(repo, &cache)
        .get_or_create_by_external_id(
            Email::new("ada@example.com").expect("valid"),
            ExternalId::new("google|123").expect("valid"),
            None,
        )
        .await
        .expect("found");

    assert_eq!(user, expected);
}

#[tokio::test]
async fn rotate_refresh_credential_reports_missing_user() {
    let mut repo = MockUserRepository::new();
    repo.expect_set_refresh_credential()
        .times(1)
        .return_once(|_, _| Ok(false));
    let cache = RecordingCache::shared();

    let err = make_service(repo, &cache)
        .rotate_refresh_credential(&UserId::random(), None)
        .await
        .expect_err("missing user");

    assert_eq!(err.code(), ErrorCode::NotFound);
}
