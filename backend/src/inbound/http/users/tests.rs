//! Handler tests for the account endpoints.

use super::*;
use crate::domain::service_test_support::sample_user;
use crate::inbound::http::test_utils::{MockPorts, principal, signed_in, test_app};
use actix_web::http::StatusCode;
use actix_web::test as actix_test;
use rstest::rstest;
use serde_json::{Value, json};

#[actix_web::test]
async fn list_users_requires_a_session() {
    let app = actix_test::init_service(test_app(MockPorts::default().into_state())).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get().uri("/api/v1/users").to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
async fn list_users_returns_camel_case_json() {
    let mut ports = MockPorts::default();
    ports.users.expect_list_users().returning(|_| {
        let mut user = sample_user("ada@example.com", Role::Customer);
        user.username = Some(Username::new("ada").expect("username"));
        Ok(vec![user])
    });
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = signed_in(&app, &principal(Role::Admin)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/users")
            .cookie(cookie)
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    let first = &body.as_array().expect("array")[0];
    assert_eq!(first["username"], "ada");
    assert!(first.get("createdAt").is_some());
    assert!(first.get("created_at").is_none());
}

#[actix_web::test]
async fn current_user_looks_up_the_session_principal() {
    let caller = principal(Role::Customer);
    let mut ports = MockPorts::default();
    ports
        .users
        .expect_find_user()
        .withf(move |lookup| *lookup == UserLookup::ById(caller.user_id))
        .returning(move |_| {
            let mut user = sample_user("ada@example.com", Role::Customer);
            user.id = caller.user_id;
            Ok(user)
        });
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = signed_in(&app, &caller).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/users/me")
            .cookie(cookie)
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["id"], caller.user_id.to_string());
}

#[actix_web::test]
async fn update_forwards_the_validated_patch() {
    let caller = principal(Role::Customer);
    let mut ports = MockPorts::default();
    ports
        .users
        .expect_update_user()
        .withf(move |who, id, patch| {
            *who == caller
                && *id == caller.user_id
                && patch.username.as_ref().map(Username::as_str) == Some("ada")
                && patch.password.is_none()
        })
        .returning(|_, _, _| Ok(sample_user("ada@example.com", Role::Customer)));
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = signed_in(&app, &caller).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::patch()
            .uri(&format!("/api/v1/users/{}", caller.user_id))
            .cookie(cookie)
            .set_json(json!({"username": "ada"}))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::OK);
}

#[rstest]
#[case("not-a-uuid", json!({}), "invalid_uuid")]
#[case("22222222-2222-4222-8222-222222222222", json!({"password": "x"}), "password")]
#[actix_web::test]
async fn update_rejects_bad_input(
    #[case] id: &str,
    #[case] body: Value,
    #[case] expected: &str,
) {
    let app = actix_test::init_service(test_app(MockPorts::default().into_state())).await;
    let cookie = signed_in(&app, &principal(Role::Customer)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::patch()
            .uri(&format!("/api/v1/users/{id}"))
            .cookie(cookie)
            .set_json(body)
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let payload: Value = actix_test::read_body_json(res).await;
    assert!(payload.to_string().contains(expected));
}

#[actix_web::test]
async fn delete_is_admin_only() {
    let app = actix_test::init_service(test_app(MockPorts::default().into_state())).await;
    let cookie = signed_in(&app, &principal(Role::Customer)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri("/api/v1/users/22222222-2222-4222-8222-222222222222")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[actix_web::test]
async fn delete_maps_missing_accounts_to_not_found() {
    let mut ports = MockPorts::default();
    ports
        .users
        .expect_delete_user()
        .returning(|_, _| Err(Error::not_found("user not found")));
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = signed_in(&app, &principal(Role::Admin)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri("/api/v1/users/33333333-3333-4333-8333-333333333333")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}
