//! Handler tests for the reservation endpoints.

use super::*;
use crate::domain::service_test_support::{sample_movie, sample_reservation, sample_showtime};
use crate::domain::Role;
use crate::inbound::http::test_utils::{MockPorts, principal, signed_in, test_app};
use actix_web::test as actix_test;
use rstest::rstest;
use serde_json::{Value, json};

fn confirmed(seats: u32) -> ReservationOutcome {
    let showtime = sample_showtime(&sample_movie("Metropolis"), 10, 12);
    ReservationOutcome::Confirmed(sample_reservation(
        principal(Role::Customer).user_id,
        &showtime,
        seats,
    ))
}

#[actix_web::test]
async fn create_returns_created_reservation() {
    let mut ports = MockPorts::default();
    ports
        .reservations
        .expect_create_reservation()
        .withf(|principal, title, seats| {
            !principal.is_admin() && title.as_str() == "Metropolis" && *seats == 2
        })
        .times(1)
        .returning(|_, _, _| Ok(confirmed(2)));
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = signed_in(&app, &principal(Role::Customer)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/reservations")
            .cookie(cookie)
            .set_json(json!({"title": "Metropolis", "seats": 2}))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::CREATED);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["seatsReserved"], 2);
}

#[rstest]
#[case(true)]
#[case(false)]
#[actix_web::test]
async fn shortfall_maps_to_conflict_with_counts(#[case] creating: bool) {
    let short = || {
        Ok(ReservationOutcome::InsufficientCapacity {
            requested: 5,
            available: 3,
        })
    };
    let mut ports = MockPorts::default();
    ports
        .reservations
        .expect_create_reservation()
        .returning(move |_, _, _| short());
    ports
        .reservations
        .expect_update_reservation()
        .returning(move |_, _, _| short());
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = signed_in(&app, &principal(Role::Customer)).await;

    let request = if creating {
        actix_test::TestRequest::post()
    } else {
        actix_test::TestRequest::patch()
    };
    let res = actix_test::call_service(
        &app,
        request
            .uri("/api/v1/reservations")
            .cookie(cookie)
            .set_json(json!({"title": "Metropolis", "seats": 5}))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::CONFLICT);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body["code"], INSUFFICIENT_CAPACITY);
    assert_eq!(body["requested"], 5);
    assert_eq!(body["available"], 3);
}

#[actix_web::test]
async fn update_returns_ok() {
    let mut ports = MockPorts::default();
    ports
        .reservations
        .expect_update_reservation()
        .withf(|_, _, seats| *seats == 4)
        .returning(|_, _, _| Ok(confirmed(4)));
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = signed_in(&app, &principal(Role::Customer)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::patch()
            .uri("/api/v1/reservations")
            .cookie(cookie)
            .set_json(json!({"title": "Metropolis", "seats": 4}))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
}

#[actix_web::test]
async fn invalid_seat_counts_surface_as_bad_request() {
    let mut ports = MockPorts::default();
    ports
        .reservations
        .expect_create_reservation()
        .returning(|_, _, _| Err(Error::invalid_request("seats must be at least 1")));
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = signed_in(&app, &principal(Role::Customer)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/reservations")
            .cookie(cookie)
            .set_json(json!({"title": "Metropolis", "seats": 0}))
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn my_reservations_route_is_not_taken_as_a_title() {
    let mut ports = MockPorts::default();
    ports
        .reservations
        .expect_find_my_reservations()
        .times(1)
        .returning(|principal| {
            let movie = sample_movie("Metropolis");
            let showtime = sample_showtime(&movie, 8, 10);
            Ok(vec![ReservationDetails {
                reservation: sample_reservation(principal.user_id, &showtime, 2),
                showtime,
                movie,
            }])
        });
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = signed_in(&app, &principal(Role::Customer)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/reservations/me")
            .cookie(cookie)
            .to_request(),
    )
    .await;

    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = actix_test::read_body_json(res).await;
    assert_eq!(body[0]["movie"]["title"], "Metropolis");
    assert_eq!(body[0]["seatsReserved"], 2);
}

#[rstest]
#[case(Role::Customer, StatusCode::FORBIDDEN)]
#[case(Role::Admin, StatusCode::OK)]
#[actix_web::test]
async fn listing_everything_is_admin_only(#[case] role: Role, #[case] expected: StatusCode) {
    let mut ports = MockPorts::default();
    ports
        .reservations
        .expect_list_all_reservations()
        .returning(|_| Ok(Vec::new()));
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = signed_in(&app, &principal(role)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::get()
            .uri("/api/v1/reservations")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), expected);
}

#[actix_web::test]
async fn cancel_without_reservation_is_not_found() {
    let mut ports = MockPorts::default();
    ports
        .reservations
        .expect_cancel_reservation()
        .withf(|_, title| title.as_str() == "Metropolis")
        .returning(|_, _| Err(Error::not_found("no reservation for this movie")));
    let app = actix_test::init_service(test_app(ports.into_state())).await;
    let cookie = signed_in(&app, &principal(Role::Customer)).await;

    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::delete()
            .uri("/api/v1/reservations/Metropolis")
            .cookie(cookie)
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn anonymous_callers_are_unauthorised() {
    let app = actix_test::init_service(test_app(MockPorts::default().into_state())).await;
    let res = actix_test::call_service(
        &app,
        actix_test::TestRequest::post()
            .uri("/api/v1/reservations")
            .set_json(json!({"title": "Metropolis", "seats": 1}))
            .to_request(),
    )
    .await;
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}
