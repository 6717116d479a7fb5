use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use delite_api::{app, AppState, RateLimitSettings};
use delite_catalog::{Experience, PricingEngine, SlotKey};
use delite_order::{BookingCoordinator, PaymentOrchestrator, SimulatedPaymentAdapter};
use delite_promo::PromoCode;
use delite_store::{LogEventPublisher, MemoryStore, Storage};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`
use uuid::Uuid;

const DATE: &str = "2026-11-02";
const TIME: &str = "07:00 am";

fn kayaking(available: i32) -> Experience {
    serde_json::from_value(json!({
        "id": Uuid::new_v4(),
        "title": "Kayaking",
        "location": "Udupi",
        "description": "Curated small-group experience",
        "price": 999,
        "image": "https://example.com/kayak.jpg",
        "availableDates": [
            { "date": DATE, "timeSlots": [
                { "time": TIME, "availableSlots": available, "maxSlots": 8 },
                { "time": "09:00 am", "availableSlots": 8, "maxSlots": 8 }
            ]}
        ]
    }))
    .unwrap()
}

fn save10() -> PromoCode {
    serde_json::from_value(json!({
        "code": "SAVE10",
        "description": "10% off",
        "discountType": "percentage",
        "discountValue": 10,
        "minOrderValue": 500,
        "maxDiscount": 200,
        "validFrom": "2020-01-01T00:00:00Z",
        "validUntil": "2099-12-31T00:00:00Z",
        "usageLimit": 100
    }))
    .unwrap()
}

struct TestApp {
    router: Router,
    store: MemoryStore,
    experience: Experience,
}

fn setup(available: i32) -> TestApp {
    let store = MemoryStore::new();
    let experience = kayaking(available);
    store.add_experience(experience.clone()).unwrap();
    store.add_promo(save10()).unwrap();

    let storage = Storage::memory(store.clone());
    let coordinator = BookingCoordinator::new(
        storage.unit_of_work.clone(),
        PricingEngine::default(),
        PaymentOrchestrator::new(Arc::new(SimulatedPaymentAdapter), "INR"),
        Arc::new(LogEventPublisher),
    );

    let state = AppState {
        coordinator: Arc::new(coordinator),
        experiences: storage.experiences,
        promos: storage.promos,
        bookings: storage.bookings,
        redis: None,
        rate_limit: RateLimitSettings {
            requests_per_window: 100,
            window_seconds: 60,
        },
    };

    TestApp {
        router: app(state, &[]),
        store,
        experience,
    }
}

async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap()
    };
    (status, json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn booking_body(experience_id: Uuid, quantity: u32) -> Value {
    json!({
        "experienceId": experience_id,
        "customerName": "Jane Doe",
        "customerEmail": "Jane@Example.com",
        "selectedDate": DATE,
        "selectedTime": TIME,
        "quantity": quantity
    })
}

#[tokio::test]
async fn test_create_booking_prices_and_confirms() {
    let test = setup(4);

    let (status, body) = send(
        test.router.clone(),
        post_json("/api/bookings", &booking_body(test.experience.id, 2)),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Booking created successfully");
    assert_eq!(body["booking"]["total"], 2098);
    assert_eq!(body["booking"]["status"], "confirmed");
    assert_eq!(body["booking"]["quantity"], 2);

    let reference = body["booking"]["referenceId"].as_str().unwrap().to_string();
    assert_eq!(reference.len(), 8);

    let (status, stored) = send(test.router.clone(), get(&format!("/api/bookings/{}", reference))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["subtotal"], 1998);
    assert_eq!(stored["taxes"], 100);
    assert_eq!(stored["customerEmail"], "jane@example.com");
    assert_eq!(stored["paymentStatus"], "completed");

    let key = SlotKey::new(test.experience.id, DATE, TIME);
    assert_eq!(test.store.available_slots(&key).unwrap(), Some(2));
}

#[tokio::test]
async fn test_booking_with_promo_records_usage() {
    let test = setup(4);
    let mut body = booking_body(test.experience.id, 2);
    body["promoCode"] = json!("save10");

    let (status, response) = send(test.router.clone(), post_json("/api/bookings", &body)).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(response["booking"]["total"], 1898);
    assert_eq!(test.store.promo_used_count("SAVE10").unwrap(), Some(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_last_seat_goes_to_exactly_one_request() {
    let test = setup(1);
    let body = booking_body(test.experience.id, 1);

    let first = tokio::spawn(send(test.router.clone(), post_json("/api/bookings", &body)));
    let second = tokio::spawn(send(test.router.clone(), post_json("/api/bookings", &body)));
    let (first, second) = (first.await.unwrap(), second.await.unwrap());

    let mut statuses = vec![first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::CREATED, StatusCode::BAD_REQUEST]);

    let rejected = if first.0 == StatusCode::BAD_REQUEST { first.1 } else { second.1 };
    assert_eq!(rejected["message"], "Selected time slot not available or insufficient slots");

    let key = SlotKey::new(test.experience.id, DATE, TIME);
    assert_eq!(test.store.available_slots(&key).unwrap(), Some(0));
    assert_eq!(test.store.booking_count().unwrap(), 1);
}

#[tokio::test]
async fn test_invalid_email_is_rejected_without_side_effects() {
    let test = setup(4);
    let mut body = booking_body(test.experience.id, 1);
    body["customerEmail"] = json!("not-an-email");

    let (status, response) = send(test.router.clone(), post_json("/api/bookings", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    let errors = response["errors"].as_array().unwrap();
    assert!(errors.iter().any(|e| e["field"] == "customerEmail" && e["message"] == "Valid email required"));

    let key = SlotKey::new(test.experience.id, DATE, TIME);
    assert_eq!(test.store.available_slots(&key).unwrap(), Some(4));
    assert_eq!(test.store.booking_count().unwrap(), 0);
}

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let test = setup(4);
    let request = Request::builder()
        .method("POST")
        .uri("/api/bookings")
        .header("content-type", "application/json")
        .body(Body::from("{not json"))
        .unwrap();

    let (status, response) = send(test.router.clone(), request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(response["errors"].is_array());
}

#[tokio::test]
async fn test_unknown_experience_is_not_found() {
    let test = setup(4);

    let (status, response) = send(
        test.router.clone(),
        post_json("/api/bookings", &booking_body(Uuid::new_v4(), 1)),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["message"], "Experience not found");
}

#[tokio::test]
async fn test_unknown_booking_reference_is_not_found() {
    let test = setup(4);

    let (status, response) = send(test.router.clone(), get("/api/bookings/ZZZZ9999")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(response["message"], "Booking not found");
}

#[tokio::test]
async fn test_experience_listing_and_detail() {
    let test = setup(4);

    let (status, list) = send(test.router.clone(), get("/api/experiences?search=KAYAK")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert!(list[0].get("includes").is_none());

    let (status, list) = send(test.router.clone(), get("/api/experiences?location=goa")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(list.as_array().unwrap().is_empty());

    let (status, detail) =
        send(test.router.clone(), get(&format!("/api/experiences/{}", test.experience.id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["minimumAge"], 10);

    let (status, missing) = send(test.router.clone(), get("/api/experiences/not-a-uuid")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(missing["message"], "Experience not found");
}

#[tokio::test]
async fn test_availability_for_date() {
    let test = setup(4);
    let uri = format!("/api/experiences/{}/availability?date={}", test.experience.id, DATE);

    let (status, body) = send(test.router.clone(), get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["timeSlots"].as_array().unwrap().len(), 2);
    assert_eq!(body["timeSlots"][0]["availableSlots"], 4);

    let uri = format!("/api/experiences/{}/availability?date=2030-01-01", test.experience.id);
    let (status, body) = send(test.router.clone(), get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["timeSlots"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_promo_validation_outcomes() {
    let test = setup(4);

    let (status, body) = send(
        test.router.clone(),
        post_json("/api/promo/validate", &json!({ "code": "save10", "orderValue": 1998 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["discount"], 200);
    assert_eq!(body["promoCode"]["code"], "SAVE10");
    assert_eq!(body["promoCode"]["discountType"], "percentage");

    let (status, body) = send(
        test.router.clone(),
        post_json("/api/promo/validate", &json!({ "code": "SAVE10", "orderValue": 200 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert_eq!(body["message"], "Minimum order value of ₹500 required");

    let (status, body) = send(
        test.router.clone(),
        post_json("/api/promo/validate", &json!({ "code": "NOPE", "orderValue": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Invalid promo code");

    let (status, body) = send(
        test.router.clone(),
        post_json("/api/promo/validate", &json!({ "code": "  ", "orderValue": 1000 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Promo code is required");

    let (status, body) = send(
        test.router.clone(),
        post_json("/api/promo/validate", &json!({ "code": "SAVE10", "orderValue": 499.5 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);
    assert_eq!(body["message"], "Minimum order value of ₹500 required");
    assert!(body.get("discount").is_none());

    // Validation never consumes a use
    assert_eq!(test.store.promo_used_count("SAVE10").unwrap(), Some(0));
}

#[tokio::test]
async fn test_list_active_promos() {
    let test = setup(4);

    let (status, body) = send(test.router.clone(), get("/api/promo")).await;

    assert_eq!(status, StatusCode::OK);
    let promos = body.as_array().unwrap();
    assert_eq!(promos.len(), 1);
    assert_eq!(promos[0]["code"], "SAVE10");
    assert_eq!(promos[0]["usedCount"], 0);
    assert!(promos[0].get("id").is_none());
}

#[tokio::test]
async fn test_unknown_route() {
    let test = setup(4);

    let (status, body) = send(test.router.clone(), get("/api/nothing-here")).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Route not found");
}
