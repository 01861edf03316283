use chrono::{Duration, Utc};
use uuid::Uuid;
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::TestApp;

fn subscription_body(expiry_in_days: i64) -> serde_json::Value {
    serde_json::json!({
        "subscription_name": "Cloud backup",
        "start_date": Utc::now().to_rfc3339(),
        "expiry_date": (Utc::now() + Duration::days(expiry_in_days)).to_rfc3339(),
        "users": "ops@example.com finance@example.com"
    })
}

#[tokio::test]
async fn create_returns_201_and_persists_the_subscription() {
    let test_app = TestApp::spawn_app().await;
    test_app.mock_email_provider().await;
    let user_id = test_app.create_user("owner@example.com").await;

    let response = test_app
        .post_json(&format!("/subscriptions/{}", user_id), &subscription_body(120))
        .await;

    assert_eq!(response.status().as_u16(), 201);
    let created: serde_json::Value = response.json().await.unwrap();
    assert_eq!(created["subscription_name"], "Cloud backup");
    assert_eq!(created["subscription_status"], true);
    assert_eq!(created["created_by"], user_id.to_string());
    assert!(created["last_notification"].is_null());

    let (name, stakeholders): (String, i64) = sqlx::query_as(
        r#"
        SELECT s.subscription_name, COUNT(st.email)
        FROM subscriptions s
        JOIN subscription_stakeholders st ON st.subscription_id = s.id
        GROUP BY s.subscription_name
        "#,
    )
    .fetch_one(&test_app.db_pool)
    .await
    .expect("Failed to fetch saved subscription.");
    assert_eq!(name, "Cloud backup");
    assert_eq!(stakeholders, 2);
}

#[tokio::test]
async fn create_sends_a_welcome_email_to_stakeholders_and_creator() {
    let test_app = TestApp::spawn_app().await;
    let user_id = test_app.create_user("owner@example.com").await;

    Mock::given(path("/mail/send"))
        .and(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&test_app.email_server)
        .await;

    test_app
        .post_json(&format!("/subscriptions/{}", user_id), &subscription_body(120))
        .await;

    let received_requests = test_app.email_server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&received_requests[0].body).unwrap();
    let recipients = body["personalizations"][0]["to"].as_array().unwrap();
    assert_eq!(recipients.len(), 3);
}

#[tokio::test]
async fn create_succeeds_even_if_the_welcome_email_fails() {
    let test_app = TestApp::spawn_app().await;
    let user_id = test_app.create_user("owner@example.com").await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .mount(&test_app.email_server)
        .await;

    let response = test_app
        .post_json(&format!("/subscriptions/{}", user_id), &subscription_body(120))
        .await;

    assert_eq!(response.status().as_u16(), 201);
}

#[tokio::test]
async fn create_returns_404_for_unknown_creator() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app
        .post_json(
            &format!("/subscriptions/{}", Uuid::new_v4()),
            &subscription_body(120),
        )
        .await;

    assert_eq!(response.status().as_u16(), 404);
}

#[tokio::test]
async fn create_returns_400_when_body_is_invalid() {
    let test_app = TestApp::spawn_app().await;
    let user_id = test_app.create_user("owner@example.com").await;
    let now = Utc::now();
    let test_cases = vec![
        (serde_json::json!({}), "empty body"),
        (
            serde_json::json!({
                "start_date": now.to_rfc3339(),
                "expiry_date": (now + Duration::days(10)).to_rfc3339(),
                "users": "ops@example.com"
            }),
            "missing subscription name",
        ),
        (
            serde_json::json!({
                "subscription_name": "VPN",
                "expiry_date": (now + Duration::days(10)).to_rfc3339(),
                "users": "ops@example.com"
            }),
            "missing start date",
        ),
        (
            serde_json::json!({
                "subscription_name": "VPN",
                "start_date": now.to_rfc3339(),
                "users": "ops@example.com"
            }),
            "missing expiry date",
        ),
        (
            serde_json::json!({
                "subscription_name": "VPN",
                "start_date": now.to_rfc3339(),
                "expiry_date": (now + Duration::days(10)).to_rfc3339()
            }),
            "missing stakeholders",
        ),
        (
            serde_json::json!({
                "subscription_name": "VPN",
                "start_date": now.to_rfc3339(),
                "expiry_date": "the 5th of never",
                "users": "ops@example.com"
            }),
            "malformed expiry date",
        ),
        (
            serde_json::json!({
                "subscription_name": "VPN",
                "start_date": (now - Duration::days(30)).to_rfc3339(),
                "expiry_date": (now - Duration::days(1)).to_rfc3339(),
                "users": "ops@example.com"
            }),
            "expiry date in the past",
        ),
        (
            serde_json::json!({
                "subscription_name": "VPN",
                "start_date": now.to_rfc3339(),
                "expiry_date": (now + Duration::days(10)).to_rfc3339(),
                "users": "ops@example.com not-an-email"
            }),
            "invalid stakeholder email",
        ),
    ];

    for (invalid_body, error_message) in test_cases {
        let response = test_app
            .post_json(&format!("/subscriptions/{}", user_id), &invalid_body)
            .await;

        assert_eq!(
            400,
            response.status().as_u16(),
            "The API did not fail with 400 status when payload was {}",
            error_message
        );
        let body: serde_json::Value = response.json().await.unwrap();
        assert!(
            body["error"].is_string(),
            "The API did not describe the error when payload was {}",
            error_message
        );
    }
}

#[tokio::test]
async fn malformed_dates_are_reported_by_field() {
    let test_app = TestApp::spawn_app().await;
    let user_id = test_app.create_user("owner@example.com").await;

    let response = test_app
        .post_json(
            &format!("/subscriptions/{}", user_id),
            &serde_json::json!({
                "subscription_name": "VPN",
                "start_date": Utc::now().to_rfc3339(),
                "expiry_date": "the 5th of never",
                "users": "ops@example.com"
            }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("expiry_date"));
}

#[tokio::test]
async fn unreadable_json_gets_a_json_error() {
    let test_app = TestApp::spawn_app().await;
    let user_id = test_app.create_user("owner@example.com").await;

    let response = test_app
        .api_client
        .post(format!("{}/subscriptions/{}", test_app.address, user_id))
        .header("Content-Type", "application/json")
        .body("{\"subscription_name\": ")
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn subscriptions_can_be_listed_and_fetched() {
    let test_app = TestApp::spawn_app().await;
    test_app.mock_email_provider().await;
    let user_id = test_app.create_user("owner@example.com").await;
    let created = test_app
        .create_subscription(user_id, Utc::now() + Duration::days(50))
        .await;
    test_app
        .create_subscription(user_id, Utc::now() + Duration::days(150))
        .await;

    let list: serde_json::Value = test_app.get("/subscriptions").await.json().await.unwrap();
    let fetched = test_app
        .get(&format!("/subscriptions/{}", created["id"].as_str().unwrap()))
        .await;

    assert_eq!(list.as_array().unwrap().len(), 2);
    assert_eq!(fetched.status().as_u16(), 200);
    let fetched: serde_json::Value = fetched.json().await.unwrap();
    assert_eq!(fetched["id"], created["id"]);
    assert_eq!(fetched["users"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_subscription_returns_404() {
    let test_app = TestApp::spawn_app().await;

    let fetched = test_app
        .get(&format!("/subscriptions/{}", Uuid::new_v4()))
        .await;
    let deleted = test_app
        .delete(&format!("/subscriptions/{}", Uuid::new_v4()))
        .await;

    assert_eq!(fetched.status().as_u16(), 404);
    assert_eq!(deleted.status().as_u16(), 404);
}

#[tokio::test]
async fn delete_removes_the_subscription() {
    let test_app = TestApp::spawn_app().await;
    test_app.mock_email_provider().await;
    let user_id = test_app.create_user("owner@example.com").await;
    let created = test_app
        .create_subscription(user_id, Utc::now() + Duration::days(50))
        .await;
    let route = format!("/subscriptions/{}", created["id"].as_str().unwrap());

    let response = test_app.delete(&route).await;

    assert_eq!(response.status().as_u16(), 204);
    assert_eq!(test_app.get(&route).await.status().as_u16(), 404);
}

#[tokio::test]
async fn update_applies_allowed_fields_only() {
    let test_app = TestApp::spawn_app().await;
    test_app.mock_email_provider().await;
    let user_id = test_app.create_user("owner@example.com").await;
    let created = test_app
        .create_subscription(user_id, Utc::now() + Duration::days(50))
        .await;
    let route = format!("/subscriptions/{}", created["id"].as_str().unwrap());

    let response = test_app
        .put_json(
            &route,
            &serde_json::json!({
                "subscription_name": "Antivirus licence (renewed)",
                "subscription_status": false,
                "users": "security@example.com",
                "created_by": Uuid::new_v4(),
                "last_notification": Utc::now().to_rfc3339()
            }),
        )
        .await;

    assert_eq!(response.status().as_u16(), 200);
    let updated: serde_json::Value = test_app.get(&route).await.json().await.unwrap();
    assert_eq!(updated["subscription_name"], "Antivirus licence (renewed)");
    assert_eq!(updated["subscription_status"], false);
    assert_eq!(updated["users"], serde_json::json!(["security@example.com"]));
    assert_eq!(updated["created_by"], user_id.to_string());
    assert!(updated["last_notification"].is_null());
}

#[tokio::test]
async fn update_rejects_inconsistent_dates() {
    let test_app = TestApp::spawn_app().await;
    test_app.mock_email_provider().await;
    let user_id = test_app.create_user("owner@example.com").await;
    let created = test_app
        .create_subscription(user_id, Utc::now() + Duration::days(50))
        .await;
    let route = format!("/subscriptions/{}", created["id"].as_str().unwrap());

    let start_after_expiry = test_app
        .put_json(
            &route,
            &serde_json::json!({"start_date": (Utc::now() + Duration::days(60)).to_rfc3339()}),
        )
        .await;
    let expiry_in_the_past = test_app
        .put_json(
            &route,
            &serde_json::json!({"expiry_date": (Utc::now() - Duration::days(1)).to_rfc3339()}),
        )
        .await;

    assert_eq!(start_after_expiry.status().as_u16(), 400);
    assert_eq!(expiry_in_the_past.status().as_u16(), 400);
}
