use subscription_tracker::config::get_configuration;
use subscription_tracker::startup::Application;

use crate::helpers::TestApp;

#[tokio::test]
async fn health_check_works() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app.get("/health_check").await;

    assert!(response.status().is_success());
    assert_eq!(Some(0), response.content_length())
}

#[tokio::test]
async fn status_reports_ok() {
    let test_app = TestApp::spawn_app().await;

    let response = test_app.get("/status").await;
    let body: serde_json::Value = response.json().await.unwrap();

    assert_eq!(body, serde_json::json!({"status": "OK"}));
}

#[tokio::test]
async fn zero_reminder_period_fails_the_build() {
    let mut config = get_configuration().expect("Failed to read configuration.");
    config.set_app_port(0);
    config.reminders.enabled = true;
    config.reminders.period_seconds = 0;

    assert!(Application::build(config).await.is_err());
}
