use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use reqwest::Response;
use sqlx::{migrate, Connection, Executor, PgConnection, PgPool};
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use subscription_tracker::{
    config::{get_configuration, DatabaseSettings, Settings},
    startup::{get_connection_db_pool, Application},
    telemetry::{get_subscriber, init_subscriber},
};

// Logs are only printed when TEST_LOG is set, e.g. `TEST_LOG=true cargo test | bunyan`
static TRACING: Lazy<()> = Lazy::new(|| {
    let name = String::from("test");
    let env_filter = String::from("info");

    if std::env::var("TEST_LOG").is_ok() {
        init_subscriber(get_subscriber(name, env_filter, std::io::stdout));
    } else {
        init_subscriber(get_subscriber(name, env_filter, std::io::sink));
    }
});

pub struct TestApp {
    pub config: Settings,
    pub address: String,
    pub db_pool: PgPool,
    pub email_server: MockServer,
    pub directory_server: MockServer,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn spawn_app() -> TestApp {
        Lazy::force(&TRACING);

        let mut config = get_configuration().expect("Missing configuration file.");
        let db_test_name = format!("db_{}", Uuid::new_v4().to_string().replace('-', "_"));
        let email_server = MockServer::start().await;
        let directory_server = MockServer::start().await;

        // Port 0 lets the OS pick a free port for each test
        config.set_app_port(0);
        config.set_email_client_base_url(email_server.uri());
        config.set_directory_base_url(directory_server.uri());
        // Batches are triggered explicitly by the tests
        config.reminders.enabled = false;

        let db_pool = configure_db(&mut config.database, db_test_name).await;

        let application = Application::build(config.clone())
            .await
            .expect("Failed to build application.");

        let address = format!("http://127.0.0.1:{}", application.get_port());

        tokio::spawn(application.run_until_stop());

        TestApp {
            address,
            config,
            db_pool,
            email_server,
            directory_server,
            api_client: reqwest::Client::new(),
        }
    }

    pub async fn get(&self, route: &str) -> Response {
        self.api_client
            .get(format!("{}{}", self.address, route))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn delete(&self, route: &str) -> Response {
        self.api_client
            .delete(format!("{}{}", self.address, route))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_json(&self, route: &str, body: &serde_json::Value) -> Response {
        self.api_client
            .post(format!("{}{}", self.address, route))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn put_json(&self, route: &str, body: &serde_json::Value) -> Response {
        self.api_client
            .put(format!("{}{}", self.address, route))
            .json(body)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn mock_directory_user(&self, email: &str, first_name: &str, last_name: &str) {
        Mock::given(method("POST"))
            .and(path("/auth/detail"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status_code": "200",
                "data": {"mail": email, "firstname": first_name, "surname": last_name}
            })))
            .mount(&self.directory_server)
            .await;
    }

    pub async fn mock_email_provider(&self) {
        Mock::given(path("/mail/send"))
            .and(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&self.email_server)
            .await;
    }

    /// Inserts a user directly, bypassing the directory login.
    pub async fn create_user(&self, email: &str) -> Uuid {
        let id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, first_name, last_name, created_at, updated_at)
            VALUES ($1, $2, 'Test', 'User', now(), now())
            "#,
        )
        .bind(id)
        .bind(email)
        .execute(&self.db_pool)
        .await
        .expect("Failed to insert user.");

        id
    }

    pub async fn create_subscription(
        &self,
        user_id: Uuid,
        expiry_date: DateTime<Utc>,
    ) -> serde_json::Value {
        let body = serde_json::json!({
            "subscription_name": "Antivirus licence",
            "start_date": Utc::now().to_rfc3339(),
            "expiry_date": expiry_date.to_rfc3339(),
            "users": "it@example.com finance@example.com"
        });

        let response = self
            .post_json(&format!("/subscriptions/{}", user_id), &body)
            .await;
        assert_eq!(response.status().as_u16(), 201);

        response.json().await.expect("Invalid subscription body.")
    }
}

async fn configure_db(db_config: &mut DatabaseSettings, db_test_name: String) -> PgPool {
    let mut connection = PgConnection::connect_with(&db_config.get_server_options())
        .await
        .expect("Failed to connect to Postgres.");

    connection
        .execute(&*format!(r#"CREATE DATABASE "{}";"#, db_test_name))
        .await
        .expect("Failed to create database.");

    connection
        .close()
        .await
        .expect("Failed to close connection.");

    db_config.set_name(db_test_name);

    let db_pool = get_connection_db_pool(db_config);

    migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("Failed to run migrations.");

    db_pool
}
