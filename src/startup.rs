use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Pool, Postgres};
use std::io::{Error, ErrorKind};
use std::net::TcpListener;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing_actix_web::TracingLogger;

use crate::config::{DatabaseSettings, Settings};
use crate::db::subscriptions::PgSubscriptionStore;
use crate::directory_client::DirectoryClient;
use crate::email_client::EmailClient;
use crate::reminders::job::spawn_reminder_scheduler;
use crate::reminders::mailer::EmailReminderMailer;
use crate::routes::{
    handle_create_subscription, handle_current_user, handle_delete_subscription,
    handle_delete_user, handle_get_subscription, handle_get_user, handle_list_subscriptions,
    handle_list_users, handle_login, handle_update_subscription, handle_update_user,
    health_check, json_config, status,
};

/// Public URL of the application, used for links in emails.
pub struct ApplicationBaseUrl(pub String);

/// Lifetime of a login session, in seconds.
pub struct SessionTtl(pub u64);

pub struct Application {
    port: u16,
    server: Server,
    reminder_job: Option<JoinHandle<()>>,
}

impl Application {
    pub async fn build(config: Settings) -> Result<Self, Error> {
        let db_pool = get_connection_db_pool(&config.database);
        let sender_email = config
            .email_client
            .get_sender_email()
            .map_err(|err| Error::new(ErrorKind::InvalidInput, err))?;
        let email_client = EmailClient::new(
            config.email_client.base_url.clone(),
            sender_email,
            config.email_client.api_key.clone(),
            Some(config.email_client.get_timeout()),
        )
        .map_err(|err| Error::new(ErrorKind::Other, err))?;
        let directory_client = DirectoryClient::new(
            config.directory.base_url.clone(),
            config.directory.get_timeout(),
        )
        .map_err(|err| Error::new(ErrorKind::Other, err))?;
        let redis_client = redis::Client::open(config.get_redis_address())
            .map_err(|err| Error::new(ErrorKind::InvalidInput, err))?;

        let reminder_job = if config.reminders.enabled {
            let period = config
                .reminders
                .get_period()
                .map_err(|err| Error::new(ErrorKind::InvalidInput, err))?;
            let store = PgSubscriptionStore::new(db_pool.clone());
            let mailer = EmailReminderMailer::new(email_client.clone(), config.get_app_base_url());
            tracing::info!(
                "Reminder batches scheduled every {} seconds",
                config.reminders.period_seconds
            );

            Some(spawn_reminder_scheduler(
                Arc::new(store),
                Arc::new(mailer),
                period,
            ))
        } else {
            None
        };

        let listener = TcpListener::bind(config.get_address())?;
        let port = listener.local_addr()?.port();
        let server = run(
            listener,
            db_pool,
            email_client,
            directory_client,
            redis_client,
            ApplicationBaseUrl(config.get_app_base_url()),
            SessionTtl(config.redis.session_ttl_seconds),
        )?;

        Ok(Self {
            port,
            server,
            reminder_job,
        })
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stop(self) -> Result<(), Error> {
        let result = self.server.await;

        if let Some(reminder_job) = self.reminder_job {
            reminder_job.abort();
        }

        result
    }
}

pub fn run(
    listener: TcpListener,
    db_pool: PgPool,
    email_client: EmailClient,
    directory_client: DirectoryClient,
    redis_client: redis::Client,
    base_url: ApplicationBaseUrl,
    session_ttl: SessionTtl,
) -> Result<Server, Error> {
    let db_pool = web::Data::new(db_pool);
    let email_client = web::Data::new(email_client);
    let directory_client = web::Data::new(directory_client);
    let redis_client = web::Data::new(redis_client);
    let base_url = web::Data::new(base_url);
    let session_ttl = web::Data::new(session_ttl);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .route("/health_check", web::get().to(health_check))
            .route("/status", web::get().to(status))
            .route("/users", web::get().to(handle_list_users))
            .route("/users", web::post().to(handle_login))
            // registered before /users/{user_id} so "me" is not parsed as an id
            .route("/users/me", web::get().to(handle_current_user))
            .route("/users/{user_id}", web::get().to(handle_get_user))
            .route("/users/{user_id}", web::put().to(handle_update_user))
            .route("/users/{user_id}", web::delete().to(handle_delete_user))
            .route("/subscriptions", web::get().to(handle_list_subscriptions))
            .route(
                "/subscriptions/{subscription_id}",
                web::get().to(handle_get_subscription),
            )
            .route(
                "/subscriptions/{subscription_id}",
                web::put().to(handle_update_subscription),
            )
            .route(
                "/subscriptions/{subscription_id}",
                web::delete().to(handle_delete_subscription),
            )
            .route(
                "/subscriptions/{user_id}",
                web::post().to(handle_create_subscription),
            )
            .app_data(json_config())
            .app_data(db_pool.clone())
            .app_data(email_client.clone())
            .app_data(directory_client.clone())
            .app_data(redis_client.clone())
            .app_data(base_url.clone())
            .app_data(session_ttl.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub fn get_connection_db_pool(config: &DatabaseSettings) -> Pool<Postgres> {
    PgPoolOptions::new()
        .acquire_timeout(std::time::Duration::from_secs(2))
        .connect_lazy_with(config.get_db_options())
}
