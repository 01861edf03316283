use actix_web::http::StatusCode;
use actix_web::{web, HttpResponse, ResponseError};
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::subscriptions::{
    delete_subscription, get_subscription, insert_subscription, list_subscriptions,
    save_subscription,
};
use crate::db::users::get_user;
use crate::db::StoreError;
use crate::domain::new_subscription::{NewSubscription, NewSubscriptionBody};
use crate::domain::subscription::{SubscriptionUpdate, SubscriptionUpdateBody};
use crate::email_client::EmailClient;
use crate::reminders::mailer::send_welcome_email;
use crate::routes::{error_chain_fmt, json_error_response};
use crate::startup::ApplicationBaseUrl;

#[derive(thiserror::Error)]
pub enum SubscriptionError {
    #[error("{0}")]
    Validation(String),
    #[error("Not found")]
    NotFound,
    #[error("Failed to access the subscriptions table.")]
    Store(#[from] StoreError),
}

impl std::fmt::Debug for SubscriptionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for SubscriptionError {
    fn status_code(&self) -> StatusCode {
        match self {
            SubscriptionError::Validation(_) => StatusCode::BAD_REQUEST,
            SubscriptionError::NotFound => StatusCode::NOT_FOUND,
            SubscriptionError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error_response(self)
    }
}

#[tracing::instrument(name = "Listing subscriptions handler", skip(db_pool))]
pub async fn handle_list_subscriptions(
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, SubscriptionError> {
    let subscriptions = list_subscriptions(&db_pool).await?;

    Ok(HttpResponse::Ok().json(subscriptions))
}

#[tracing::instrument(name = "Get subscription handler", skip(db_pool))]
pub async fn handle_get_subscription(
    subscription_id: web::Path<Uuid>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, SubscriptionError> {
    let subscription = get_subscription(&db_pool, subscription_id.into_inner())
        .await?
        .ok_or(SubscriptionError::NotFound)?;

    Ok(HttpResponse::Ok().json(subscription))
}

#[tracing::instrument(name = "Delete subscription handler", skip(db_pool))]
pub async fn handle_delete_subscription(
    subscription_id: web::Path<Uuid>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, SubscriptionError> {
    let subscription_id = subscription_id.into_inner();

    if !delete_subscription(&db_pool, subscription_id).await? {
        return Err(SubscriptionError::NotFound);
    }

    tracing::warn!("Subscription {} has been deleted", subscription_id);

    Ok(HttpResponse::NoContent().finish())
}

#[tracing::instrument(
    name = "Creating a new subscription handler",
    skip(body, db_pool, email_client, base_url),
    fields(subscription_name = %body.subscription_name)
)]
pub async fn handle_create_subscription(
    user_id: web::Path<Uuid>,
    body: web::Json<NewSubscriptionBody>,
    db_pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    base_url: web::Data<ApplicationBaseUrl>,
) -> Result<HttpResponse, SubscriptionError> {
    let now = Utc::now();
    let new_subscription =
        NewSubscription::parse(body.into_inner(), now).map_err(SubscriptionError::Validation)?;
    let creator = get_user(&db_pool, user_id.into_inner())
        .await?
        .ok_or(SubscriptionError::NotFound)?;

    let subscription = insert_subscription(&db_pool, new_subscription, &creator, now).await?;
    tracing::info!("Subscription {} has been created", subscription.id);

    // best effort, the subscription is already stored
    if let Err(err) = send_welcome_email(&email_client, &subscription, &base_url.0).await {
        tracing::error!(
            "Failed to send the welcome email for subscription {}: {:?}",
            subscription.id,
            err
        );
    }

    Ok(HttpResponse::Created().json(subscription))
}

#[tracing::instrument(name = "Update subscription handler", skip(body, db_pool))]
pub async fn handle_update_subscription(
    subscription_id: web::Path<Uuid>,
    body: web::Json<SubscriptionUpdateBody>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, SubscriptionError> {
    let now = Utc::now();
    let update =
        SubscriptionUpdate::parse(body.into_inner(), now).map_err(SubscriptionError::Validation)?;
    let subscription = get_subscription(&db_pool, subscription_id.into_inner())
        .await?
        .ok_or(SubscriptionError::NotFound)?
        .apply(update, now)
        .map_err(SubscriptionError::Validation)?;

    save_subscription(&db_pool, &subscription).await?;
    tracing::info!("Subscription {} has been updated", subscription.id);

    Ok(HttpResponse::Ok().json(subscription))
}
