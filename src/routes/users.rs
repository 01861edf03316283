use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use chrono::Utc;
use secrecy::Secret;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::users::{delete_user, get_user, get_user_by_email, insert_user, list_users, save_user};
use crate::db::StoreError;
use crate::directory_client::{DirectoryClient, DirectoryError};
use crate::domain::user::{User, UserUpdate, UserUpdateBody};
use crate::routes::{error_chain_fmt, json_error_response};
use crate::session::{generate_session_token, get_session_user, store_session};
use crate::startup::SessionTtl;

#[derive(Deserialize)]
pub struct LoginBody {
    pub username: String,
    pub password: Secret<String>,
}

#[derive(serde::Serialize)]
struct LoginResponse {
    #[serde(flatten)]
    user: User,
    session_token: String,
}

#[derive(thiserror::Error)]
pub enum UserError {
    #[error("{0}")]
    Validation(String),
    #[error("Not found")]
    NotFound,
    #[error("Authentication failed")]
    Unauthorized,
    #[error("The directory service could not authenticate the user.")]
    Directory(#[source] DirectoryError),
    #[error("Failed to access the users table.")]
    Store(#[from] StoreError),
    #[error("Failed to access the session store.")]
    Session(#[from] redis::RedisError),
}

impl std::fmt::Debug for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl From<DirectoryError> for UserError {
    fn from(err: DirectoryError) -> Self {
        match err {
            DirectoryError::InvalidCredentials => UserError::Unauthorized,
            other => UserError::Directory(other),
        }
    }
}

impl ResponseError for UserError {
    fn status_code(&self) -> StatusCode {
        match self {
            UserError::Validation(_) => StatusCode::BAD_REQUEST,
            UserError::NotFound => StatusCode::NOT_FOUND,
            UserError::Unauthorized => StatusCode::UNAUTHORIZED,
            UserError::Directory(_) => StatusCode::BAD_GATEWAY,
            UserError::Store(_) | UserError::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        json_error_response(self)
    }
}

#[tracing::instrument(name = "Listing users handler", skip(db_pool))]
pub async fn handle_list_users(db_pool: web::Data<PgPool>) -> Result<HttpResponse, UserError> {
    let users = list_users(&db_pool).await?;

    Ok(HttpResponse::Ok().json(users))
}

#[tracing::instrument(name = "Get user handler", skip(db_pool))]
pub async fn handle_get_user(
    user_id: web::Path<Uuid>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, UserError> {
    let user = get_user(&db_pool, user_id.into_inner())
        .await?
        .ok_or(UserError::NotFound)?;

    Ok(HttpResponse::Ok().json(user))
}

#[tracing::instrument(name = "Delete user handler", skip(db_pool))]
pub async fn handle_delete_user(
    user_id: web::Path<Uuid>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, UserError> {
    let user_id = user_id.into_inner();

    if !delete_user(&db_pool, user_id).await? {
        return Err(UserError::NotFound);
    }

    tracing::warn!("User {} has been deleted", user_id);

    Ok(HttpResponse::NoContent().finish())
}

#[tracing::instrument(name = "Update user handler", skip(body, db_pool))]
pub async fn handle_update_user(
    user_id: web::Path<Uuid>,
    body: web::Json<UserUpdateBody>,
    db_pool: web::Data<PgPool>,
) -> Result<HttpResponse, UserError> {
    let update = UserUpdate::try_from(body.into_inner()).map_err(UserError::Validation)?;
    let user = get_user(&db_pool, user_id.into_inner())
        .await?
        .ok_or(UserError::NotFound)?
        .apply(update);

    save_user(&db_pool, &user, Utc::now()).await?;
    tracing::info!("User {} has been updated", user.id);

    Ok(HttpResponse::Ok().json(user))
}

/// Logs a user in through the directory, creating the local user on first login.
#[tracing::instrument(
    name = "Login handler",
    skip(body, db_pool, directory_client, redis_client, session_ttl),
    fields(username = %body.username)
)]
pub async fn handle_login(
    body: web::Json<LoginBody>,
    db_pool: web::Data<PgPool>,
    directory_client: web::Data<DirectoryClient>,
    redis_client: web::Data<redis::Client>,
    session_ttl: web::Data<SessionTtl>,
) -> Result<HttpResponse, UserError> {
    let body = body.into_inner();

    if body.username.trim().is_empty() {
        return Err(UserError::Validation(String::from("Missing username")));
    }

    let profile = directory_client
        .authenticate(body.username.trim(), &body.password)
        .await?;

    let user = match get_user_by_email(&db_pool, &profile.email).await? {
        Some(user) => {
            tracing::info!("Existing user has logged in");
            user
        }
        None => {
            let user = insert_user(&db_pool, profile, Utc::now()).await?;
            tracing::info!("New user {} has been created and logged in", user.id);
            user
        }
    };

    let session_token = generate_session_token();
    store_session(&redis_client, &session_token, user.id, session_ttl.0).await?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        user,
        session_token,
    }))
}

/// Returns the user owning the bearer session token.
#[tracing::instrument(name = "Current user handler", skip(request, db_pool, redis_client))]
pub async fn handle_current_user(
    request: HttpRequest,
    db_pool: web::Data<PgPool>,
    redis_client: web::Data<redis::Client>,
) -> Result<HttpResponse, UserError> {
    let session_token = request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(UserError::Unauthorized)?;

    let user_id = get_session_user(&redis_client, session_token)
        .await?
        .ok_or(UserError::Unauthorized)?;
    let user = get_user(&db_pool, user_id)
        .await?
        .ok_or(UserError::Unauthorized)?;

    Ok(HttpResponse::Ok().json(user))
}
