use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::db::StoreError;
use crate::domain::person_name::PersonName;
use crate::domain::user::{NewUser, User};
use crate::domain::user_email::UserEmail;

#[derive(sqlx::FromRow)]
struct UserRecord {
    id: Uuid,
    email: String,
    first_name: String,
    last_name: String,
}

impl TryFrom<UserRecord> for User {
    type Error = StoreError;

    fn try_from(record: UserRecord) -> Result<Self, Self::Error> {
        let invalid = |reason: String| StoreError::InvalidRecord {
            id: record.id,
            reason,
        };

        Ok(User {
            id: record.id,
            email: UserEmail::parse(record.email.clone()).map_err(invalid)?,
            first_name: PersonName::parse(record.first_name.clone()).map_err(invalid)?,
            last_name: PersonName::parse(record.last_name.clone()).map_err(invalid)?,
        })
    }
}

#[tracing::instrument(name = "Fetching all users", skip(db_pool))]
pub async fn list_users(db_pool: &PgPool) -> Result<Vec<User>, StoreError> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, email, first_name, last_name
        FROM users
        ORDER BY created_at
        "#,
    )
    .fetch_all(db_pool)
    .await?
    .into_iter()
    .map(User::try_from)
    .collect()
}

#[tracing::instrument(name = "Fetching a user by id", skip(db_pool))]
pub async fn get_user(db_pool: &PgPool, user_id: Uuid) -> Result<Option<User>, StoreError> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, email, first_name, last_name
        FROM users
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(db_pool)
    .await?
    .map(User::try_from)
    .transpose()
}

#[tracing::instrument(name = "Fetching a user by email", skip(db_pool), fields(email = %email))]
pub async fn get_user_by_email(
    db_pool: &PgPool,
    email: &UserEmail,
) -> Result<Option<User>, StoreError> {
    sqlx::query_as::<_, UserRecord>(
        r#"
        SELECT id, email, first_name, last_name
        FROM users
        WHERE email = $1
        "#,
    )
    .bind(email.as_ref())
    .fetch_optional(db_pool)
    .await?
    .map(User::try_from)
    .transpose()
}

#[tracing::instrument(
    name = "Insert a new user into the database",
    skip(db_pool, new_user),
    fields(email = %new_user.email)
)]
pub async fn insert_user(
    db_pool: &PgPool,
    new_user: NewUser,
    now: DateTime<Utc>,
) -> Result<User, StoreError> {
    let id = Uuid::new_v4();

    sqlx::query(
        r#"
        INSERT INTO users (id, email, first_name, last_name, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $5)
        "#,
    )
    .bind(id)
    .bind(new_user.email.as_ref())
    .bind(new_user.first_name.as_ref())
    .bind(new_user.last_name.as_ref())
    .bind(now)
    .execute(db_pool)
    .await?;

    Ok(User {
        id,
        email: new_user.email,
        first_name: new_user.first_name,
        last_name: new_user.last_name,
    })
}

#[tracing::instrument(name = "Saving user changes", skip(db_pool, user), fields(user_id = %user.id))]
pub async fn save_user(db_pool: &PgPool, user: &User, now: DateTime<Utc>) -> Result<(), StoreError> {
    sqlx::query(
        r#"
        UPDATE users
        SET first_name = $2, last_name = $3, updated_at = $4
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .bind(user.first_name.as_ref())
    .bind(user.last_name.as_ref())
    .bind(now)
    .execute(db_pool)
    .await?;

    Ok(())
}

/// Returns false when the user did not exist. Subscriptions created by the user go with it.
#[tracing::instrument(name = "Deleting a user", skip(db_pool))]
pub async fn delete_user(db_pool: &PgPool, user_id: Uuid) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(user_id)
        .execute(db_pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
