use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::db::StoreError;
use crate::domain::new_subscription::NewSubscription;
use crate::domain::subscription::Subscription;
use crate::domain::subscription_name::SubscriptionName;
use crate::domain::user::User;
use crate::domain::user_email::UserEmail;
use crate::reminders::job::{ListedSubscription, SubscriptionStore};

const SELECT_SUBSCRIPTIONS: &str = r#"
    SELECT s.id, s.subscription_name, s.subscription_status, s.start_date, s.expiry_date,
        s.last_notification, s.created_by, u.email AS creator_email,
        COALESCE(
            array_agg(st.email ORDER BY st.email) FILTER (WHERE st.email IS NOT NULL),
            '{}'
        ) AS users,
        s.created_at, s.updated_at
    FROM subscriptions s
    JOIN users u ON u.id = s.created_by
    LEFT JOIN subscription_stakeholders st ON st.subscription_id = s.id
"#;

const GROUP_SUBSCRIPTIONS: &str = r#"
    GROUP BY s.id, u.email
    ORDER BY s.expiry_date
"#;

#[derive(sqlx::FromRow)]
struct SubscriptionRecord {
    id: Uuid,
    subscription_name: String,
    subscription_status: bool,
    start_date: DateTime<Utc>,
    expiry_date: DateTime<Utc>,
    last_notification: Option<DateTime<Utc>>,
    created_by: Uuid,
    creator_email: String,
    users: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<SubscriptionRecord> for Subscription {
    type Error = StoreError;

    fn try_from(record: SubscriptionRecord) -> Result<Self, Self::Error> {
        let id = record.id;
        let invalid = |reason: String| StoreError::InvalidRecord { id, reason };

        let users = record
            .users
            .into_iter()
            .map(UserEmail::parse)
            .collect::<Result<Vec<_>, _>>()
            .map_err(invalid)?;

        Ok(Subscription {
            id,
            subscription_name: SubscriptionName::parse(record.subscription_name).map_err(invalid)?,
            subscription_status: record.subscription_status,
            start_date: record.start_date,
            expiry_date: record.expiry_date,
            last_notification: record.last_notification,
            created_by: record.created_by,
            creator_email: UserEmail::parse(record.creator_email).map_err(invalid)?,
            users,
            created_at: record.created_at,
            updated_at: record.updated_at,
        })
    }
}

async fn fetch_subscriptions(
    db_pool: &PgPool,
    filter: &str,
    subscription_id: Option<Uuid>,
) -> Result<Vec<ListedSubscription>, StoreError> {
    let sql = format!("{} {} {}", SELECT_SUBSCRIPTIONS, filter, GROUP_SUBSCRIPTIONS);
    let mut query = sqlx::query_as::<_, SubscriptionRecord>(&sql);

    if let Some(subscription_id) = subscription_id {
        query = query.bind(subscription_id);
    }

    Ok(query
        .fetch_all(db_pool)
        .await?
        .into_iter()
        .map(Subscription::try_from)
        .collect())
}

/// Lists every subscription. Rows that cannot be read are logged and left out.
#[tracing::instrument(name = "Fetching all subscriptions", skip(db_pool))]
pub async fn list_subscriptions(db_pool: &PgPool) -> Result<Vec<Subscription>, StoreError> {
    let subscriptions = fetch_subscriptions(db_pool, "", None)
        .await?
        .into_iter()
        .filter_map(|listed| match listed {
            Ok(subscription) => Some(subscription),
            Err(err) => {
                tracing::error!("Skipping unreadable subscription: {:?}", err);
                None
            }
        })
        .collect();

    Ok(subscriptions)
}

#[tracing::instrument(name = "Fetching active subscriptions", skip(db_pool))]
pub async fn list_active_subscriptions(
    db_pool: &PgPool,
) -> Result<Vec<ListedSubscription>, StoreError> {
    fetch_subscriptions(db_pool, "WHERE s.subscription_status", None).await
}

#[tracing::instrument(name = "Fetching a subscription by id", skip(db_pool))]
pub async fn get_subscription(
    db_pool: &PgPool,
    subscription_id: Uuid,
) -> Result<Option<Subscription>, StoreError> {
    fetch_subscriptions(db_pool, "WHERE s.id = $1", Some(subscription_id))
        .await?
        .into_iter()
        .next()
        .transpose()
}

#[tracing::instrument(
    name = "Insert a new subscription into the database",
    skip(db_pool, new_subscription, creator),
    fields(
        subscription_name = %new_subscription.subscription_name.as_ref(),
        created_by = %creator.id
    )
)]
pub async fn insert_subscription(
    db_pool: &PgPool,
    new_subscription: NewSubscription,
    creator: &User,
    now: DateTime<Utc>,
) -> Result<Subscription, StoreError> {
    let id = Uuid::new_v4();
    let mut transaction = db_pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO subscriptions (id, subscription_name, subscription_status, start_date,
            expiry_date, last_notification, created_by, created_at, updated_at)
        VALUES ($1, $2, TRUE, $3, $4, NULL, $5, $6, $6)
        "#,
    )
    .bind(id)
    .bind(new_subscription.subscription_name.as_ref())
    .bind(new_subscription.start_date)
    .bind(new_subscription.expiry_date)
    .bind(creator.id)
    .bind(now)
    .execute(&mut transaction)
    .await?;

    replace_stakeholders(&mut transaction, id, &new_subscription.users).await?;
    transaction.commit().await?;

    Ok(Subscription {
        id,
        subscription_name: new_subscription.subscription_name,
        subscription_status: true,
        start_date: new_subscription.start_date,
        expiry_date: new_subscription.expiry_date,
        last_notification: None,
        created_by: creator.id,
        creator_email: creator.email.clone(),
        users: new_subscription.users,
        created_at: now,
        updated_at: now,
    })
}

/// Persists the client-editable fields of a subscription. `last_notification` is left alone.
#[tracing::instrument(
    name = "Saving subscription changes",
    skip(db_pool, subscription),
    fields(subscription_id = %subscription.id)
)]
pub async fn save_subscription(
    db_pool: &PgPool,
    subscription: &Subscription,
) -> Result<(), StoreError> {
    let mut transaction = db_pool.begin().await?;

    sqlx::query(
        r#"
        UPDATE subscriptions
        SET subscription_name = $2, subscription_status = $3, start_date = $4,
            expiry_date = $5, updated_at = $6
        WHERE id = $1
        "#,
    )
    .bind(subscription.id)
    .bind(subscription.subscription_name.as_ref())
    .bind(subscription.subscription_status)
    .bind(subscription.start_date)
    .bind(subscription.expiry_date)
    .bind(subscription.updated_at)
    .execute(&mut transaction)
    .await?;

    replace_stakeholders(&mut transaction, subscription.id, &subscription.users).await?;
    transaction.commit().await?;

    Ok(())
}

async fn replace_stakeholders(
    transaction: &mut Transaction<'_, Postgres>,
    subscription_id: Uuid,
    users: &[UserEmail],
) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM subscription_stakeholders WHERE subscription_id = $1")
        .bind(subscription_id)
        .execute(&mut *transaction)
        .await?;

    let emails: Vec<String> = users.iter().map(|email| email.as_ref().to_string()).collect();

    sqlx::query(
        r#"
        INSERT INTO subscription_stakeholders (subscription_id, email)
        SELECT $1, email FROM UNNEST($2::text[]) AS email
        "#,
    )
    .bind(subscription_id)
    .bind(emails)
    .execute(&mut *transaction)
    .await?;

    Ok(())
}

#[tracing::instrument(name = "Deleting a subscription", skip(db_pool))]
pub async fn delete_subscription(
    db_pool: &PgPool,
    subscription_id: Uuid,
) -> Result<bool, StoreError> {
    let result = sqlx::query("DELETE FROM subscriptions WHERE id = $1")
        .bind(subscription_id)
        .execute(db_pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Stamps the reminder time. Never moves `last_notification` backwards.
#[tracing::instrument(name = "Updating the last notification of a subscription", skip(db_pool))]
pub async fn update_last_notification(
    db_pool: &PgPool,
    subscription_id: Uuid,
    notified_at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let result = sqlx::query(
        r#"
        UPDATE subscriptions
        SET last_notification = $2
        WHERE id = $1 AND (last_notification IS NULL OR last_notification <= $2)
        "#,
    )
    .bind(subscription_id)
    .bind(notified_at)
    .execute(db_pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotUpdated(subscription_id));
    }

    Ok(())
}

/// Postgres-backed storage for the reminder scheduler.
#[derive(Clone)]
pub struct PgSubscriptionStore {
    db_pool: PgPool,
}

impl PgSubscriptionStore {
    pub fn new(db_pool: PgPool) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl SubscriptionStore for PgSubscriptionStore {
    async fn list_active_subscriptions(&self) -> Result<Vec<ListedSubscription>, StoreError> {
        list_active_subscriptions(&self.db_pool).await
    }

    async fn update_last_notification(
        &self,
        subscription_id: Uuid,
        notified_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        update_last_notification(&self.db_pool, subscription_id, notified_at).await
    }
}
