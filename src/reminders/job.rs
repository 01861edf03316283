use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

use crate::db::StoreError;
use crate::domain::subscription::Subscription;
use crate::reminders::cadence::{evaluate, Decision};

#[derive(thiserror::Error, Debug)]
pub enum MailError {
    #[error("Failed to send a reminder email.")]
    Delivery(#[from] reqwest::Error),
}

/// A row of the active listing. Rows that cannot be read fail on their own.
pub type ListedSubscription = Result<Subscription, StoreError>;

/// Storage the reminder batch reads from and writes to.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    async fn list_active_subscriptions(&self) -> Result<Vec<ListedSubscription>, StoreError>;

    async fn update_last_notification(
        &self,
        subscription_id: Uuid,
        notified_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

#[async_trait]
pub trait ReminderMailer: Send + Sync {
    async fn send_reminder(
        &self,
        subscription: &Subscription,
        now: DateTime<Utc>,
    ) -> Result<(), MailError>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub evaluated: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(thiserror::Error, Debug)]
enum ReminderFailure {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Mail(#[from] MailError),
}

/// Evaluates every active subscription once. A failing subscription is logged and counted,
/// it never stops the rest of the batch.
#[tracing::instrument(name = "Running a reminder batch", skip(store, mailer))]
pub async fn run_reminder_batch(
    store: &dyn SubscriptionStore,
    mailer: &dyn ReminderMailer,
    now: DateTime<Utc>,
) -> Result<BatchReport, StoreError> {
    let subscriptions = store.list_active_subscriptions().await?;
    let mut report = BatchReport::default();

    for listed in subscriptions {
        report.evaluated += 1;

        let subscription = match listed {
            Ok(subscription) => subscription,
            Err(err) => {
                report.failed += 1;
                tracing::error!("Failed to read an active subscription: {:?}", err);
                continue;
            }
        };

        match remind(store, mailer, &subscription, now).await {
            Ok(Decision::Send { .. }) => report.sent += 1,
            Ok(Decision::Skip) => report.skipped += 1,
            Err(err) => {
                report.failed += 1;
                tracing::error!(
                    subscription_id = %subscription.id,
                    "Failed to process reminder: {:?}",
                    err
                );
            }
        }
    }

    tracing::info!(
        evaluated = report.evaluated,
        sent = report.sent,
        skipped = report.skipped,
        failed = report.failed,
        "Reminder batch finished"
    );

    Ok(report)
}

#[tracing::instrument(
    name = "Evaluating a subscription reminder",
    skip(store, mailer, subscription),
    fields(
        subscription_id = %subscription.id,
        expiry_date = %subscription.expiry_date
    )
)]
async fn remind(
    store: &dyn SubscriptionStore,
    mailer: &dyn ReminderMailer,
    subscription: &Subscription,
    now: DateTime<Utc>,
) -> Result<Decision, ReminderFailure> {
    if subscription
        .last_notification
        .map_or(false, |last_notification| last_notification > now)
    {
        tracing::warn!("Last notification is later than the evaluation time");
    }

    let decision = evaluate(now, subscription.expiry_date, subscription.last_notification);

    if let Decision::Send {
        new_last_notification,
    } = decision
    {
        // Stored before sending: a failed write leaves the reminder due for the next tick.
        store
            .update_last_notification(subscription.id, new_last_notification)
            .await?;
        mailer.send_reminder(subscription, now).await?;
    }

    Ok(decision)
}

/// Runs a reminder batch every `period`, starting immediately. Ticks never overlap: a slow
/// batch delays the next one and missed ticks are dropped. `period` must be non-zero, see
/// `ReminderSettings::get_period`.
pub fn spawn_reminder_scheduler(
    store: Arc<dyn SubscriptionStore>,
    mailer: Arc<dyn ReminderMailer>,
    period: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            interval.tick().await;

            if let Err(err) = run_reminder_batch(store.as_ref(), mailer.as_ref(), Utc::now()).await
            {
                tracing::warn!("Reminder batch could not list subscriptions: {:?}", err);
            }
        }
    })
}
