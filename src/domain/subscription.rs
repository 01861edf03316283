use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::stakeholders::parse_stakeholders;
use crate::domain::subscription_name::SubscriptionName;
use crate::domain::user_email::UserEmail;
use crate::reminders::cadence::parse_timestamp;

#[derive(Debug, Clone, serde::Serialize)]
pub struct Subscription {
    pub id: Uuid,
    pub subscription_name: SubscriptionName,
    pub subscription_status: bool,
    pub start_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub last_notification: Option<DateTime<Utc>>,
    pub created_by: Uuid,
    #[serde(skip)]
    pub creator_email: UserEmail,
    pub users: Vec<UserEmail>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields a client is allowed to change on a subscription.
/// `last_notification` is owned by the reminder scheduler and cannot be patched.
#[derive(Deserialize, Debug)]
pub struct SubscriptionUpdateBody {
    pub subscription_name: Option<String>,
    pub subscription_status: Option<bool>,
    pub start_date: Option<String>,
    pub expiry_date: Option<String>,
    pub users: Option<String>,
}

#[derive(Debug, Default)]
pub struct SubscriptionUpdate {
    pub subscription_name: Option<SubscriptionName>,
    pub subscription_status: Option<bool>,
    pub start_date: Option<DateTime<Utc>>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub users: Option<Vec<UserEmail>>,
}

impl SubscriptionUpdate {
    pub fn parse(body: SubscriptionUpdateBody, now: DateTime<Utc>) -> Result<Self, String> {
        let start_date = body
            .start_date
            .map(|value| parse_timestamp("start_date", &value))
            .transpose()
            .map_err(|err| err.to_string())?;
        let expiry_date = body
            .expiry_date
            .map(|value| parse_timestamp("expiry_date", &value))
            .transpose()
            .map_err(|err| err.to_string())?;

        if let Some(expiry_date) = expiry_date {
            if expiry_date <= now {
                return Err(format!("Expiry date {} is not in the future", expiry_date));
            }
        }

        Ok(SubscriptionUpdate {
            subscription_name: body.subscription_name.map(SubscriptionName::parse).transpose()?,
            subscription_status: body.subscription_status,
            start_date,
            expiry_date,
            users: body.users.as_deref().map(parse_stakeholders).transpose()?,
        })
    }
}

impl Subscription {
    /// Merges an update into the subscription, validating the merged dates.
    pub fn apply(self, update: SubscriptionUpdate, now: DateTime<Utc>) -> Result<Self, String> {
        let merged = Subscription {
            subscription_name: update.subscription_name.unwrap_or(self.subscription_name),
            subscription_status: update
                .subscription_status
                .unwrap_or(self.subscription_status),
            start_date: update.start_date.unwrap_or(self.start_date),
            expiry_date: update.expiry_date.unwrap_or(self.expiry_date),
            users: update.users.unwrap_or(self.users),
            updated_at: now,
            ..self
        };

        if merged.start_date > merged.expiry_date {
            return Err(String::from("Start date must not be after the expiry date"));
        }

        Ok(merged)
    }

    /// Everyone who should hear about this subscription: stakeholders first, then the creator.
    pub fn recipients(&self) -> Vec<UserEmail> {
        let mut recipients = self.users.clone();

        if !recipients.contains(&self.creator_email) {
            recipients.push(self.creator_email.clone());
        }

        recipients
    }
}
