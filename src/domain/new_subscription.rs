use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::domain::stakeholders::parse_stakeholders;
use crate::domain::subscription_name::SubscriptionName;
use crate::domain::user_email::UserEmail;
use crate::reminders::cadence::parse_timestamp;

#[derive(Debug)]
pub struct NewSubscription {
    pub subscription_name: SubscriptionName,
    pub start_date: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub users: Vec<UserEmail>,
}

#[derive(Deserialize, Debug)]
pub struct NewSubscriptionBody {
    pub subscription_name: String,
    /// RFC 3339.
    pub start_date: String,
    /// RFC 3339.
    pub expiry_date: String,
    /// Stakeholder emails, space separated.
    pub users: String,
}

impl NewSubscription {
    pub fn parse(body: NewSubscriptionBody, now: DateTime<Utc>) -> Result<Self, String> {
        let subscription_name = SubscriptionName::parse(body.subscription_name)?;
        let users = parse_stakeholders(&body.users)?;
        let start_date =
            parse_timestamp("start_date", &body.start_date).map_err(|err| err.to_string())?;
        let expiry_date =
            parse_timestamp("expiry_date", &body.expiry_date).map_err(|err| err.to_string())?;

        if expiry_date <= now {
            return Err(format!("Expiry date {} is not in the future", expiry_date));
        }

        if start_date > expiry_date {
            return Err(String::from("Start date must not be after the expiry date"));
        }

        Ok(NewSubscription {
            subscription_name,
            start_date,
            expiry_date,
            users,
        })
    }
}
