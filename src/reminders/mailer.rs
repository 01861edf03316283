use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::subscription::Subscription;
use crate::email_client::EmailClient;
use crate::reminders::job::{MailError, ReminderMailer};

/// Sends reminders through the email provider, addressed to the stakeholders and the creator.
pub struct EmailReminderMailer {
    email_client: EmailClient,
    base_url: String,
}

impl EmailReminderMailer {
    pub fn new(email_client: EmailClient, base_url: String) -> Self {
        Self {
            email_client,
            base_url,
        }
    }
}

#[async_trait]
impl ReminderMailer for EmailReminderMailer {
    #[tracing::instrument(
        name = "Send a subscription reminder email",
        skip(self, subscription, now),
        fields(subscription_id = %subscription.id)
    )]
    async fn send_reminder(
        &self,
        subscription: &Subscription,
        now: DateTime<Utc>,
    ) -> Result<(), MailError> {
        let (subject, html_body) = reminder_email(subscription, &self.base_url, now);

        self.email_client
            .broadcast_email(&subscription.recipients(), &subject, &html_body)
            .await?;

        Ok(())
    }
}

pub fn reminder_email(
    subscription: &Subscription,
    base_url: &str,
    now: DateTime<Utc>,
) -> (String, String) {
    let name = subscription.subscription_name.as_ref();
    let days_left = (subscription.expiry_date - now).num_days();
    let summary = match days_left {
        0 if subscription.expiry_date <= now => format!("{} expired today", name),
        d if subscription.expiry_date <= now => {
            format!("{} expired {} day(s) ago", name, d.abs())
        }
        0 => format!("{} expires today", name),
        d => format!("{} expires in {} day(s)", name, d),
    };
    let html_body = format!(
        r#"
            <div>
                <h1>{}</h1>
                <p>Expiry date: {}</p>
                <p>Review it <a href="{}/subscriptions/{}">here</a>.</p>
            </div>
        "#,
        summary,
        subscription.expiry_date.format("%Y-%m-%d"),
        base_url,
        subscription.id
    );

    (format!("Subscription reminder: {}", summary), html_body)
}

#[tracing::instrument(
    name = "Send a welcome email for a new subscription",
    skip(email_client, subscription, base_url),
    fields(subscription_id = %subscription.id)
)]
pub async fn send_welcome_email(
    email_client: &EmailClient,
    subscription: &Subscription,
    base_url: &str,
) -> Result<(), reqwest::Error> {
    let html_body = format!(
        r#"
            <div>
                <h1>You are a stakeholder of {}</h1>
                <p>It expires on {}. You will be reminded as the expiry date gets closer.</p>
                <p>Details <a href="{}/subscriptions/{}">here</a>.</p>
            </div>
        "#,
        subscription.subscription_name.as_ref(),
        subscription.expiry_date.format("%Y-%m-%d"),
        base_url,
        subscription.id
    );

    email_client
        .broadcast_email(
            &subscription.recipients(),
            &format!(
                "New subscription tracked: {}",
                subscription.subscription_name.as_ref()
            ),
            &html_body,
        )
        .await
}
