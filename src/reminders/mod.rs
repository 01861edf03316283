pub mod cadence;
pub mod job;
pub mod mailer;
