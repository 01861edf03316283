pub mod config;
pub mod db;
pub mod directory_client;
pub mod domain;
pub mod email_client;
pub mod reminders;
pub mod routes;
pub mod session;
pub mod startup;
pub mod telemetry;
