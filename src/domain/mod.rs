pub mod new_subscription;
pub mod person_name;
pub mod stakeholders;
pub mod subscription;
pub mod subscription_name;
pub mod user;
pub mod user_email;
