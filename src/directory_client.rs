use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use serde_aux::field_attributes::deserialize_string_from_number;
use std::time;

use crate::domain::person_name::PersonName;
use crate::domain::user::NewUser;
use crate::domain::user_email::UserEmail;

/// Client for the corporate directory that owns user credentials.
#[derive(Clone)]
pub struct DirectoryClient {
    http_client: Client,
    base_url: String,
}

#[derive(Deserialize, Debug)]
struct DirectoryResponse {
    // The directory answers with either "200" or 200.
    #[serde(deserialize_with = "deserialize_string_from_number")]
    status_code: String,
    data: Option<DirectoryProfile>,
    msg: Option<String>,
}

#[derive(Deserialize, Debug)]
struct DirectoryProfile {
    mail: String,
    firstname: String,
    surname: String,
}

#[derive(thiserror::Error, Debug)]
pub enum DirectoryError {
    #[error("The directory rejected the credentials.")]
    InvalidCredentials,
    #[error("The directory answered with status {status_code}: {message}")]
    Rejected { status_code: String, message: String },
    #[error("The directory is not reachable.")]
    Unavailable(#[from] reqwest::Error),
    #[error("The directory returned an invalid profile: {0}")]
    InvalidProfile(String),
}

impl DirectoryClient {
    pub fn new(base_url: String, timeout: time::Duration) -> Result<DirectoryClient, reqwest::Error> {
        let http_client = Client::builder().timeout(timeout).build()?;

        Ok(DirectoryClient {
            http_client,
            base_url,
        })
    }

    #[tracing::instrument(name = "Authenticating against the directory", skip(self, password))]
    pub async fn authenticate(
        &self,
        username: &str,
        password: &Secret<String>,
    ) -> Result<NewUser, DirectoryError> {
        let url = format!("{}/auth/detail", self.base_url);
        let response: DirectoryResponse = self
            .http_client
            .post(&url)
            .form(&[("username", username), ("password", password.expose_secret().as_str())])
            .send()
            .await?
            .json()
            .await?;

        match (response.status_code.as_str(), response.data) {
            ("200", Some(profile)) => Ok(NewUser {
                email: UserEmail::parse(profile.mail).map_err(DirectoryError::InvalidProfile)?,
                first_name: PersonName::parse(profile.firstname)
                    .map_err(DirectoryError::InvalidProfile)?,
                last_name: PersonName::parse(profile.surname)
                    .map_err(DirectoryError::InvalidProfile)?,
            }),
            ("200", None) => Err(DirectoryError::InvalidProfile(String::from(
                "missing profile data",
            ))),
            ("404", _) => Err(DirectoryError::InvalidCredentials),
            (status_code, _) => Err(DirectoryError::Rejected {
                status_code: status_code.to_string(),
                message: response.msg.unwrap_or_default(),
            }),
        }
    }
}
