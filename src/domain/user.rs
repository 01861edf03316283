use serde::Deserialize;
use uuid::Uuid;

use crate::domain::person_name::PersonName;
use crate::domain::user_email::UserEmail;

#[derive(Debug, Clone, serde::Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: UserEmail,
    pub first_name: PersonName,
    pub last_name: PersonName,
}

/// A user known to the directory but not stored yet.
#[derive(Debug)]
pub struct NewUser {
    pub email: UserEmail,
    pub first_name: PersonName,
    pub last_name: PersonName,
}

/// Fields a client is allowed to change on a user. Anything else in the body is ignored.
#[derive(Deserialize, Debug)]
pub struct UserUpdateBody {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Default)]
pub struct UserUpdate {
    pub first_name: Option<PersonName>,
    pub last_name: Option<PersonName>,
}

impl TryFrom<UserUpdateBody> for UserUpdate {
    type Error = String;

    fn try_from(body: UserUpdateBody) -> Result<Self, Self::Error> {
        let first_name = body.first_name.map(PersonName::parse).transpose()?;
        let last_name = body.last_name.map(PersonName::parse).transpose()?;

        Ok(UserUpdate {
            first_name,
            last_name,
        })
    }
}

impl User {
    pub fn apply(self, update: UserUpdate) -> User {
        User {
            first_name: update.first_name.unwrap_or(self.first_name),
            last_name: update.last_name.unwrap_or(self.last_name),
            ..self
        }
    }
}
