use validator::validate_email;

#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize)]
pub struct UserEmail(String);

impl UserEmail {
    pub fn parse(email: String) -> Result<UserEmail, String> {
        let email = email.trim().to_lowercase();

        if !validate_email(&email) {
            return Err(format!("{} is not a valid email", email));
        }

        Ok(Self(email))
    }
}

impl AsRef<str> for UserEmail {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for UserEmail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
