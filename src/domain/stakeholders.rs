use crate::domain::user_email::UserEmail;

/// Parses the stakeholder list sent by clients: emails separated by whitespace or commas.
/// Duplicates are dropped, first occurrence wins.
pub fn parse_stakeholders(users: &str) -> Result<Vec<UserEmail>, String> {
    let mut stakeholders: Vec<UserEmail> = Vec::new();

    for raw in users.split(|c: char| c.is_whitespace() || c == ',') {
        if raw.is_empty() {
            continue;
        }

        let email = UserEmail::parse(raw.to_string())?;
        if !stakeholders.contains(&email) {
            stakeholders.push(email);
        }
    }

    if stakeholders.is_empty() {
        return Err(String::from("At least one stakeholder email is required"));
    }

    Ok(stakeholders)
}
