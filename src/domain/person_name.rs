use unicode_segmentation::UnicodeSegmentation;

const MAX_NAME_LENGTH: usize = 128;
const FORBIDDEN_CHARS: [char; 9] = ['/', '{', '}', '"', '>', '<', '\\', '(', ')'];

/// First or last name of a user, as shown in reminder emails.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PersonName(String);

impl PersonName {
    pub fn parse(name: String) -> Result<PersonName, String> {
        let is_empty_or_whitespace = name.trim().is_empty();
        let is_too_long = name.graphemes(true).count() > MAX_NAME_LENGTH;
        let contains_forbidden_chars = name.chars().any(|c| FORBIDDEN_CHARS.contains(&c));

        if is_empty_or_whitespace || is_too_long || contains_forbidden_chars {
            return Err(format!("{} is not a valid name", name));
        }

        Ok(Self(name))
    }
}

impl AsRef<str> for PersonName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
