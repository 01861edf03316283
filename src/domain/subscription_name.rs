use unicode_segmentation::UnicodeSegmentation;

const MAX_NAME_LENGTH: usize = 1024;

#[derive(Debug, Clone, serde::Serialize)]
pub struct SubscriptionName(String);

impl SubscriptionName {
    pub fn parse(name: String) -> Result<SubscriptionName, String> {
        let name = name.trim().to_string();

        if name.is_empty() {
            return Err(String::from("Subscription name cannot be empty"));
        }

        if name.graphemes(true).count() > MAX_NAME_LENGTH {
            return Err(format!(
                "Subscription name is longer than {} characters",
                MAX_NAME_LENGTH
            ));
        }

        Ok(Self(name))
    }
}

impl AsRef<str> for SubscriptionName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
