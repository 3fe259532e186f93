//! Request bodies for the admin user endpoints.

use serde::Deserialize;
use utoipa::ToSchema;

/// Body of `POST /admin/users`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateParams {
    pub email: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub max_concurrent_bots: Option<i32>,
    #[serde(default)]
    pub webhook_url: Option<String>,
    #[serde(default)]
    pub webhook_secret: Option<String>,
}

/// Body of `PATCH /admin/users/{id}`; absent fields keep their value.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateParams {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub max_concurrent_bots: Option<i32>,
    /// `null` clears the webhook URL; absent leaves it untouched
    #[serde(default, deserialize_with = "deserialize_some")]
    pub webhook_url: Option<Option<String>>,
    #[serde(default, deserialize_with = "deserialize_some")]
    pub webhook_secret: Option<Option<String>>,
}

/// Distinguishes an absent field from an explicit null.
fn deserialize_some<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    Ok(Some(Option::deserialize(deserializer)?))
}

/// Body of `POST /admin/users/{id}/tokens`.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct TokenParams {
    #[serde(default)]
    pub label: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_distinguishes_null_from_absent() {
        let with_null: UpdateParams =
            serde_json::from_str(r#"{"webhook_url": null}"#).unwrap();
        assert_eq!(with_null.webhook_url, Some(None));

        let absent: UpdateParams = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.webhook_url, None);

        let set: UpdateParams =
            serde_json::from_str(r#"{"webhook_url": "https://example.com/hook"}"#).unwrap();
        assert_eq!(
            set.webhook_url,
            Some(Some("https://example.com/hook".to_string()))
        );
    }
}
