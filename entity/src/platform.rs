use regex::Regex;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::sync::OnceLock;
use utoipa::ToSchema;

/// Conferencing platform a bot can be dispatched into.
#[derive(
    Debug, Clone, Copy, Eq, PartialEq, EnumIter, Deserialize, Serialize, DeriveActiveEnum, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "platform")]
pub enum Platform {
    #[sea_orm(string_value = "google_meet")]
    GoogleMeet,
    #[sea_orm(string_value = "teams")]
    Teams,
    #[sea_orm(string_value = "zoom")]
    Zoom,
}

fn google_meet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]{3}-[a-z]{4}-[a-z]{3}$").unwrap())
}

fn teams_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{10,15}$").unwrap())
}

fn teams_passcode_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9]{8,20}$").unwrap())
}

fn zoom_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]+$").unwrap())
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::GoogleMeet => "google_meet",
            Platform::Teams => "teams",
            Platform::Zoom => "zoom",
        }
    }

    /// Checks a user-supplied native meeting id against the platform's format:
    /// Google Meet codes look like `abc-defg-hij`, Teams ids are 10-15 digits,
    /// Zoom meeting numbers are numeric.
    pub fn validate_native_id(&self, native_id: &str) -> bool {
        match self {
            Platform::GoogleMeet => google_meet_re().is_match(native_id),
            Platform::Teams => teams_re().is_match(native_id),
            Platform::Zoom => zoom_re().is_match(native_id),
        }
    }

    /// Checks an optional passcode. Google Meet takes none; Teams passcodes are
    /// 8-20 alphanumerics; Zoom passcodes are free-form but non-empty.
    pub fn validate_passcode(&self, passcode: &str) -> bool {
        match self {
            Platform::GoogleMeet => false,
            Platform::Teams => teams_passcode_re().is_match(passcode),
            Platform::Zoom => !passcode.is_empty(),
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct PlatformParseError;

impl FromStr for Platform {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "google_meet" => Ok(Platform::GoogleMeet),
            "teams" => Ok(Platform::Teams),
            "zoom" => Ok(Platform::Zoom),
            _ => Err(PlatformParseError),
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(fmt, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_google_meet_native_id_format() {
        assert!(Platform::GoogleMeet.validate_native_id("abc-defg-hij"));
        assert!(!Platform::GoogleMeet.validate_native_id("abc-defg-hijk"));
        assert!(!Platform::GoogleMeet.validate_native_id("ABC-DEFG-HIJ"));
        assert!(!Platform::GoogleMeet.validate_native_id("abcdefghij"));
        assert!(!Platform::GoogleMeet.validate_native_id(""));
    }

    #[test]
    fn test_teams_native_id_format() {
        assert!(Platform::Teams.validate_native_id("1234567890"));
        assert!(Platform::Teams.validate_native_id("123456789012345"));
        assert!(!Platform::Teams.validate_native_id("123456789"));
        assert!(!Platform::Teams.validate_native_id("1234567890123456"));
        assert!(!Platform::Teams.validate_native_id("12345abcde"));
    }

    #[test]
    fn test_zoom_native_id_format() {
        assert!(Platform::Zoom.validate_native_id("88812345678"));
        assert!(!Platform::Zoom.validate_native_id("888-1234-5678"));
        assert!(!Platform::Zoom.validate_native_id(""));
    }

    #[test]
    fn test_passcode_validation_per_platform() {
        assert!(!Platform::GoogleMeet.validate_passcode("anything"));
        assert!(Platform::Teams.validate_passcode("Abc12345"));
        assert!(!Platform::Teams.validate_passcode("short"));
        assert!(Platform::Zoom.validate_passcode("9911"));
        assert!(!Platform::Zoom.validate_passcode(""));
    }

    #[test]
    fn test_platform_round_trips_through_from_str() {
        for platform in [Platform::GoogleMeet, Platform::Teams, Platform::Zoom] {
            assert_eq!(platform.as_str().parse::<Platform>().unwrap(), platform);
        }
        assert!("webex".parse::<Platform>().is_err());
    }
}
