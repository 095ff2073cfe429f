use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub clan: Option<String>,
    #[serde(rename = "userId", default)]
    pub user_id: Option<i64>,
}

impl LoginResponse {
    /// The issued token, if the login succeeded and actually carried one.
    pub fn issued_token(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.token.as_deref().filter(|t| !t.is_empty())
    }
}

/// The backend's user record, kept exactly as received.
///
/// The client never rejects a profile for its shape. The accessors read the
/// fields the UI knows about and return `None` when a field is missing or
/// holds an unexpected type.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct UserProfile(Value);

impl From<Value> for UserProfile {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl UserProfile {
    /// Raw field lookup
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    fn text(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
    }

    /// `true`/`false`, or a number where zero is false
    fn flag(&self, key: &str) -> Option<bool> {
        match self.get(key)? {
            Value::Bool(b) => Some(*b),
            Value::Number(n) => n.as_f64().map(|n| n != 0.0),
            _ => None,
        }
    }

    fn timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(self.text(key)?)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    }

    /// The id as text, whether the backend sends a number or a string
    pub fn id(&self) -> Option<String> {
        match self.get("id")? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.text("email")
    }

    pub fn clan(&self) -> Option<&str> {
        self.text("clan")
    }

    pub fn timezone(&self) -> Option<&str> {
        self.text("timezone")
    }

    pub fn is_admin(&self) -> bool {
        self.flag("isAdmin").unwrap_or(false)
    }

    pub fn is_active(&self) -> Option<bool> {
        self.flag("isActive")
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.timestamp("created")
    }

    pub fn last_login(&self) -> Option<DateTime<Utc>> {
        self.timestamp("lastLogin")
    }

    /// Name to show in the title bar
    pub fn display_name(&self) -> &str {
        self.email().or(self.clan()).unwrap_or("signed in")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_parse_user_profile() {
        let json = r#"{"id":7,"email":"a@b.com","clan":"0138","isActive":true,"isAdmin":false,"created":"2024-01-02T03:04:05Z","lastLogin":"2024-06-01T12:00:00Z","timezone":"America/Chicago"}"#;
        let user: UserProfile = serde_json::from_str(json).expect("profile should parse");
        assert_eq!(user.id().as_deref(), Some("7"));
        assert_eq!(user.email(), Some("a@b.com"));
        assert_eq!(user.clan(), Some("0138"));
        assert!(!user.is_admin());
        assert_eq!(user.is_active(), Some(true));
        assert_eq!(user.timezone(), Some("America/Chicago"));
        assert_eq!(user.last_login().map(|t| t.to_rfc3339()).as_deref(), Some("2024-06-01T12:00:00+00:00"));
        assert!(user.created().is_some());
    }

    #[test]
    fn test_parse_user_profile_any_shape() {
        let user: UserProfile = serde_json::from_str(r#"{"nickname":"otto"}"#).expect("profile should parse");
        assert_eq!(user.email(), None);
        assert_eq!(user.get("nickname"), Some(&json!("otto")));
        assert_eq!(user.display_name(), "signed in");
    }

    #[test]
    fn test_unexpected_field_types_are_accepted() {
        let json = r#"{"id":"u-1","email":"a@b.com","isAdmin":1,"isActive":"yes","created":12345,"lastLogin":"yesterday","timezone":null}"#;
        let user: UserProfile = serde_json::from_str(json).expect("profile should parse");
        assert_eq!(user.id().as_deref(), Some("u-1"));
        assert_eq!(user.email(), Some("a@b.com"));
        assert!(user.is_admin());
        assert_eq!(user.is_active(), None);
        assert_eq!(user.created(), None);
        assert_eq!(user.last_login(), None);
        assert_eq!(user.timezone(), None);
    }

    #[test]
    fn test_non_object_profile_is_kept() {
        let user: UserProfile = serde_json::from_str(r#"["a@b.com"]"#).expect("profile should parse");
        assert_eq!(user.email(), None);
        assert_eq!(user.as_value(), &json!(["a@b.com"]));
        assert_eq!(user.display_name(), "signed in");
    }

    #[test]
    fn test_display_name_fallbacks() {
        assert_eq!(UserProfile::from(json!({"clan": "0138"})).display_name(), "0138");
        assert_eq!(UserProfile::from(json!({"email": "", "clan": "0138"})).display_name(), "0138");
        assert_eq!(
            UserProfile::from(json!({"email": "a@b.com", "clan": "0138"})).display_name(),
            "a@b.com"
        );
    }

    #[test]
    fn test_issued_token() {
        let ok = LoginResponse {
            success: true,
            token: Some("T1".to_string()),
            ..Default::default()
        };
        assert_eq!(ok.issued_token(), Some("T1"));

        let empty = LoginResponse {
            success: true,
            token: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(empty.issued_token(), None);

        let failed = LoginResponse {
            success: false,
            token: Some("T1".to_string()),
            message: Some("bad credentials".to_string()),
            ..Default::default()
        };
        assert_eq!(failed.issued_token(), None);
    }

    #[test]
    fn test_parse_login_response() {
        let json = r#"{"success":true,"token":"abc","clan":"0138","userId":3}"#;
        let resp: LoginResponse = serde_json::from_str(json).expect("login response should parse");
        assert!(resp.success);
        assert_eq!(resp.user_id, Some(3));
        assert_eq!(resp.message, None);
    }
}
