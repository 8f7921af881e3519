use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

// -- Auth --

/// Fields are optional so that a missing field is reported per-field
/// instead of rejecting the whole body.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password1: Option<String>,
    #[serde(default)]
    pub password2: Option<String>,
}

/// Either `username` or `email` identifies the account.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Returned by both registration and login.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserDetailsResponse {
    pub pk: i64,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailResponse {
    pub detail: String,
}

// -- Messages --

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateMessageRequest {
    #[serde(default)]
    pub content: Option<String>,
}

/// A wall post as seen by clients. `user` is the author's username.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: i64,
    pub user: String,
    pub content: String,
    #[serde(serialize_with = "serialize_micros")]
    pub created_at: DateTime<Utc>,
}

/// Always six fractional digits, e.g. `2024-05-01T12:00:00.120000Z`.
fn serialize_micros<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Micros, true))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn created_at_json(micros: i64) -> serde_json::Value {
        let base = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let message = MessageResponse {
            id: 1,
            user: "testuser".into(),
            content: "hi".into(),
            created_at: base + Duration::microseconds(micros),
        };
        serde_json::to_value(&message).unwrap()["created_at"].clone()
    }

    #[test]
    fn created_at_has_fixed_microsecond_width() {
        assert_eq!(created_at_json(0), "2024-05-01T12:00:00.000000Z");
        assert_eq!(created_at_json(120_000), "2024-05-01T12:00:00.120000Z");
        assert_eq!(created_at_json(123_456), "2024-05-01T12:00:00.123456Z");
    }

    #[test]
    fn created_at_reads_back() {
        let json = serde_json::json!({
            "id": 3,
            "user": "testuser",
            "content": "hi",
            "created_at": "2024-05-01T12:00:00.120000Z",
        });
        let message: MessageResponse = serde_json::from_value(json).unwrap();
        assert_eq!(message.created_at.timestamp_subsec_micros(), 120_000);
    }
}
