use serde::{Deserialize, Serialize};

use super::repo_types::User;

/// Request body for user registration. Missing fields deserialize as empty and
/// are rejected by validation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegisterRequest {
    pub name: String,
    pub nick_name: String,
    pub school_number: String,
    pub password: String,
}

/// Request body for login.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginRequest {
    pub school_number: String,
    pub password: String,
}

/// Request body for token refresh.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: PublicUser,
}

/// Response returned after login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
    pub refresh_token: String,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i64,
    pub name: String,
    pub nick_name: String,
    pub school_number: String,
    pub points: i64,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            name: u.name,
            nick_name: u.nick_name,
            school_number: u.school_number,
            points: u.points,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    #[test]
    fn public_user_never_carries_hash() {
        let user = User {
            id: 1,
            name: "Kim".into(),
            nick_name: "k1".into(),
            school_number: "2021001".into(),
            password_hash: "$argon2id$v=19$secret-material".into(),
            points: 0,
            created_at: OffsetDateTime::now_utc(),
        };
        let raw = serde_json::to_string(&user).unwrap();
        assert!(!raw.contains("argon2"));

        let json = serde_json::to_string(&PublicUser::from(user)).unwrap();
        assert!(json.contains("\"schoolNumber\":\"2021001\""));
        assert!(json.contains("\"nickName\":\"k1\""));
        assert!(!json.contains("argon2"));
    }

    #[test]
    fn register_request_tolerates_missing_fields() {
        let req: RegisterRequest = serde_json::from_str(r#"{"name":"Kim"}"#).unwrap();
        assert_eq!(req.name, "Kim");
        assert!(req.password.is_empty());
    }
}
