use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// User record without the password hash, as returned by profile endpoints.
#[derive(Debug, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The identity embedded next to a freshly issued token.
#[derive(Debug, Serialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub email: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub user: UserIdentity,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub phone: Option<String>,
}

const PROFILE_COLUMNS: &str = "id, email, name, avatar_url, bio, phone, created_at";

impl User {
    /// Emails are stored and compared in lowercase; case must never cause a
    /// false negative.
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(
            "SELECT id, email, password_hash, name, avatar_url, bio, phone, created_at \
             FROM users WHERE email = $1",
        )
        .bind(email.to_lowercase())
        .fetch_optional(pool)
        .await
    }

    pub async fn create(
        pool: &PgPool,
        email: &str,
        password_hash: &str,
        name: &str,
    ) -> Result<Self, sqlx::Error> {
        sqlx::query_as(
            "INSERT INTO users (id, email, password_hash, name) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, email, password_hash, name, avatar_url, bio, phone, created_at",
        )
        .bind(Uuid::new_v4())
        .bind(email.to_lowercase())
        .bind(password_hash)
        .bind(name)
        .fetch_one(pool)
        .await
    }

    pub async fn find_profile(pool: &PgPool, id: Uuid) -> Result<Option<UserProfile>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {PROFILE_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Fields absent from the request are left untouched (absence is not
    /// clearing).
    pub async fn update_profile(
        pool: &PgPool,
        id: Uuid,
        req: &UpdateProfileRequest,
    ) -> Result<Option<UserProfile>, sqlx::Error> {
        sqlx::query_as(&format!(
            "UPDATE users SET \
                name = COALESCE($2, name), \
                avatar_url = COALESCE($3, avatar_url), \
                bio = COALESCE($4, bio), \
                phone = COALESCE($5, phone) \
             WHERE id = $1 \
             RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(id)
        .bind(req.name.as_deref())
        .bind(req.avatar_url.as_deref())
        .bind(req.bio.as_deref())
        .bind(req.phone.as_deref())
        .fetch_optional(pool)
        .await
    }

    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}
