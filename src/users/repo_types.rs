use serde::Serialize;
use sqlx::FromRow;
use time::OffsetDateTime;

use crate::auth::password::Credential;

/// User record in the database.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub bio: String,
    #[serde(skip_serializing)]
    #[sqlx(rename = "password_hash")]
    pub credential: Credential, // never exposed in JSON
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Profile change applied to the locked row by `User::update_profile`.
/// Absent fields keep their stored value.
#[derive(Debug, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub bio: Option<String>,
    pub credential: Option<Credential>,
}

impl UserPatch {
    pub fn changes_password(&self) -> bool {
        self.credential.is_some()
    }

    pub fn apply(self, user: &mut User) {
        if let Some(email) = self.email {
            user.email = email;
        }
        if let Some(bio) = self.bio {
            user.bio = bio;
        }
        if let Some(credential) = self.credential {
            user.credential = credential;
        }
    }
}

/// A user that has not been inserted yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub bio: String,
    pub credential: Credential,
}
