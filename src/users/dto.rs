use serde::Deserialize;

use crate::auth::services::is_valid_email;
use crate::error::AppError;

pub const MAX_USERNAME_LEN: usize = 50;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub bio: String,
}

/// Body of `PATCH /users/me`; absent fields stay as they are.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateMeRequest {
    pub email: Option<String>,
    pub bio: Option<String>,
    pub password: Option<String>,
}

fn validate_email(email: &str) -> Result<String, AppError> {
    let email = email.trim();
    if email.is_empty() {
        return Err(AppError::validation("email is required"));
    }
    if !is_valid_email(email) {
        return Err(AppError::validation("email is not valid"));
    }
    Ok(email.to_string())
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.is_empty() {
        return Err(AppError::validation("password is required"));
    }
    Ok(())
}

impl RegisterRequest {
    /// Trim and check the request in place.
    pub fn validate(mut self) -> Result<Self, AppError> {
        self.username = self.username.trim().to_string();
        if self.username.is_empty() {
            return Err(AppError::validation("username is required"));
        }
        if self.username.chars().count() > MAX_USERNAME_LEN {
            return Err(AppError::validation(format!(
                "username must be at most {MAX_USERNAME_LEN} characters"
            )));
        }
        self.email = validate_email(&self.email)?;
        validate_password(&self.password)?;
        Ok(self)
    }
}

impl UpdateMeRequest {
    pub fn validate(mut self) -> Result<Self, AppError> {
        if let Some(email) = &self.email {
            self.email = Some(validate_email(email)?);
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(self)
    }
}
