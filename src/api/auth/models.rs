use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::{Role, UserRow};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: String,
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 6, max = 128, message = "Password must be at least 6 characters"))]
    pub password: String,
    pub role: Option<Role>,
}

impl RegisterRequest {
    /// Trim the name and canonicalise the email before validation
    pub fn normalized(self) -> Self {
        RegisterRequest {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            ..self
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Please provide a valid email"))]
    pub email: String,
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

/// Editable profile fields
///
/// `password` and `role` are not part of the type, so they are dropped
/// silently when a client sends them.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[validate(length(min = 2, max = 50, message = "Name must be between 2 and 50 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 32, message = "Phone number is too long"))]
    pub phone: Option<String>,
    #[validate(length(max = 255, message = "Location is too long"))]
    pub location: Option<String>,
    #[validate(length(max = 2000, message = "Bio cannot exceed 2000 characters"))]
    pub bio: Option<String>,
    pub skills: Option<Vec<String>>,
    #[validate(url(message = "Resume URL must be a valid URL"))]
    pub resume_url: Option<String>,
}

impl LoginRequest {
    pub fn normalized(self) -> Self {
        LoginRequest {
            email: self.email.trim().to_lowercase(),
            ..self
        }
    }
}

impl UpdateProfileRequest {
    /// Trim every field; blank optional fields count as not sent
    pub fn normalized(self) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        UpdateProfileRequest {
            name: self.name.map(|n| n.trim().to_string()),
            phone: clean(self.phone),
            location: clean(self.location),
            bio: clean(self.bio),
            skills: self.skills.map(|skills| {
                skills
                    .into_iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
            resume_url: clean(self.resume_url),
        }
    }
}

#[derive(Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserRow,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub message: String,
    pub user: UserRow,
}
