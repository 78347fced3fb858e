use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::User;
use crate::db::types::UserRole;

#[derive(Debug, Serialize)]
pub(crate) struct UserResponse {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) full_name: String,
    pub(crate) role: UserRole,
    pub(crate) college: Option<String>,
    pub(crate) year: Option<i32>,
    pub(crate) department: Option<String>,
    pub(crate) section: Option<i32>,
    pub(crate) is_active: bool,
}

impl UserResponse {
    pub(crate) fn from_db(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role,
            college: user.college,
            year: user.year,
            department: user.department,
            section: user.section,
            is_active: user.is_active,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct RegisterRequest {
    #[validate(email(message = "email must be a valid address"))]
    pub(crate) email: String,
    #[validate(length(min = 8, message = "password must be at least 8 characters long"))]
    pub(crate) password: String,
    #[serde(alias = "fullName", alias = "name")]
    #[validate(length(min = 1, message = "full_name must not be empty"))]
    pub(crate) full_name: String,
    #[serde(default)]
    pub(crate) college: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 8, message = "year must be between 1 and 8"))]
    pub(crate) year: Option<i32>,
    #[serde(default)]
    pub(crate) department: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 5, message = "section must be between 1 and 5"))]
    pub(crate) section: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    pub(crate) email: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub(crate) struct AdminUserUpdate {
    #[serde(default)]
    #[serde(alias = "fullName")]
    #[validate(length(min = 1, message = "full_name must not be empty"))]
    pub(crate) full_name: Option<String>,
    #[serde(default)]
    pub(crate) role: Option<UserRole>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    pub(crate) is_active: Option<bool>,
    #[serde(default)]
    pub(crate) college: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 8, message = "year must be between 1 and 8"))]
    pub(crate) year: Option<i32>,
    #[serde(default)]
    pub(crate) department: Option<String>,
    #[serde(default)]
    #[validate(range(min = 1, max = 5, message = "section must be between 1 and 5"))]
    pub(crate) section: Option<i32>,
}
