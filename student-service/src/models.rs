//! Student service models
//!
//! Accounts, courses, and the request/response records exchanged with the
//! request-handling layer.

use std::collections::BTreeSet;

use auth::IdentityDescriptor;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use error::AppError;
use serde::{Deserialize, Serialize};

/// Role given to every self-registered account.
pub const DEFAULT_ROLE: &str = "USER";

const MIN_PASSWORD_LEN: usize = 8;

/// Persisted student account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub date_of_birth: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
    pub roles: Vec<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl Account {
    /// Authority strings derived from the account roles, e.g. `ROLE_USER`.
    pub fn authorities(&self) -> Vec<String> {
        self.roles.iter().map(|role| format!("ROLE_{role}")).collect()
    }

    /// Identity used for token issuance.
    pub fn identity(&self) -> IdentityDescriptor {
        IdentityDescriptor::new(self.username.clone(), self.authorities())
    }

    pub fn profile(&self) -> StudentProfile {
        StudentProfile {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
        }
    }
}

/// Public view of an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudentProfile {
    pub id: Option<i64>,
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

/// Signup payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub phone_number: Option<String>,
    pub address: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require_non_blank(&self.username, "Username can not be blank")?;
        require_non_blank(&self.first_name, "First name can not be blank")?;
        require_non_blank(&self.last_name, "Last name can not be blank")?;
        if !self.email.contains('@') {
            return Err(AppError::Validation("Email must be valid".to_string()));
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(())
    }
}

/// Login payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        require_non_blank(&self.username, "Username can not be blank")?;
        require_non_blank(&self.password, "Password can not be blank")
    }
}

/// Token handed back after signup or login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationResponse {
    pub token: String,
    /// Token lifetime in milliseconds
    pub expires_in: i64,
}

/// Course offered to students
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub student_ids: BTreeSet<i64>,
}

impl Course {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        start_date: NaiveDateTime,
        end_date: NaiveDateTime,
    ) -> Self {
        Self {
            id: None,
            name: name.into(),
            description: description.into(),
            start_date,
            end_date,
            student_ids: BTreeSet::new(),
        }
    }

    /// Enroll a student. Returns false if already enrolled.
    pub fn add_student(&mut self, student_id: i64) -> bool {
        self.student_ids.insert(student_id)
    }

    /// Drop a student. Returns false if not enrolled.
    pub fn remove_student(&mut self, student_id: i64) -> bool {
        self.student_ids.remove(&student_id)
    }

    pub fn has_student(&self, student_id: i64) -> bool {
        self.student_ids.contains(&student_id)
    }
}

/// Course creation payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateCourseRequest {
    pub name: String,
    pub description: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
}

impl CreateCourseRequest {
    /// Validate against the current time.
    pub fn validate_at(&self, now: NaiveDateTime) -> Result<(), AppError> {
        require_non_blank(&self.name, "Name can not be blank")?;
        require_non_blank(&self.description, "Description can not be blank")?;
        if self.start_date < now {
            return Err(AppError::Validation(
                "Start date must be in the present or future".to_string(),
            ));
        }
        if self.end_date <= now {
            return Err(AppError::Validation("End date must be in the future".to_string()));
        }
        if self.end_date <= self.start_date {
            return Err(AppError::Validation(
                "End date must be after start date".to_string(),
            ));
        }
        Ok(())
    }
}

/// Course together with its enrolled students
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CourseView {
    pub id: Option<i64>,
    pub name: String,
    pub description: String,
    pub start_date: NaiveDateTime,
    pub end_date: NaiveDateTime,
    pub students: Vec<StudentProfile>,
}

fn require_non_blank(value: &str, message: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation(message.to_string()));
    }
    Ok(())
}
