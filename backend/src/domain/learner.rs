//! Learner identity as seen by the progression engine.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::catalog::Course;
use super::ids::LearnerId;

/// Account role held by a learner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LearnerRole {
    Student,
    Instructor,
    Admin,
}

impl LearnerRole {
    /// Stable storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Instructor => "instructor",
            Self::Admin => "admin",
        }
    }

    /// Parse the storage representation, ignoring unknown roles.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "instructor" => Some(Self::Instructor),
            "admin" | "administrator" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Identity and status of a learner account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LearnerIdentity {
    pub id: LearnerId,
    pub full_name: String,
    pub email: String,
    pub email_verified: bool,
    pub is_active: bool,
    pub roles: Vec<LearnerRole>,
}

impl LearnerIdentity {
    /// Whether the account holds the given role.
    pub fn has_role(&self, role: LearnerRole) -> bool {
        self.roles.contains(&role)
    }

    /// Resolve the caller's capability for one course.
    ///
    /// # Examples
    /// ```
    /// use lms_backend::domain::{CallerRole, LearnerId, LearnerIdentity, LearnerRole};
    ///
    /// let admin = LearnerIdentity {
    ///     id: LearnerId::random(),
    ///     full_name: "Ada".into(),
    ///     email: "ada@example.com".into(),
    ///     email_verified: true,
    ///     is_active: true,
    ///     roles: vec![LearnerRole::Admin],
    /// };
    /// assert_eq!(admin.caller_role_for(None), CallerRole::Administrator);
    /// ```
    pub fn caller_role_for(&self, course: Option<&Course>) -> CallerRole {
        if self.has_role(LearnerRole::Admin) {
            return CallerRole::Administrator;
        }
        let owns_course = course.is_some_and(|course| course.instructor_id == self.id);
        if owns_course && self.has_role(LearnerRole::Instructor) {
            CallerRole::Owner
        } else {
            CallerRole::Learner
        }
    }
}

/// Capability of the caller for the course being acted on, resolved once per
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CallerRole {
    Learner,
    Owner,
    Administrator,
}

impl CallerRole {
    /// Owners and administrators bypass attempt gating.
    pub fn is_privileged(self) -> bool {
        matches!(self, Self::Owner | Self::Administrator)
    }
}
