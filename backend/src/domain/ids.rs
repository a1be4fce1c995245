//! Strongly typed identifiers for learning entities.
//!
//! Every identifier wraps a UUID so a course id can never be passed where a
//! lesson id is expected. Serialised transparently as the UUID string.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

macro_rules! define_uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
        )]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Wrap an existing UUID.
            pub const fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid)
            }

            /// Generate a fresh random identifier.
            pub fn random() -> Self {
                Self(Uuid::new_v4())
            }

            /// Access the underlying UUID.
            pub fn as_uuid(&self) -> &Uuid {
                &self.0
            }
        }

        impl From<Uuid> for $name {
            fn from(value: Uuid) -> Self {
                Self(value)
            }
        }

        impl From<$name> for Uuid {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self(Uuid::parse_str(s.trim())?))
            }
        }
    };
}

define_uuid_id! {
    /// Identifies a learner account (students, instructors and administrators).
    LearnerId
}
define_uuid_id! {
    /// Identifies a course.
    CourseId
}
define_uuid_id! {
    /// Identifies a module within a course.
    ModuleId
}
define_uuid_id! {
    /// Identifies a lesson within a module.
    LessonId
}
define_uuid_id! {
    /// Identifies a quiz attached to a quiz lesson.
    QuizId
}
define_uuid_id! {
    /// Identifies a quiz question.
    QuestionId
}
define_uuid_id! {
    /// Identifies an answer option of a quiz question.
    OptionId
}
define_uuid_id! {
    /// Identifies an enrollment.
    EnrollmentId
}
define_uuid_id! {
    /// Identifies a graded quiz attempt.
    AttemptId
}
define_uuid_id! {
    /// Identifies an issued certificate.
    CertificateId
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn parses_and_displays_uuid() {
        let raw = "3fa85f64-5717-4562-b3fc-2c963f66afa6";
        let id: CourseId = raw.parse().expect("valid uuid");
        assert_eq!(id.to_string(), raw);
    }

    #[rstest]
    #[case("")]
    #[case("not-a-uuid")]
    fn rejects_invalid_input(#[case] raw: &str) {
        assert!(raw.parse::<LessonId>().is_err());
    }

    #[rstest]
    fn serialises_transparently() {
        let uuid = Uuid::nil();
        let id = EnrollmentId::from_uuid(uuid);
        let json = serde_json::to_string(&id).expect("serialise id");
        assert_eq!(json, format!("\"{uuid}\""));
    }
}
