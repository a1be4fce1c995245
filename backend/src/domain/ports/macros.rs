//! `define_port_error!`, the declaration form shared by every driven port's
//! error enum.
//!
//! Each variant names the [`ErrorCode`](crate::domain::ErrorCode) it
//! surfaces as. The macro derives `thiserror::Error`, adds a snake_case
//! constructor per variant taking `impl Into<_>` fields, and converts the
//! enum into a domain [`Error`](crate::domain::Error) carrying its display
//! text, so services can use `?` on adapter results.
//!
//! ```ignore
//! define_port_error! {
//!     pub enum LearningStoreError {
//!         Connection { message: String } as ServiceUnavailable =>
//!             "learning store connection failed: {message}",
//!     }
//! }
//! let err = LearningStoreError::connection("pool timed out");
//! ```

macro_rules! define_port_error {
    (@ctor $variant:ident) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]() -> Self {
                Self::$variant
            }
        }
    };

    (@ctor $variant:ident { $($field:ident : $ty:ty),* $(,)? }) => {
        ::paste::paste! {
            pub fn [<$variant:snake>]($($field: impl Into<$ty>),*) -> Self {
                Self::$variant { $($field: $field.into()),* }
            }
        }
    };

    (
        $(#[$outer:meta])*
        pub enum $name:ident {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $( { $($field:ident : $ty:ty),* $(,)? } )?
                    as $code:ident => $message:expr
            ),* $(,)?
        }
    ) => {
        $(#[$outer])*
        #[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
        pub enum $name {
            $(
                $(#[$variant_meta])*
                #[error($message)]
                $variant $( { $($field : $ty),* } )?,
            )*
        }

        impl $name {
            $(
                define_port_error!(@ctor $variant $( { $($field : $ty),* } )?);
            )*

            /// Code the failure surfaces as once it leaves the port.
            pub fn error_code(&self) -> $crate::domain::ErrorCode {
                match self {
                    $( Self::$variant { .. } => $crate::domain::ErrorCode::$code, )*
                }
            }
        }

        impl From<$name> for $crate::domain::Error {
            fn from(error: $name) -> Self {
                $crate::domain::Error::new(error.error_code(), error.to_string())
            }
        }
    };
}

pub(crate) use define_port_error;

#[cfg(test)]
mod tests {
    use crate::domain::{Error, ErrorCode};

    define_port_error! {
        pub enum GradebookError {
            Offline as ServiceUnavailable => "gradebook offline",
            Rejected { reason: String } as InvalidRequest => "gradebook rejected grade: {reason}",
            Stale { lesson: String, revision: u32 } as Conflict =>
                "grade for {lesson} is stale at revision {revision}",
        }
    }

    #[test]
    fn unit_variants_get_nullary_constructors() {
        assert_eq!(GradebookError::offline(), GradebookError::Offline);
        assert_eq!(GradebookError::offline().error_code(), ErrorCode::ServiceUnavailable);
    }

    #[test]
    fn fields_accept_anything_convertible() {
        let err = GradebookError::stale("intro-video", 3_u32);
        assert_eq!(
            err,
            GradebookError::Stale {
                lesson: "intro-video".to_owned(),
                revision: 3,
            }
        );
        assert_eq!(err.to_string(), "grade for intro-video is stale at revision 3");
    }

    #[test]
    fn conversion_keeps_code_and_display_text() {
        let mapped = Error::from(GradebookError::rejected("score above 100"));
        assert_eq!(mapped.code(), ErrorCode::InvalidRequest);
        assert_eq!(mapped.message(), "gradebook rejected grade: score above 100");
    }
}
