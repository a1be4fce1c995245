//! Diesel table definitions for the PostgreSQL schema.
//!
//! These definitions must match the migrations under `backend/migrations`.
//! Regenerate with `diesel print-schema` after changing a migration.

diesel::table! {
    /// Learner accounts.
    learners (id) {
        id -> Uuid,
        full_name -> Varchar,
        email -> Varchar,
        email_verified -> Bool,
        is_active -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Role grants; one row per learner and role.
    learner_roles (learner_id, role) {
        learner_id -> Uuid,
        role -> Varchar,
    }
}

diesel::table! {
    subscription_plans (id) {
        id -> Uuid,
        name -> Varchar,
    }
}

diesel::table! {
    /// Subscription windows, inclusive at both ends.
    learner_subscriptions (id) {
        id -> Uuid,
        learner_id -> Uuid,
        plan_id -> Uuid,
        starts_at -> Timestamptz,
        ends_at -> Timestamptz,
    }
}

diesel::table! {
    courses (id) {
        id -> Uuid,
        title -> Varchar,
        instructor_id -> Uuid,
        is_retired -> Bool,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    course_modules (id) {
        id -> Uuid,
        course_id -> Uuid,
        title -> Varchar,
        position -> Int4,
        is_deleted -> Bool,
    }
}

diesel::table! {
    lessons (id) {
        id -> Uuid,
        module_id -> Uuid,
        course_id -> Uuid,
        title -> Varchar,
        position -> Int4,
        /// One of `video`, `reading`, `quiz`.
        kind -> Varchar,
        is_previewable -> Bool,
        is_deleted -> Bool,
        video_duration_seconds -> Nullable<Int4>,
        estimated_minutes -> Nullable<Int4>,
    }
}

diesel::table! {
    quizzes (id) {
        id -> Uuid,
        lesson_id -> Uuid,
        course_id -> Uuid,
        title -> Varchar,
        passing_score_percent -> Nullable<Int4>,
        time_limit_seconds -> Int4,
    }
}

diesel::table! {
    quiz_questions (id) {
        id -> Uuid,
        quiz_id -> Uuid,
        body -> Text,
        position -> Int4,
        is_deleted -> Bool,
    }
}

diesel::table! {
    quiz_options (id) {
        id -> Uuid,
        question_id -> Uuid,
        body -> Text,
        is_correct -> Bool,
        is_deleted -> Bool,
    }
}

diesel::table! {
    /// Enrollments; a partial unique index allows one active row per
    /// learner and course.
    enrollments (id) {
        id -> Uuid,
        learner_id -> Uuid,
        course_id -> Uuid,
        started_at -> Timestamptz,
        progress_percent -> Float8,
        is_completed -> Bool,
        completed_at -> Nullable<Timestamptz>,
        last_lesson_id -> Nullable<Uuid>,
        certificate_id -> Nullable<Uuid>,
        is_deleted -> Bool,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    lesson_progress (enrollment_id, lesson_id) {
        enrollment_id -> Uuid,
        lesson_id -> Uuid,
        is_completed -> Bool,
        completed_at -> Nullable<Timestamptz>,
        watched_seconds -> Int4,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Immutable graded quiz attempts.
    quiz_attempts (id) {
        id -> Uuid,
        enrollment_id -> Uuid,
        quiz_id -> Uuid,
        score -> Int4,
        total_questions -> Int4,
        percentage -> Float8,
        is_passed -> Bool,
        time_spent_seconds -> Int4,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    attempt_answers (attempt_id, question_id) {
        attempt_id -> Uuid,
        question_id -> Uuid,
        option_id -> Uuid,
        is_correct -> Bool,
    }
}

diesel::table! {
    learner_streaks (learner_id) {
        learner_id -> Uuid,
        current_streak_days -> Int4,
        last_active_at -> Timestamptz,
    }
}

diesel::table! {
    certificates (id) {
        id -> Uuid,
        enrollment_id -> Uuid,
        learner_id -> Uuid,
        course_id -> Uuid,
        issued_at -> Timestamptz,
        document_location -> Text,
        average_grade -> Nullable<Float8>,
    }
}

diesel::joinable!(learner_roles -> learners (learner_id));
diesel::joinable!(learner_subscriptions -> subscription_plans (plan_id));
diesel::joinable!(quiz_options -> quiz_questions (question_id));

diesel::allow_tables_to_appear_in_same_query!(
    learners,
    learner_roles,
    subscription_plans,
    learner_subscriptions,
    courses,
    course_modules,
    lessons,
    quizzes,
    quiz_questions,
    quiz_options,
    enrollments,
    lesson_progress,
    quiz_attempts,
    attempt_answers,
    learner_streaks,
    certificates,
);
