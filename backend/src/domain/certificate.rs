//! Certificates of course completion and the grade attached to them.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use super::enrollment::round_to_hundredths;
use super::ids::{CertificateId, CourseId, EnrollmentId, LearnerId, QuizId};
use super::quiz::Attempt;

/// Proof that an enrollment reached 100%. Issued once, never regenerated.
#[derive(Debug, Clone, PartialEq)]
pub struct Certificate {
    pub id: CertificateId,
    pub enrollment_id: EnrollmentId,
    pub learner_id: LearnerId,
    pub course_id: CourseId,
    pub issued_at: DateTime<Utc>,
    /// Where the rendered document lives, as reported by the renderer.
    pub document_location: String,
    pub average_grade: Option<f64>,
}

/// Average of each quiz's best passing attempt.
///
/// Failed attempts and all but the highest passing percentage per quiz are
/// ignored. `None` when no quiz was passed.
///
/// # Examples
/// ```
/// use chrono::Utc;
/// use lms_backend::domain::{average_grade, Attempt, EnrollmentId, Grade, QuizId};
///
/// let enrollment = EnrollmentId::random();
/// let attempt = |quiz, percentage, is_passed| {
///     let grade = Grade { score: 0, total_questions: 0, percentage, is_passed, answers: vec![] };
///     Attempt::record(enrollment, quiz, grade, 0, Utc::now())
/// };
/// let (q1, q2) = (QuizId::random(), QuizId::random());
/// let attempts = vec![attempt(q1, 60.0, true), attempt(q1, 90.0, true), attempt(q2, 70.0, true)];
/// assert_eq!(average_grade(&attempts), Some(80.0));
/// ```
pub fn average_grade(attempts: &[Attempt]) -> Option<f64> {
    let mut best: HashMap<QuizId, f64> = HashMap::new();
    for attempt in attempts.iter().filter(|attempt| attempt.is_passed) {
        best.entry(attempt.quiz_id)
            .and_modify(|current| *current = current.max(attempt.percentage))
            .or_insert(attempt.percentage);
    }
    if best.is_empty() {
        return None;
    }
    let sum: f64 = best.values().sum();
    Some(round_to_hundredths(sum / best.len() as f64))
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::quiz::Grade;
    use rstest::rstest;

    fn attempt(quiz_id: QuizId, percentage: f64, is_passed: bool) -> Attempt {
        Attempt::record(
            EnrollmentId::random(),
            quiz_id,
            Grade {
                score: 0,
                total_questions: 0,
                percentage,
                is_passed,
                answers: Vec::new(),
            },
            30,
            Utc::now(),
        )
    }

    #[rstest]
    fn ignores_failed_attempts() {
        let quiz = QuizId::random();
        let attempts = vec![attempt(quiz, 95.0, false), attempt(quiz, 55.0, true)];
        assert_eq!(average_grade(&attempts), Some(55.0));
    }

    #[rstest]
    fn averages_best_per_quiz_not_all_attempts() {
        let (q1, q2) = (QuizId::random(), QuizId::random());
        let attempts = vec![
            attempt(q1, 50.0, true),
            attempt(q1, 100.0, true),
            attempt(q2, 70.0, true),
        ];
        assert_eq!(average_grade(&attempts), Some(85.0));
    }

    #[rstest]
    fn none_without_passing_attempts() {
        assert_eq!(average_grade(&[]), None);
        assert_eq!(average_grade(&[attempt(QuizId::random(), 10.0, false)]), None);
    }
}
