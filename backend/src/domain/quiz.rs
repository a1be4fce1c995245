//! Quizzes, attempts and deterministic grading.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use utoipa::ToSchema;

use super::enrollment::round_to_hundredths;
use super::error::Error;
use super::ids::{AttemptId, CourseId, EnrollmentId, LessonId, OptionId, QuestionId, QuizId};

/// One selectable option of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerOption {
    pub id: OptionId,
    pub question_id: QuestionId,
    pub text: String,
    pub is_correct: bool,
    pub is_deleted: bool,
}

/// A quiz question with its options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub id: QuestionId,
    pub quiz_id: QuizId,
    pub text: String,
    pub position: i32,
    pub is_deleted: bool,
    pub options: Vec<AnswerOption>,
}

/// A quiz attached to exactly one quiz lesson.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quiz {
    pub id: QuizId,
    pub lesson_id: LessonId,
    pub course_id: CourseId,
    pub title: String,
    pub passing_score_percent: Option<i32>,
    /// Zero means unlimited.
    pub time_limit_seconds: i32,
    pub questions: Vec<Question>,
}

impl Quiz {
    /// Questions a submission must answer, in order.
    pub fn active_questions(&self) -> impl Iterator<Item = &Question> {
        self.questions.iter().filter(|question| !question.is_deleted)
    }

    /// Pass mark, falling back to `default_percent` when the quiz has none.
    pub fn passing_threshold(&self, default_percent: u8) -> f64 {
        f64::from(
            self.passing_score_percent
                .filter(|score| *score > 0)
                .unwrap_or(i32::from(default_percent)),
        )
    }

    /// Whether a reported duration breaks the time limit plus grace.
    pub fn exceeds_time_limit(&self, time_spent_seconds: i32, grace_seconds: i32) -> bool {
        self.time_limit_seconds > 0
            && i64::from(time_spent_seconds)
                > i64::from(self.time_limit_seconds) + i64::from(grace_seconds)
    }
}

/// Answer chosen by the learner for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub option_id: OptionId,
}

/// A submitted answer after grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct GradedAnswer {
    pub question_id: QuestionId,
    pub option_id: OptionId,
    pub is_correct: bool,
}

/// Outcome of grading one submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    pub score: i32,
    pub total_questions: i32,
    pub percentage: f64,
    pub is_passed: bool,
    pub answers: Vec<GradedAnswer>,
}

/// One immutable graded submission.
#[derive(Debug, Clone, PartialEq)]
pub struct Attempt {
    pub id: AttemptId,
    pub enrollment_id: EnrollmentId,
    pub quiz_id: QuizId,
    pub score: i32,
    pub total_questions: i32,
    pub percentage: f64,
    pub is_passed: bool,
    pub time_spent_seconds: i32,
    pub created_at: DateTime<Utc>,
    pub answers: Vec<GradedAnswer>,
}

impl Attempt {
    /// Record a graded submission.
    pub fn record(
        enrollment_id: EnrollmentId,
        quiz_id: QuizId,
        grade: Grade,
        time_spent_seconds: i32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AttemptId::random(),
            enrollment_id,
            quiz_id,
            score: grade.score,
            total_questions: grade.total_questions,
            percentage: grade.percentage,
            is_passed: grade.is_passed,
            time_spent_seconds,
            created_at: now,
            answers: grade.answers,
        }
    }
}

/// Structural problems that reject a submission before grading.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubmissionError {
    #[error("quiz has no questions to answer")]
    NoQuestions,
    #[error("question {0} was answered more than once")]
    DuplicateQuestion(QuestionId),
    #[error("question {0} does not belong to this quiz")]
    UnknownQuestion(QuestionId),
    #[error("{} question(s) were not answered", .0.len())]
    MissingAnswers(Vec<QuestionId>),
}

impl From<SubmissionError> for Error {
    fn from(value: SubmissionError) -> Self {
        let details = match &value {
            SubmissionError::NoQuestions => json!({ "reason": "no_questions" }),
            SubmissionError::DuplicateQuestion(id) => {
                json!({ "reason": "duplicate_question", "questionId": id })
            }
            SubmissionError::UnknownQuestion(id) => {
                json!({ "reason": "unknown_question", "questionId": id })
            }
            SubmissionError::MissingAnswers(ids) => {
                json!({ "reason": "missing_answers", "questionIds": ids })
            }
        };
        Error::invalid_request(value.to_string()).with_details(details)
    }
}

/// Grade a submission.
///
/// Every active question must be answered exactly once. An answer is correct
/// when its option belongs to the question, is marked correct and is not
/// deleted.
pub fn grade_submission(
    quiz: &Quiz,
    answers: &[SubmittedAnswer],
    default_passing_percent: u8,
) -> Result<Grade, SubmissionError> {
    let questions: HashMap<QuestionId, &Question> = quiz
        .active_questions()
        .map(|question| (question.id, question))
        .collect();
    if questions.is_empty() {
        return Err(SubmissionError::NoQuestions);
    }

    let mut seen = HashSet::with_capacity(answers.len());
    for answer in answers {
        if !questions.contains_key(&answer.question_id) {
            return Err(SubmissionError::UnknownQuestion(answer.question_id));
        }
        if !seen.insert(answer.question_id) {
            return Err(SubmissionError::DuplicateQuestion(answer.question_id));
        }
    }
    let missing: Vec<QuestionId> = quiz
        .active_questions()
        .map(|question| question.id)
        .filter(|id| !seen.contains(id))
        .collect();
    if !missing.is_empty() {
        return Err(SubmissionError::MissingAnswers(missing));
    }

    let graded: Vec<GradedAnswer> = answers
        .iter()
        .map(|answer| {
            let is_correct = questions.get(&answer.question_id).is_some_and(|question| {
                question.options.iter().any(|option| {
                    option.id == answer.option_id
                        && option.question_id == question.id
                        && option.is_correct
                        && !option.is_deleted
                })
            });
            GradedAnswer {
                question_id: answer.question_id,
                option_id: answer.option_id,
                is_correct,
            }
        })
        .collect();

    let total = graded.len();
    let correct = graded.iter().filter(|answer| answer.is_correct).count();
    let percentage = round_to_hundredths(correct as f64 / total as f64 * 100.0);
    Ok(Grade {
        score: i32::try_from(correct).unwrap_or(i32::MAX),
        total_questions: i32::try_from(total).unwrap_or(i32::MAX),
        percentage,
        is_passed: percentage >= quiz.passing_threshold(default_passing_percent),
        answers: graded,
    })
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::{fixture, rstest};

    #[fixture]
    fn quiz() -> Quiz {
        let quiz_id = QuizId::random();
        let questions = (1..=4)
            .map(|position| {
                let question_id = QuestionId::random();
                let options = (0..3)
                    .map(|index| AnswerOption {
                        id: OptionId::random(),
                        question_id,
                        text: format!("option {index}"),
                        is_correct: index == 0,
                        is_deleted: false,
                    })
                    .collect();
                Question {
                    id: question_id,
                    quiz_id,
                    text: format!("question {position}"),
                    position,
                    is_deleted: false,
                    options,
                }
            })
            .collect();
        Quiz {
            id: quiz_id,
            lesson_id: LessonId::random(),
            course_id: CourseId::random(),
            title: "Ownership".to_owned(),
            passing_score_percent: Some(70),
            time_limit_seconds: 600,
            questions,
        }
    }

    fn answer(question: &Question, option_index: usize) -> SubmittedAnswer {
        SubmittedAnswer {
            question_id: question.id,
            option_id: question.options[option_index].id,
        }
    }

    fn answers_with_correct(quiz: &Quiz, correct: usize) -> Vec<SubmittedAnswer> {
        quiz.questions
            .iter()
            .enumerate()
            .map(|(index, question)| answer(question, if index < correct { 0 } else { 1 }))
            .collect()
    }

    #[rstest]
    fn three_of_four_scores_seventy_five_and_passes(quiz: Quiz) {
        let grade = grade_submission(&quiz, &answers_with_correct(&quiz, 3), 50).expect("graded");
        assert_eq!(grade.score, 3);
        assert_eq!(grade.total_questions, 4);
        assert_eq!(grade.percentage, 75.0);
        assert!(grade.is_passed);
    }

    #[rstest]
    #[case(Some(76), false)]
    #[case(Some(75), true)]
    #[case(None, true)]
    fn threshold_decides_pass(mut quiz: Quiz, #[case] passing: Option<i32>, #[case] passed: bool) {
        quiz.passing_score_percent = passing;
        let grade = grade_submission(&quiz, &answers_with_correct(&quiz, 3), 50).expect("graded");
        assert_eq!(grade.is_passed, passed);
    }

    #[rstest]
    fn default_threshold_applies_when_unset(mut quiz: Quiz) {
        quiz.passing_score_percent = None;
        let grade = grade_submission(&quiz, &answers_with_correct(&quiz, 1), 50).expect("graded");
        assert_eq!(grade.percentage, 25.0);
        assert!(!grade.is_passed);
        let grade = grade_submission(&quiz, &answers_with_correct(&quiz, 2), 50).expect("graded");
        assert!(grade.is_passed);
    }

    #[rstest]
    fn option_from_another_question_is_wrong(quiz: Quiz) {
        let mut answers = answers_with_correct(&quiz, 4);
        answers[0].option_id = quiz.questions[1].options[0].id;
        let grade = grade_submission(&quiz, &answers, 50).expect("graded");
        assert_eq!(grade.score, 3);
        assert!(!grade.answers[0].is_correct);
    }

    #[rstest]
    fn deleted_correct_option_is_wrong(mut quiz: Quiz) {
        quiz.questions[0].options[0].is_deleted = true;
        let grade = grade_submission(&quiz, &answers_with_correct(&quiz, 4), 50).expect("graded");
        assert_eq!(grade.score, 3);
    }

    #[rstest]
    fn missing_answers_are_rejected(quiz: Quiz) {
        let mut answers = answers_with_correct(&quiz, 4);
        let dropped = answers.pop().map(|answer| answer.question_id);
        let err = grade_submission(&quiz, &answers, 50).expect_err("rejected");
        assert_eq!(err, SubmissionError::MissingAnswers(dropped.into_iter().collect()));
    }

    #[rstest]
    fn duplicate_answers_are_rejected(quiz: Quiz) {
        let mut answers = answers_with_correct(&quiz, 4);
        answers.push(answers[0]);
        let err = grade_submission(&quiz, &answers, 50).expect_err("rejected");
        assert_eq!(err, SubmissionError::DuplicateQuestion(answers[0].question_id));
    }

    #[rstest]
    fn unknown_questions_are_rejected(quiz: Quiz) {
        let mut answers = answers_with_correct(&quiz, 4);
        let stray = QuestionId::random();
        answers.push(SubmittedAnswer {
            question_id: stray,
            option_id: OptionId::random(),
        });
        let err = grade_submission(&quiz, &answers, 50).expect_err("rejected");
        assert_eq!(err, SubmissionError::UnknownQuestion(stray));
    }

    #[rstest]
    fn deleted_questions_need_no_answer(mut quiz: Quiz) {
        quiz.questions[3].is_deleted = true;
        let answers: Vec<_> = answers_with_correct(&quiz, 3).into_iter().take(3).collect();
        let grade = grade_submission(&quiz, &answers, 50).expect("graded");
        assert_eq!(grade.percentage, 100.0);
    }

    #[rstest]
    fn quiz_without_questions_is_rejected(mut quiz: Quiz) {
        quiz.questions.clear();
        let err = grade_submission(&quiz, &[], 50).expect_err("rejected");
        assert_eq!(err, SubmissionError::NoQuestions);
    }

    #[rstest]
    #[case(600, 615, false)]
    #[case(600, 616, true)]
    #[case(0, 100_000, false)]
    fn time_limit_allows_grace(
        mut quiz: Quiz,
        #[case] limit: i32,
        #[case] spent: i32,
        #[case] exceeded: bool,
    ) {
        quiz.time_limit_seconds = limit;
        assert_eq!(quiz.exceeds_time_limit(spent, 15), exceeded);
    }

    #[rstest]
    fn submission_errors_map_to_invalid_request() {
        let error: Error = SubmissionError::NoQuestions.into();
        assert_eq!(error.code(), crate::domain::ErrorCode::InvalidRequest);
        assert!(error.details().is_some());
    }
}
