//! Builders for learners, courses and quizzes used across tests.

use crate::domain::{
    AnswerOption, Course, CourseId, CourseModule, CourseOutline, LearnerId, LearnerIdentity,
    LearnerRole, Lesson, LessonId, LessonKind, ModuleId, OptionId, Question, QuestionId, Quiz,
    QuizId, SubmittedAnswer,
};

/// An active, verified student.
pub fn learner(full_name: &str) -> LearnerIdentity {
    let slug = full_name.to_lowercase().replace(' ', ".");
    LearnerIdentity {
        id: LearnerId::random(),
        full_name: full_name.to_owned(),
        email: format!("{slug}@example.com"),
        email_verified: true,
        is_active: true,
        roles: vec![LearnerRole::Student],
    }
}

/// A course with its rows and the outline built from them.
#[derive(Debug, Clone)]
pub struct CourseFixture {
    pub course: Course,
    pub modules: Vec<CourseModule>,
    /// Lessons in document order.
    pub lessons: Vec<Lesson>,
    pub outline: CourseOutline,
}

impl CourseFixture {
    /// The `index`-th lesson in document order.
    ///
    /// # Panics
    /// When the course has fewer lessons.
    pub fn lesson(&self, index: usize) -> &Lesson {
        &self.lessons[index]
    }

    /// Edit one lesson and rebuild the outline.
    pub fn with_lesson(mut self, index: usize, change: impl FnOnce(&mut Lesson)) -> Self {
        change(&mut self.lessons[index]);
        self.outline = CourseOutline::new(
            self.course.clone(),
            self.modules.clone(),
            self.lessons.clone(),
        );
        self
    }
}

pub struct CourseBuilder {
    title: String,
    instructor_id: LearnerId,
    modules: Vec<(i32, Vec<i32>)>,
    kind: LessonKind,
}

impl CourseBuilder {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_owned(),
            instructor_id: LearnerId::random(),
            modules: Vec::new(),
            kind: LessonKind::Reading,
        }
    }

    /// One module holding `count` lessons numbered from 1.
    pub fn lessons(mut self, count: usize) -> Self {
        let positions = (1..=count).filter_map(|n| i32::try_from(n).ok()).collect();
        self.modules.push((1, positions));
        self
    }

    /// Add a module at `position` with lessons at `lesson_positions`.
    pub fn module(mut self, position: i32, lesson_positions: Vec<i32>) -> Self {
        self.modules.push((position, lesson_positions));
        self
    }

    pub fn instructor(mut self, instructor_id: LearnerId) -> Self {
        self.instructor_id = instructor_id;
        self
    }

    /// Kind given to every lesson.
    pub fn kind(mut self, kind: LessonKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn build(self) -> CourseFixture {
        let course = Course {
            id: CourseId::random(),
            title: self.title,
            instructor_id: self.instructor_id,
            is_retired: false,
        };
        let mut modules = Vec::new();
        let mut lessons = Vec::new();
        for (position, lesson_positions) in self.modules {
            let module = CourseModule {
                id: ModuleId::random(),
                course_id: course.id,
                title: format!("Module {position}"),
                position,
                is_deleted: false,
            };
            lessons.extend(lesson_positions.into_iter().map(|lesson_position| Lesson {
                id: LessonId::random(),
                module_id: module.id,
                course_id: course.id,
                title: format!("Lesson {position}.{lesson_position}"),
                position: lesson_position,
                kind: self.kind,
                is_previewable: false,
                is_deleted: false,
                video_duration_seconds: (self.kind == LessonKind::Video).then_some(600),
                estimated_minutes: Some(10),
            }));
            modules.push(module);
        }
        let outline = CourseOutline::new(course.clone(), modules.clone(), lessons.clone());
        let lessons = outline.lessons().cloned().collect();
        CourseFixture {
            course,
            modules,
            lessons,
            outline,
        }
    }
}

/// Reading-lesson course laid out as `(module position, lesson positions)`.
pub fn course_with_modules(layout: &[(i32, Vec<i32>)]) -> CourseFixture {
    layout
        .iter()
        .fold(CourseBuilder::new("Layout"), |builder, (position, lessons)| {
            builder.module(*position, lessons.clone())
        })
        .build()
}

/// A quiz for `lesson` with `questions` questions of two options each; the
/// first option is the correct one.
pub fn quiz_for(lesson: &Lesson, questions: usize) -> Quiz {
    let quiz_id = QuizId::random();
    let questions = (1..=questions)
        .map(|position| {
            let question_id = QuestionId::random();
            Question {
                id: question_id,
                quiz_id,
                text: format!("Question {position}"),
                position: i32::try_from(position).unwrap_or(i32::MAX),
                is_deleted: false,
                options: (0..2)
                    .map(|index| AnswerOption {
                        id: OptionId::random(),
                        question_id,
                        text: format!("Option {index}"),
                        is_correct: index == 0,
                        is_deleted: false,
                    })
                    .collect(),
            }
        })
        .collect();
    Quiz {
        id: quiz_id,
        lesson_id: lesson.id,
        course_id: lesson.course_id,
        title: format!("{} quiz", lesson.title),
        passing_score_percent: Some(70),
        time_limit_seconds: 600,
        questions,
    }
}

/// Answers to every active question, the first `correct` of them right.
pub fn answers(quiz: &Quiz, correct: usize) -> Vec<SubmittedAnswer> {
    quiz.active_questions()
        .enumerate()
        .map(|(index, question)| SubmittedAnswer {
            question_id: question.id,
            option_id: question.options[usize::from(index >= correct)].id,
        })
        .collect()
}
