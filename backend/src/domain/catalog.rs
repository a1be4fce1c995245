//! Course structure as consumed by the progression engine.
//!
//! Authoring is handled elsewhere; the engine only reads courses, modules and
//! lessons. [`CourseOutline`] is the ordered, soft-delete-filtered view every
//! progression rule works from.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::ids::{CourseId, LearnerId, LessonId, ModuleId};

/// A course offered in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: CourseId,
    pub title: String,
    /// Instructor who owns the course.
    pub instructor_id: LearnerId,
    /// Retired courses accept no new enrollments.
    pub is_retired: bool,
}

/// An ordered section of a course.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseModule {
    pub id: ModuleId,
    pub course_id: CourseId,
    pub title: String,
    pub position: i32,
    pub is_deleted: bool,
}

/// Content type of a lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LessonKind {
    Video,
    Reading,
    Quiz,
}

impl LessonKind {
    /// Stable storage representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Reading => "reading",
            Self::Quiz => "quiz",
        }
    }

    /// Parse the storage representation.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "video" => Some(Self::Video),
            "reading" => Some(Self::Reading),
            "quiz" => Some(Self::Quiz),
            _ => None,
        }
    }
}

/// The atomic unit of content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lesson {
    pub id: LessonId,
    pub module_id: ModuleId,
    pub course_id: CourseId,
    pub title: String,
    pub position: i32,
    pub kind: LessonKind,
    pub is_previewable: bool,
    pub is_deleted: bool,
    pub video_duration_seconds: Option<i32>,
    pub estimated_minutes: Option<i32>,
}

impl Lesson {
    /// Seconds of video a learner is measured against: the explicit video
    /// duration, else the estimate in minutes. `None` when neither is set.
    pub fn required_watch_seconds(&self) -> Option<i64> {
        let explicit = self
            .video_duration_seconds
            .filter(|seconds| *seconds > 0)
            .map(i64::from);
        explicit.or_else(|| {
            self.estimated_minutes
                .filter(|minutes| *minutes > 0)
                .map(|minutes| i64::from(minutes) * 60)
        })
    }
}

/// A non-deleted module with its non-deleted lessons in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutlineModule {
    pub module: CourseModule,
    pub lessons: Vec<Lesson>,
}

/// Ordered view of a course: active modules by position, each with its active
/// lessons by position. Ties break on id so ordering is total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CourseOutline {
    course: Course,
    modules: Vec<OutlineModule>,
}

impl CourseOutline {
    /// Build an outline from unordered rows, dropping soft-deleted modules and
    /// lessons and anything that does not belong to `course`.
    pub fn new(course: Course, modules: Vec<CourseModule>, lessons: Vec<Lesson>) -> Self {
        let mut active_modules: Vec<CourseModule> = modules
            .into_iter()
            .filter(|module| module.course_id == course.id && !module.is_deleted)
            .collect();
        active_modules.sort_by_key(|module| (module.position, module.id));

        let mut active_lessons: Vec<Lesson> =
            lessons.into_iter().filter(|lesson| !lesson.is_deleted).collect();
        active_lessons.sort_by_key(|lesson| (lesson.position, lesson.id));

        let modules = active_modules
            .into_iter()
            .map(|module| {
                let lessons = active_lessons
                    .iter()
                    .filter(|lesson| lesson.module_id == module.id)
                    .cloned()
                    .collect();
                OutlineModule { module, lessons }
            })
            .collect();
        Self { course, modules }
    }

    pub fn course(&self) -> &Course {
        &self.course
    }

    pub fn modules(&self) -> &[OutlineModule] {
        &self.modules
    }

    /// Active lessons in document order.
    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.modules.iter().flat_map(|module| module.lessons.iter())
    }

    /// Denominator of the progress percentage.
    pub fn active_lesson_count(&self) -> usize {
        self.modules.iter().map(|module| module.lessons.len()).sum()
    }

    pub fn find(&self, lesson_id: LessonId) -> Option<&Lesson> {
        self.lessons().find(|lesson| lesson.id == lesson_id)
    }

    pub fn contains(&self, lesson_id: LessonId) -> bool {
        self.find(lesson_id).is_some()
    }

    /// The free on-ramp of the course.
    pub fn first_lesson(&self) -> Option<&Lesson> {
        self.lessons().next()
    }

    /// Whether `lesson_id` opens the course: first in document order, or
    /// numbered as lesson 1 of module 1.
    pub fn is_opening_lesson(&self, lesson_id: LessonId) -> bool {
        if self.first_lesson().is_some_and(|lesson| lesson.id == lesson_id) {
            return true;
        }
        self.modules.iter().any(|entry| {
            entry.module.position == 1
                && entry
                    .lessons
                    .iter()
                    .any(|lesson| lesson.id == lesson_id && lesson.position == 1)
        })
    }

    /// Lesson immediately preceding `lesson_id` in document order.
    ///
    /// Within a module this is the previous lesson; for the first lesson of a
    /// module it is the last lesson of the nearest earlier module that has
    /// any. Numbering gaps are irrelevant. Returns `None` at the edge of the
    /// content or when the lesson is not part of the outline.
    ///
    /// # Examples
    /// ```
    /// use lms_backend::domain::{
    ///     Course, CourseId, CourseModule, CourseOutline, LearnerId, Lesson, LessonId, LessonKind,
    ///     ModuleId,
    /// };
    ///
    /// let course = Course {
    ///     id: CourseId::random(),
    ///     title: "Rust".into(),
    ///     instructor_id: LearnerId::random(),
    ///     is_retired: false,
    /// };
    /// let module = CourseModule {
    ///     id: ModuleId::random(),
    ///     course_id: course.id,
    ///     title: "Basics".into(),
    ///     position: 1,
    ///     is_deleted: false,
    /// };
    /// let lesson = |position| Lesson {
    ///     id: LessonId::random(),
    ///     module_id: module.id,
    ///     course_id: course.id,
    ///     title: format!("L{position}"),
    ///     position,
    ///     kind: LessonKind::Reading,
    ///     is_previewable: false,
    ///     is_deleted: false,
    ///     video_duration_seconds: None,
    ///     estimated_minutes: None,
    /// };
    /// let (first, third) = (lesson(1), lesson(3));
    /// let outline = CourseOutline::new(course, vec![module], vec![third.clone(), first.clone()]);
    /// assert_eq!(outline.predecessor_of(third.id).map(|l| l.id), Some(first.id));
    /// assert!(outline.predecessor_of(first.id).is_none());
    /// ```
    pub fn predecessor_of(&self, lesson_id: LessonId) -> Option<&Lesson> {
        let mut previous = None;
        for lesson in self.lessons() {
            if lesson.id == lesson_id {
                return previous;
            }
            previous = Some(lesson);
        }
        None
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::{fixture, rstest};

    struct Rows {
        course: Course,
        modules: Vec<CourseModule>,
        lessons: Vec<Lesson>,
    }

    fn module(course: &Course, position: i32) -> CourseModule {
        CourseModule {
            id: ModuleId::random(),
            course_id: course.id,
            title: format!("Module {position}"),
            position,
            is_deleted: false,
        }
    }

    fn lesson(module: &CourseModule, position: i32) -> Lesson {
        Lesson {
            id: LessonId::random(),
            module_id: module.id,
            course_id: module.course_id,
            title: format!("Lesson {position}"),
            position,
            kind: LessonKind::Reading,
            is_previewable: false,
            is_deleted: false,
            video_duration_seconds: None,
            estimated_minutes: None,
        }
    }

    #[fixture]
    fn rows() -> Rows {
        let course = Course {
            id: CourseId::random(),
            title: "Systems".to_owned(),
            instructor_id: LearnerId::random(),
            is_retired: false,
        };
        let m1 = module(&course, 1);
        let m2 = module(&course, 2);
        let m4 = module(&course, 4);
        let lessons = vec![
            lesson(&m2, 1),
            lesson(&m1, 2),
            lesson(&m1, 1),
            lesson(&m4, 7),
            lesson(&m1, 5),
        ];
        Rows {
            course,
            modules: vec![m4, m2, m1],
            lessons,
        }
    }

    fn titles(outline: &CourseOutline) -> Vec<(i32, i32)> {
        outline
            .modules()
            .iter()
            .flat_map(|entry| {
                entry
                    .lessons
                    .iter()
                    .map(move |lesson| (entry.module.position, lesson.position))
            })
            .collect()
    }

    #[rstest]
    fn orders_by_module_then_lesson_position(rows: Rows) {
        let outline = CourseOutline::new(rows.course, rows.modules, rows.lessons);
        assert_eq!(titles(&outline), vec![(1, 1), (1, 2), (1, 5), (2, 1), (4, 7)]);
        assert_eq!(outline.active_lesson_count(), 5);
    }

    #[rstest]
    fn predecessor_crosses_module_boundaries_and_gaps(rows: Rows) {
        let outline = CourseOutline::new(rows.course, rows.modules, rows.lessons);
        let ordered: Vec<LessonId> = outline.lessons().map(|lesson| lesson.id).collect();
        for pair in ordered.windows(2) {
            let [before, after] = pair else { continue };
            assert_eq!(outline.predecessor_of(*after).map(|l| l.id), Some(*before));
        }
        assert!(outline.predecessor_of(ordered[0]).is_none());
    }

    #[rstest]
    fn deleted_rows_are_skipped(mut rows: Rows) {
        rows.lessons[1].is_deleted = true;
        rows.modules[1].is_deleted = true;
        let outline = CourseOutline::new(rows.course, rows.modules, rows.lessons);
        assert_eq!(titles(&outline), vec![(1, 1), (1, 5), (4, 7)]);
    }

    #[rstest]
    fn opening_lesson_is_first_in_document_order(rows: Rows) {
        let outline = CourseOutline::new(rows.course, rows.modules, rows.lessons);
        let first = outline.first_lesson().map(|lesson| lesson.id).expect("first lesson");
        assert!(outline.is_opening_lesson(first));
        let later = outline.lessons().nth(3).map(|lesson| lesson.id).expect("fourth lesson");
        assert!(!outline.is_opening_lesson(later));
    }

    #[rstest]
    fn unknown_lessons_have_no_predecessor(rows: Rows) {
        let outline = CourseOutline::new(rows.course, rows.modules, rows.lessons);
        assert!(outline.predecessor_of(LessonId::random()).is_none());
        assert!(!outline.contains(LessonId::random()));
    }

    #[rstest]
    #[case(Some(600), Some(5), Some(600))]
    #[case(None, Some(5), Some(300))]
    #[case(Some(0), Some(2), Some(120))]
    #[case(None, None, None)]
    #[case(Some(0), Some(0), None)]
    fn required_watch_seconds_prefers_explicit_duration(
        rows: Rows,
        #[case] duration: Option<i32>,
        #[case] minutes: Option<i32>,
        #[case] expected: Option<i64>,
    ) {
        let mut video = rows.lessons[0].clone();
        video.kind = LessonKind::Video;
        video.video_duration_seconds = duration;
        video.estimated_minutes = minutes;
        assert_eq!(video.required_watch_seconds(), expected);
    }

    #[rstest]
    fn empty_course_has_no_lessons(rows: Rows) {
        let outline = CourseOutline::new(rows.course, Vec::new(), Vec::new());
        assert_eq!(outline.active_lesson_count(), 0);
        assert!(outline.first_lesson().is_none());
    }
}
