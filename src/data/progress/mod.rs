use utoipa::ToSchema;
use uuid::Uuid;

use crate::data::course::Course;

pub mod db;

pub static PROGRESS_COLLECTION_NAME: &str = "course_progress";

/// Lectures a user has completed within one course. There is at most one
/// record per (user, course) pair and its lecture set only ever grows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CourseProgress {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: Uuid,
    #[serde(default)]
    pub lecture_completed: Vec<String>,
}

impl CourseProgress {
    pub fn new(user_id: Uuid, course_id: Uuid, lecture: impl ToString) -> CourseProgress {
        CourseProgress {
            id: Uuid::new_v4(),
            user_id,
            course_id,
            lecture_completed: vec![lecture.to_string()],
        }
    }

    pub fn is_completed(&self, lecture: &str) -> bool {
        self.lecture_completed.iter().any(|l| l == lecture)
    }

    /// Adds `lecture` unless already present. Returns whether it was added.
    pub fn complete(&mut self, lecture: &str) -> bool {
        if self.is_completed(lecture) {
            return false;
        }
        self.lecture_completed.push(lecture.to_string());
        true
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MarkOutcome {
    /// First completion for this (user, course) pair.
    Created,
    Appended,
    AlreadyCompleted,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProgressState {
    Absent,
    PartiallyComplete,
    FullyComplete,
}

/// Derived view of a progress record against the current course content.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProgressSummary {
    pub completed: usize,
    pub total_lectures: usize,
    pub percent: u32,
    pub state: ProgressState,
}

/// `round(100 * completed / total)` with halves rounded up, or `0` for a
/// course without lectures.
pub fn completion_percent(completed: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    let (completed, total) = (completed as u64, total as u64);
    ((200 * completed + total) / (2 * total)) as u32
}

impl ProgressSummary {
    /// Only lectures still present in `course` are counted, so edits to the
    /// content can't push the percentage past 100.
    pub fn of(progress: Option<&CourseProgress>, course: &Course) -> ProgressSummary {
        let total_lectures = course.total_lectures();
        let completed = progress
            .map(|p| {
                p.lecture_completed
                    .iter()
                    .filter(|lecture| course.has_lecture(lecture))
                    .count()
            })
            .unwrap_or(0);

        let state = match progress {
            None => ProgressState::Absent,
            Some(_) if total_lectures > 0 && completed >= total_lectures => {
                ProgressState::FullyComplete
            }
            Some(_) => ProgressState::PartiallyComplete,
        };

        ProgressSummary {
            completed,
            total_lectures,
            percent: completion_percent(completed, total_lectures),
            state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::course::fixtures;

    #[test]
    fn percent_bounds() {
        assert_eq!(completion_percent(0, 7), 0);
        assert_eq!(completion_percent(7, 7), 100);
        assert_eq!(completion_percent(0, 0), 0);
        assert_eq!(completion_percent(3, 0), 0);
    }

    #[test]
    fn percent_rounds_half_up() {
        assert_eq!(completion_percent(1, 3), 33);
        assert_eq!(completion_percent(2, 3), 67);
        assert_eq!(completion_percent(1, 8), 13);
        assert_eq!(completion_percent(1, 200), 1);
        assert_eq!(completion_percent(1, 201), 0);
    }

    #[test]
    fn completing_twice_keeps_one_entry() {
        let mut progress = CourseProgress::new(Uuid::new_v4(), Uuid::new_v4(), "a");

        assert!(!progress.complete("a"));
        assert!(progress.complete("b"));
        assert_eq!(progress.lecture_completed, vec!["a", "b"]);
    }

    #[test]
    fn summary_tracks_state() {
        let course = fixtures::course(Uuid::new_v4(), &[2, 1]);
        let user = Uuid::new_v4();

        let absent = ProgressSummary::of(None, &course);
        assert_eq!(absent.state, ProgressState::Absent);
        assert_eq!(absent.percent, 0);

        let mut progress = CourseProgress::new(user, course.id, "l0-0");
        progress.complete("l0-1");
        let partial = ProgressSummary::of(Some(&progress), &course);
        assert_eq!(partial.completed, 2);
        assert_eq!(partial.total_lectures, 3);
        assert_eq!(partial.percent, 67);
        assert_eq!(partial.state, ProgressState::PartiallyComplete);

        progress.complete("l1-0");
        let full = ProgressSummary::of(Some(&progress), &course);
        assert_eq!(full.percent, 100);
        assert_eq!(full.state, ProgressState::FullyComplete);
    }

    #[test]
    fn summary_ignores_removed_lectures() {
        let mut course = fixtures::course(Uuid::new_v4(), &[2]);
        let mut progress = CourseProgress::new(Uuid::new_v4(), course.id, "l0-0");
        progress.complete("l0-1");

        course.content[0].lectures.pop();
        let summary = ProgressSummary::of(Some(&progress), &course);

        assert_eq!(summary.completed, 1);
        assert_eq!(summary.percent, 100);
        assert_eq!(progress.lecture_completed.len(), 2, "record keeps every id");
    }

    #[test]
    fn summary_regresses_when_lectures_are_added() {
        let mut course = fixtures::course(Uuid::new_v4(), &[1]);
        let progress = CourseProgress::new(Uuid::new_v4(), course.id, "l0-0");
        assert_eq!(
            ProgressSummary::of(Some(&progress), &course).state,
            ProgressState::FullyComplete
        );

        course.content[0]
            .lectures
            .push(fixtures::lecture("l0-new", 5, false));
        let summary = ProgressSummary::of(Some(&progress), &course);

        assert_eq!(summary.state, ProgressState::PartiallyComplete);
        assert_eq!(summary.percent, 50);
    }
}
