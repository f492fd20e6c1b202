use utoipa::ToSchema;
use uuid::Uuid;

use super::{resolve_course, resolve_user, ServiceError, ServiceResult};
use crate::data::progress::{CourseProgress, MarkOutcome, ProgressSummary};
use crate::data::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ProgressReport {
    /// Stored record, `null` until the first lecture is completed.
    pub progress_data: Option<CourseProgress>,
    pub summary: ProgressSummary,
}

pub fn outcome_message(outcome: MarkOutcome) -> &'static str {
    match outcome {
        MarkOutcome::Created | MarkOutcome::Appended => "Progress updated.",
        MarkOutcome::AlreadyCompleted => "Lecture already completed.",
    }
}

#[tracing::instrument(skip(store))]
pub async fn mark_lecture_complete(
    store: &dyn Store,
    email: &str,
    course_id: Uuid,
    lecture_id: &str,
) -> ServiceResult<MarkOutcome> {
    let user = resolve_user(store, email).await?;
    let course = resolve_course(store, course_id).await?;

    if !course.has_lecture(lecture_id) {
        return Err(ServiceError::InvalidArgument(format!(
            "Lecture '{}' isn't part of this course.",
            lecture_id
        )));
    }

    let outcome = store.mark_lecture(user.id, course.id, lecture_id).await?;
    tracing::debug!("lecture completion outcome: {:?}", outcome);

    Ok(outcome)
}

pub async fn get_progress(
    store: &dyn Store,
    email: &str,
    course_id: Uuid,
) -> ServiceResult<ProgressReport> {
    let user = resolve_user(store, email).await?;
    let course = resolve_course(store, course_id).await?;
    let progress = store.find_progress(user.id, course.id).await?;

    Ok(ProgressReport {
        summary: ProgressSummary::of(progress.as_ref(), &course),
        progress_data: progress,
    })
}
