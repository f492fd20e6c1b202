use tracing_futures::Instrument;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{resolve_course, resolve_user, ServiceError, ServiceResult};
use crate::data::course::Course;
use crate::data::purchase::Purchase;
use crate::data::store::Store;
use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EnrollmentResult {
    pub purchase: Purchase,
    /// Where the client continues after enrolling.
    pub session_url: String,
}

/// Writes already applied by an enrollment, undone in reverse order when a
/// later write fails.
#[derive(Debug, Default)]
struct Applied {
    purchase: Option<Uuid>,
    user_membership: bool,
}

impl Applied {
    async fn undo(self, store: &dyn Store, user: Uuid, course: Uuid) {
        if self.user_membership {
            if let Err(e) = store.remove_enrolled_course(user, course).await {
                tracing::error!(
                    "Unable to remove course {} from user {} after failed enrollment: {}",
                    course,
                    user,
                    e
                );
            }
        }

        if let Some(purchase) = self.purchase {
            if let Err(e) = store.delete_purchase(purchase).await {
                tracing::error!(
                    "Unable to delete purchase {} after failed enrollment: {}",
                    purchase,
                    e
                );
            }
        }
    }
}

/// Records a purchase and adds the user and the course to each other's
/// enrollment sets. Enrolling again is harmless: memberships stay single,
/// though another purchase record is written.
pub async fn enroll(
    store: &dyn Store,
    email: &str,
    course_id: Uuid,
    session_url: String,
) -> ServiceResult<EnrollmentResult> {
    let user = resolve_user(store, email).await?;
    let course = resolve_course(store, course_id).await?;
    let purchase = Purchase::completed(user.id, &course);

    let span = tracing::info_span!("enroll", user = %user.id, course = %course.id);
    async move {
        let mut applied = Applied::default();

        let result = async {
            store.insert_purchase(&purchase).await?;
            applied.purchase = Some(purchase.id);

            applied.user_membership = store.add_enrolled_course(user.id, course.id).await?;
            if !store.add_enrolled_student(course.id, user.id).await? {
                tracing::debug!("user was already listed as a student");
            }
            Ok::<(), StoreError>(())
        }
        .await;

        match result {
            Ok(()) => {
                tracing::info!("Enrolled for {:.2}.", purchase.amount);
                Ok(EnrollmentResult {
                    purchase,
                    session_url,
                })
            }
            Err(e) => {
                tracing::error!("Enrollment failed, rolling back: {}", e);
                applied.undo(store, user.id, course.id).await;
                Err(ServiceError::Internal(e))
            }
        }
    }
    .instrument(span)
    .await
}

/// Courses the user is enrolled in, with their full content.
pub async fn enrolled_courses(store: &dyn Store, email: &str) -> ServiceResult<Vec<Course>> {
    let user = resolve_user(store, email).await?;
    Ok(store.get_courses(&user.enrolled_courses).await?)
}
