use bson::{doc, Document};
use mongodb::options::UpdateOptions;
use mongodb::{Collection, Database};
use uuid::Uuid;

use super::{CourseProgress, MarkOutcome, PROGRESS_COLLECTION_NAME};
use crate::data::filter;
use crate::data::store::ProgressStore;
use crate::error::{StoreError, StoreResult};

#[inline]
fn progress(db: &Database) -> Collection<Document> {
    db.collection(PROGRESS_COLLECTION_NAME)
}

fn mark_outcome(upserted: bool, modified_count: u64) -> MarkOutcome {
    if upserted {
        MarkOutcome::Created
    } else if modified_count > 0 {
        MarkOutcome::Appended
    } else {
        MarkOutcome::AlreadyCompleted
    }
}

#[rocket::async_trait]
impl ProgressStore for Database {
    async fn find_progress(
        &self,
        user: Uuid,
        course: Uuid,
    ) -> StoreResult<Option<CourseProgress>> {
        match progress(self)
            .find_one(filter::by_user_and_course(user, course), None)
            .await?
        {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    async fn mark_lecture(
        &self,
        user: Uuid,
        course: Uuid,
        lecture: &str,
    ) -> StoreResult<MarkOutcome> {
        let filter = filter::by_user_and_course(user, course);
        let update = doc! {
            "$addToSet": { "lecture_completed": lecture },
            "$setOnInsert": { "_id": Uuid::new_v4().to_string() },
        };
        let options = UpdateOptions::builder().upsert(true).build();

        // Two first completions racing on the same pair can both attempt the
        // insert. The unique (user_id, course_id) index rejects the loser,
        // whose retry then matches the winner's record.
        let mut retried = false;
        loop {
            match progress(self)
                .update_one(filter.clone(), update.clone(), options.clone())
                .await
            {
                Ok(result) => {
                    return Ok(mark_outcome(
                        result.upserted_id.is_some(),
                        result.modified_count,
                    ))
                }
                Err(e) => {
                    let e = StoreError::from(e);
                    if e.is_duplicate_key() && !retried {
                        tracing::debug!(
                            "progress record for ({}, {}) created concurrently, retrying",
                            user,
                            course
                        );
                        retried = true;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }
}
