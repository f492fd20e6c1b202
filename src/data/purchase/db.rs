use bson::{doc, Document};
use mongodb::{Collection, Database};
use rocket::futures::TryStreamExt;
use uuid::Uuid;

use super::{Purchase, PURCHASE_COLLECTION_NAME};
use crate::data::filter;
use crate::data::store::PurchaseStore;
use crate::error::StoreResult;

#[inline]
fn purchases(db: &Database) -> Collection<Document> {
    db.collection(PURCHASE_COLLECTION_NAME)
}

#[rocket::async_trait]
impl PurchaseStore for Database {
    async fn insert_purchase(&self, purchase: &Purchase) -> StoreResult<()> {
        purchases(self)
            .insert_one(bson::to_document(purchase)?, None)
            .await?;
        Ok(())
    }

    async fn delete_purchase(&self, id: Uuid) -> StoreResult<()> {
        purchases(self).delete_one(filter::by_id(id), None).await?;
        Ok(())
    }

    async fn purchases_for_courses(&self, courses: &[Uuid]) -> StoreResult<Vec<Purchase>> {
        if courses.is_empty() {
            return Ok(vec![]);
        }

        let documents: Vec<Document> = purchases(self)
            .find(
                doc! { "course_id": { "$in": filter::uuid_array(courses) } },
                None,
            )
            .await?
            .try_collect()
            .await?;

        Ok(documents
            .into_iter()
            .filter_map(|document| match bson::from_document(document) {
                Ok(purchase) => Some(purchase),
                Err(_) => {
                    tracing::warn!("Unable to deserialize Purchase document.");
                    None
                }
            })
            .collect())
    }
}
