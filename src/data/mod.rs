use bson::{doc, Document};
use mongodb::options::IndexOptions;
use mongodb::{Database, IndexModel};

use crate::error::StoreResult;

pub mod course;
pub mod filter;
pub mod memory;
pub mod progress;
pub mod purchase;
pub mod store;
pub mod user;

/// Creates the indexes the stores rely on. Uniqueness of user emails and of
/// progress (user, course) pairs is enforced here rather than in code.
pub async fn ensure_indexes(db: &Database) -> StoreResult<()> {
    let unique = || IndexOptions::builder().unique(true).build();

    db.collection::<Document>(user::USER_COLLECTION_NAME)
        .create_index(
            IndexModel::builder()
                .keys(doc! { "email": 1 })
                .options(unique())
                .build(),
            None,
        )
        .await?;

    db.collection::<Document>(progress::PROGRESS_COLLECTION_NAME)
        .create_index(
            IndexModel::builder()
                .keys(doc! { "user_id": 1, "course_id": 1 })
                .options(unique())
                .build(),
            None,
        )
        .await?;

    db.collection::<Document>(course::COURSE_COLLECTION_NAME)
        .create_index(
            IndexModel::builder().keys(doc! { "educator": 1 }).build(),
            None,
        )
        .await?;

    db.collection::<Document>(purchase::PURCHASE_COLLECTION_NAME)
        .create_index(
            IndexModel::builder().keys(doc! { "course_id": 1 }).build(),
            None,
        )
        .await?;

    tracing::info!("MongoDB indexes are in place.");
    Ok(())
}
