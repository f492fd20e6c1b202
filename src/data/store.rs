//! Persistence boundaries of the backend.
//!
//! Each trait covers one document collection. [`mongodb::Database`]
//! implements all of them (see the `db` module of each data type) and so does
//! [`super::memory::MemoryStore`]. Operations that must hold under concurrent
//! requests (set insertion, progress upsert, rating upsert) are single store
//! primitives rather than read-modify-write pairs in the services.

use std::sync::Arc;
use uuid::Uuid;

use crate::data::course::{Course, RatingOutcome};
use crate::data::progress::{CourseProgress, MarkOutcome};
use crate::data::purchase::Purchase;
use crate::data::user::User;
use crate::error::StoreResult;
use crate::middleware::paging::PageState;
use crate::role::Role;

#[rocket::async_trait]
pub trait AccountStore: Send + Sync {
    /// Fails with [`crate::error::StoreError::Conflict`] if the email is taken.
    async fn insert_user(&self, user: &User) -> StoreResult<()>;

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;
    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>>;
    async fn get_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>>;

    /// Adds `course` to the user's enrolled set unless already present.
    /// Returns whether the set changed.
    async fn add_enrolled_course(&self, user: Uuid, course: Uuid) -> StoreResult<bool>;
    async fn remove_enrolled_course(&self, user: Uuid, course: Uuid) -> StoreResult<()>;

    async fn set_role(&self, user: Uuid, role: Role) -> StoreResult<Option<User>>;
}

#[rocket::async_trait]
pub trait CatalogStore: Send + Sync {
    async fn insert_course(&self, course: &Course) -> StoreResult<()>;

    async fn get_course(&self, id: Uuid) -> StoreResult<Option<Course>>;
    async fn get_courses(&self, ids: &[Uuid]) -> StoreResult<Vec<Course>>;
    async fn list_courses(&self, published_only: bool, page: PageState)
        -> StoreResult<Vec<Course>>;
    async fn courses_by_educator(&self, educator: Uuid) -> StoreResult<Vec<Course>>;

    /// Adds `user` to the course's enrolled students unless already present.
    /// Returns whether the set changed.
    async fn add_enrolled_student(&self, course: Uuid, user: Uuid) -> StoreResult<bool>;

    /// Overwrites the rating `user` gave the course, keeping its position, or
    /// appends a new one. `None` if the course doesn't exist.
    async fn upsert_rating(
        &self,
        course: Uuid,
        user: Uuid,
        rating: u8,
    ) -> StoreResult<Option<RatingOutcome>>;
}

#[rocket::async_trait]
pub trait ProgressStore: Send + Sync {
    async fn find_progress(&self, user: Uuid, course: Uuid)
        -> StoreResult<Option<CourseProgress>>;

    /// Find-or-create the (user, course) record and add `lecture` to its
    /// completed set, as one atomic step.
    async fn mark_lecture(&self, user: Uuid, course: Uuid, lecture: &str)
        -> StoreResult<MarkOutcome>;
}

#[rocket::async_trait]
pub trait PurchaseStore: Send + Sync {
    async fn insert_purchase(&self, purchase: &Purchase) -> StoreResult<()>;
    async fn delete_purchase(&self, id: Uuid) -> StoreResult<()>;
    async fn purchases_for_courses(&self, courses: &[Uuid]) -> StoreResult<Vec<Purchase>>;
}

pub trait Store: AccountStore + CatalogStore + ProgressStore + PurchaseStore {}

impl<T> Store for T where T: AccountStore + CatalogStore + ProgressStore + PurchaseStore {}

/// Store handle managed by Rocket.
pub type SharedStore = Arc<dyn Store>;
