//! Process-local store used for development without MongoDB and by tests.
//!
//! Every write holds the collection's write lock for its whole
//! find-then-update step, which gives the same per-document atomicity the
//! MongoDB implementation gets from update operators.

use std::collections::HashMap;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;
use uuid::Uuid;

use crate::data::course::{Course, RatingOutcome};
use crate::data::progress::{CourseProgress, MarkOutcome};
use crate::data::purchase::Purchase;
use crate::data::store::{AccountStore, CatalogStore, ProgressStore, PurchaseStore};
use crate::data::user::User;
use crate::error::{StoreError, StoreResult};
use crate::middleware::paging::PageState;
use crate::role::Role;

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, User>>,
    courses: RwLock<HashMap<Uuid, Course>>,
    progress: RwLock<HashMap<(Uuid, Uuid), CourseProgress>>,
    purchases: RwLock<Vec<Purchase>>,

    /// Makes `add_enrolled_student` fail, for exercising compensation.
    #[cfg(test)]
    pub fail_student_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    #[cfg(test)]
    fn check_student_writes(&self) -> StoreResult<()> {
        if self.fail_student_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("course writes disabled".to_string()));
        }
        Ok(())
    }

    #[cfg(not(test))]
    #[inline]
    fn check_student_writes(&self) -> StoreResult<()> {
        Ok(())
    }

    #[cfg(test)]
    pub async fn purchase_count(&self) -> usize {
        self.purchases.read().await.len()
    }
}

fn sorted_by_title(mut courses: Vec<Course>) -> Vec<Course> {
    courses.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));
    courses
}

#[rocket::async_trait]
impl AccountStore for MemoryStore {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let mut users = self.users.write().await;
        if users.values().any(|existing| existing.email == user.email) {
            return Err(StoreError::Conflict(format!("user '{}'", user.email)));
        }
        users.insert(user.id, user.clone());
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let email = email.to_lowercase();
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|user| user.email == email)
            .cloned())
    }

    async fn get_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        let users = self.users.read().await;
        Ok(ids.iter().filter_map(|id| users.get(id).cloned()).collect())
    }

    async fn add_enrolled_course(&self, user: Uuid, course: Uuid) -> StoreResult<bool> {
        match self.users.write().await.get_mut(&user) {
            Some(user) if !user.enrolled_courses.contains(&course) => {
                user.enrolled_courses.push(course);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove_enrolled_course(&self, user: Uuid, course: Uuid) -> StoreResult<()> {
        if let Some(user) = self.users.write().await.get_mut(&user) {
            user.enrolled_courses.retain(|c| *c != course);
        }
        Ok(())
    }

    async fn set_role(&self, user: Uuid, role: Role) -> StoreResult<Option<User>> {
        Ok(self.users.write().await.get_mut(&user).map(|user| {
            user.role = role;
            user.clone()
        }))
    }
}

#[rocket::async_trait]
impl CatalogStore for MemoryStore {
    async fn insert_course(&self, course: &Course) -> StoreResult<()> {
        self.courses.write().await.insert(course.id, course.clone());
        Ok(())
    }

    async fn get_course(&self, id: Uuid) -> StoreResult<Option<Course>> {
        Ok(self.courses.read().await.get(&id).cloned())
    }

    async fn get_courses(&self, ids: &[Uuid]) -> StoreResult<Vec<Course>> {
        let courses = self.courses.read().await;
        Ok(sorted_by_title(
            ids.iter().filter_map(|id| courses.get(id).cloned()).collect(),
        ))
    }

    async fn list_courses(
        &self,
        published_only: bool,
        page: PageState,
    ) -> StoreResult<Vec<Course>> {
        let courses = self.courses.read().await;
        let matching = courses
            .values()
            .filter(|course| !published_only || course.published)
            .cloned()
            .collect();

        Ok(sorted_by_title(matching)
            .into_iter()
            .skip(page.skip() as usize)
            .take(page.page_length as usize)
            .collect())
    }

    async fn courses_by_educator(&self, educator: Uuid) -> StoreResult<Vec<Course>> {
        let courses = self.courses.read().await;
        Ok(sorted_by_title(
            courses
                .values()
                .filter(|course| course.educator == educator)
                .cloned()
                .collect(),
        ))
    }

    async fn add_enrolled_student(&self, course: Uuid, user: Uuid) -> StoreResult<bool> {
        self.check_student_writes()?;

        match self.courses.write().await.get_mut(&course) {
            Some(course) if !course.enrolled_students.contains(&user) => {
                course.enrolled_students.push(user);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_rating(
        &self,
        course: Uuid,
        user: Uuid,
        rating: u8,
    ) -> StoreResult<Option<RatingOutcome>> {
        Ok(self
            .courses
            .write()
            .await
            .get_mut(&course)
            .map(|course| course.upsert_rating(user, rating)))
    }
}

#[rocket::async_trait]
impl ProgressStore for MemoryStore {
    async fn find_progress(
        &self,
        user: Uuid,
        course: Uuid,
    ) -> StoreResult<Option<CourseProgress>> {
        Ok(self.progress.read().await.get(&(user, course)).cloned())
    }

    async fn mark_lecture(
        &self,
        user: Uuid,
        course: Uuid,
        lecture: &str,
    ) -> StoreResult<MarkOutcome> {
        let mut progress = self.progress.write().await;
        match progress.get_mut(&(user, course)) {
            Some(record) => {
                if record.complete(lecture) {
                    Ok(MarkOutcome::Appended)
                } else {
                    Ok(MarkOutcome::AlreadyCompleted)
                }
            }
            None => {
                progress.insert((user, course), CourseProgress::new(user, course, lecture));
                Ok(MarkOutcome::Created)
            }
        }
    }
}

#[rocket::async_trait]
impl PurchaseStore for MemoryStore {
    async fn insert_purchase(&self, purchase: &Purchase) -> StoreResult<()> {
        self.purchases.write().await.push(purchase.clone());
        Ok(())
    }

    async fn delete_purchase(&self, id: Uuid) -> StoreResult<()> {
        self.purchases.write().await.retain(|p| p.id != id);
        Ok(())
    }

    async fn purchases_for_courses(&self, courses: &[Uuid]) -> StoreResult<Vec<Purchase>> {
        Ok(self
            .purchases
            .read()
            .await
            .iter()
            .filter(|p| courses.contains(&p.course_id))
            .cloned()
            .collect())
    }
}
