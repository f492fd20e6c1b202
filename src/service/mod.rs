//! Course platform operations.
//!
//! Services take a [`Store`] and the caller's verified identity and return a
//! [`ServiceResult`]. They never touch HTTP; the route layer wraps their
//! output into replies.

use thiserror::Error;
use uuid::Uuid;

use crate::data::course::Course;
use crate::data::store::Store;
use crate::data::user::User;
use crate::error::StoreError;

pub mod account;
pub mod catalog;
pub mod educator;
pub mod enrollment;
pub mod progress;
pub mod rating;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    Conflict(String),
    #[error("internal error: {0}")]
    Internal(StoreError),
}

impl ServiceError {
    /// Machine readable name of the failure, sent to clients as `error`.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::NotFound(_) => "not_found",
            ServiceError::InvalidArgument(_) => "invalid_argument",
            ServiceError::Forbidden(_) => "forbidden",
            ServiceError::Conflict(_) => "conflict",
            ServiceError::Internal(_) => "internal",
        }
    }

    /// Text safe to show to the client. Store details stay in the logs.
    pub fn message(&self) -> String {
        match self {
            ServiceError::Internal(_) => "Something went wrong, please try again.".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for ServiceError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Conflict(what) => {
                ServiceError::Conflict(format!("{} already exists.", what))
            }
            other => ServiceError::Internal(other),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

pub(crate) fn user_not_found() -> ServiceError {
    ServiceError::NotFound("User not found.".to_string())
}

pub(crate) fn course_not_found() -> ServiceError {
    ServiceError::NotFound("Course not found.".to_string())
}

pub(crate) async fn resolve_user(store: &dyn Store, email: &str) -> ServiceResult<User> {
    store
        .find_user_by_email(email)
        .await?
        .ok_or_else(user_not_found)
}

pub(crate) async fn resolve_course(store: &dyn Store, id: Uuid) -> ServiceResult<Course> {
    store.get_course(id).await?.ok_or_else(course_not_found)
}
