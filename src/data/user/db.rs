use bson::{doc, Document};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::{Collection, Database};
use rocket::futures::TryStreamExt;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{User, USER_COLLECTION_NAME};
use crate::data::filter;
use crate::data::store::AccountStore;
use crate::error::{StoreError, StoreResult};
use crate::role::Role;
use crate::service::ServiceError;

const MIN_PASSWORD_LENGTH: usize = 8;
const MAX_PASSWORD_LENGTH: usize = 1024;
const MAX_NAME_LENGTH: usize = 100;

#[cfg(feature = "validation-regex")]
const EMAIL_PATTERN: &str = r"^[^@\s]+@[^@\s]+\.[^@\s]+$";

#[derive(Clone, Deserialize, ToSchema)]
pub struct UserRegisterData {
    pub full_name: String,
    #[schema(format = "email")]
    pub email: String,
    #[schema(format = "password")]
    pub password: String,
    #[serde(default)]
    pub role: Role,

    #[serde(default)]
    pub matric_number: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
    #[serde(default)]
    pub course_of_study: Option<String>,
    #[serde(default)]
    pub staff_id: Option<String>,
}

impl std::fmt::Debug for UserRegisterData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserRegisterInfo:{}:{}", self.email, self.role)
    }
}

#[cfg(feature = "validation-regex")]
fn is_email(value: &str) -> bool {
    regex::Regex::new(EMAIL_PATTERN)
        .map(|re| re.is_match(value))
        .unwrap_or(false)
}

#[cfg(not(feature = "validation-regex"))]
fn is_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => !local.is_empty() && domain.contains('.'),
        None => false,
    }
}

impl UserRegisterData {
    pub fn validate(&self) -> Result<(), ServiceError> {
        let invalid = |detail: &str| Err(ServiceError::InvalidArgument(detail.to_string()));

        if !is_email(self.email.trim()) {
            return invalid("Not a valid e-mail address.");
        }

        if self.full_name.trim().is_empty() {
            return invalid("Full name is required.");
        }

        if self.full_name.len() > MAX_NAME_LENGTH {
            return invalid("Full name can't be longer than 100 characters (bytes).");
        }

        if self.password.len() < MIN_PASSWORD_LENGTH {
            return invalid("Password must be at least 8 characters (bytes) long.");
        }

        if self.password.len() > MAX_PASSWORD_LENGTH {
            return invalid("Passwords longer than 1024 characters aren't supported.");
        }

        Ok(())
    }
}

#[derive(Clone, Deserialize, ToSchema)]
pub struct UserLoginData {
    #[schema(format = "email")]
    pub email: String,
    #[schema(format = "password")]
    pub password: String,
}

impl std::fmt::Debug for UserLoginData {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "UserLoginInfo:{}", self.email)
    }
}

#[inline]
fn users(db: &Database) -> Collection<Document> {
    db.collection(USER_COLLECTION_NAME)
}

fn decode_users(documents: Vec<Document>) -> Vec<User> {
    documents
        .into_iter()
        .filter_map(|document| match bson::from_document(document) {
            Ok(user) => Some(user),
            Err(_) => {
                tracing::warn!("Unable to deserialize User document.");
                None
            }
        })
        .collect()
}

#[rocket::async_trait]
impl AccountStore for Database {
    async fn insert_user(&self, user: &User) -> StoreResult<()> {
        let document = bson::to_document(user)?;

        match users(self).insert_one(document, None).await {
            Ok(_) => Ok(()),
            Err(e) => {
                let e = StoreError::from(e);
                if e.is_duplicate_key() {
                    Err(StoreError::Conflict(format!("user '{}'", user.email)))
                } else {
                    Err(e)
                }
            }
        }
    }

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        match users(self).find_one(filter::by_id(id), None).await? {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        match users(self).find_one(filter::by_email(email), None).await? {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    async fn get_users(&self, ids: &[Uuid]) -> StoreResult<Vec<User>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let documents: Vec<Document> = users(self)
            .find(filter::by_ids(ids), None)
            .await?
            .try_collect()
            .await?;

        Ok(decode_users(documents))
    }

    async fn add_enrolled_course(&self, user: Uuid, course: Uuid) -> StoreResult<bool> {
        let result = users(self)
            .update_one(
                filter::by_id(user),
                doc! { "$addToSet": { "enrolled_courses": course.to_string() } },
                None,
            )
            .await?;

        Ok(result.modified_count > 0)
    }

    async fn remove_enrolled_course(&self, user: Uuid, course: Uuid) -> StoreResult<()> {
        users(self)
            .update_one(
                filter::by_id(user),
                doc! { "$pull": { "enrolled_courses": course.to_string() } },
                None,
            )
            .await?;

        Ok(())
    }

    async fn set_role(&self, user: Uuid, role: Role) -> StoreResult<Option<User>> {
        let options = FindOneAndUpdateOptions::builder()
            .return_document(ReturnDocument::After)
            .build();

        match users(self)
            .find_one_and_update(
                filter::by_id(user),
                doc! { "$set": { "role": role.to_string() } },
                options,
            )
            .await?
        {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(email: &str, password: &str) -> UserRegisterData {
        UserRegisterData {
            full_name: "Ada Lovelace".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: Role::Student,
            matric_number: None,
            level: None,
            course_of_study: None,
            staff_id: None,
        }
    }

    #[test]
    fn registration_rules() {
        assert!(registration("ada@example.com", "analytical").validate().is_ok());
        assert!(registration("ada.example.com", "analytical").validate().is_err());
        assert!(registration("ada@example.com", "short").validate().is_err());

        let mut nameless = registration("ada@example.com", "analytical");
        nameless.full_name = "  ".to_string();
        assert!(matches!(
            nameless.validate(),
            Err(ServiceError::InvalidArgument(_))
        ));
    }

    #[test]
    fn debug_output_hides_password() {
        let data = registration("ada@example.com", "analytical");
        assert!(!format!("{:?}", data).contains("analytical"));
    }
}
