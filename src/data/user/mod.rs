use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{self, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{DateTime, Utc};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::role::Role;

pub mod db;

pub static USER_COLLECTION_NAME: &str = "users";

/// Argon2 PHC string.
#[derive(Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn new(password: impl AsRef<str>) -> Result<PasswordHash, password_hash::Error> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(password.as_ref().as_bytes(), &salt)?;

        Ok(PasswordHash(hash.to_string()))
    }

    pub fn verify(&self, password: impl AsRef<str>) -> bool {
        match password_hash::PasswordHash::new(&self.0) {
            Ok(parsed) => Argon2::default()
                .verify_password(password.as_ref().as_bytes(), &parsed)
                .is_ok(),
            Err(_) => {
                tracing::warn!("Stored password hash is not a valid PHC string.");
                false
            }
        }
    }

    /// A hash no password verifies against.
    #[cfg(test)]
    pub fn unusable() -> PasswordHash {
        PasswordHash(String::from("!"))
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PasswordHash(..)")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub pw_hash: PasswordHash,
    pub role: Role,

    #[serde(default)]
    pub enrolled_courses: Vec<Uuid>,

    // Student details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matric_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_of_study: Option<String>,

    // Educator details
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,

    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

impl User {
    pub fn new(
        full_name: impl ToString,
        email: impl AsRef<str>,
        pw_hash: PasswordHash,
        role: Role,
    ) -> User {
        let id = Uuid::new_v4();
        tracing::info!("Creating a new {} with UUID: {}", role, id);

        User {
            id,
            full_name: full_name.to_string(),
            email: email.as_ref().trim().to_lowercase(),
            pw_hash,
            role,
            enrolled_courses: vec![],
            matric_number: None,
            level: None,
            course_of_study: None,
            staff_id: None,
            created: Utc::now(),
        }
    }

    pub fn is_enrolled_in(&self, course: Uuid) -> bool {
        self.enrolled_courses.contains(&course)
    }
}

/// Public view of a [`User`], without credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub role: Role,
    pub enrolled_courses: Vec<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matric_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course_of_study: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,
    pub created: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        UserResponse {
            id: user.id,
            full_name: user.full_name,
            email: user.email,
            role: user.role,
            enrolled_courses: user.enrolled_courses,
            matric_number: user.matric_number,
            level: user.level,
            course_of_study: user.course_of_study,
            staff_id: user.staff_id,
            created: user.created,
        }
    }
}

/// Minimal student info shown to educators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct StudentInfo {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
}

impl From<&User> for StudentInfo {
    fn from(user: &User) -> Self {
        StudentInfo {
            id: user.id,
            full_name: user.full_name.clone(),
            email: user.email.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_rejects_other_passwords() {
        let hash = PasswordHash::new("correct horse battery").expect("hashing works");

        assert!(hash.verify("correct horse battery"));
        assert!(!hash.verify("wrong horse battery"));
        assert!(!PasswordHash::unusable().verify(""));
    }

    #[test]
    fn user_document_round_trips_through_bson() {
        let mut user = User::new("Ada Lovelace", " Ada@Example.com ", PasswordHash::unusable(), Role::Student);
        user.enrolled_courses.push(Uuid::new_v4());
        user.matric_number = Some("CSC/19/0042".to_string());

        let document = bson::to_document(&user).expect("user serializes");
        assert_eq!(document.get_str("_id").unwrap(), user.id.to_string());
        assert_eq!(document.get_str("email").unwrap(), "ada@example.com");
        assert_eq!(document.get_str("role").unwrap(), "student");
        assert!(!document.contains_key("staff_id"));

        let decoded: User = bson::from_document(document).expect("user deserializes");
        assert_eq!(decoded.id, user.id);
        assert_eq!(decoded.enrolled_courses, user.enrolled_courses);
        assert!(decoded.is_enrolled_in(user.enrolled_courses[0]));
    }

    #[test]
    fn public_view_hides_password() {
        let user = User::new("Ada", "ada@example.com", PasswordHash::unusable(), Role::Educator);
        let json = serde_json::to_value(UserResponse::from(user)).unwrap();

        assert!(json.get("pw_hash").is_none());
        assert_eq!(json["role"], "educator");
    }
}
