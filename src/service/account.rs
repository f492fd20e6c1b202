use super::{resolve_user, user_not_found, ServiceError, ServiceResult};
use crate::data::store::Store;
use crate::data::user::db::{UserLoginData, UserRegisterData};
use crate::data::user::{PasswordHash, User};
use crate::role::Role;

fn bad_login() -> ServiceError {
    ServiceError::Forbidden("Bad email or password.".to_string())
}

#[tracing::instrument(skip(store))]
pub async fn register(store: &dyn Store, data: UserRegisterData) -> ServiceResult<User> {
    data.validate()?;

    let pw_hash = PasswordHash::new(&data.password).map_err(|e| {
        tracing::error!("Unable to hash password: {}", e);
        ServiceError::InvalidArgument("Password can't be used.".to_string())
    })?;

    let mut user = User::new(data.full_name.trim(), &data.email, pw_hash, data.role);
    match data.role {
        Role::Student => {
            user.matric_number = data.matric_number;
            user.level = data.level;
            user.course_of_study = data.course_of_study;
        }
        Role::Educator => {
            user.staff_id = data.staff_id;
        }
    }

    store.insert_user(&user).await?;
    Ok(user)
}

#[tracing::instrument(skip(store))]
pub async fn login(store: &dyn Store, data: UserLoginData) -> ServiceResult<User> {
    // VULN: no throttling of repeated failed attempts
    let user = store
        .find_user_by_email(data.email.trim())
        .await?
        .ok_or_else(bad_login)?;

    if !user.pw_hash.verify(&data.password) {
        return Err(bad_login());
    }

    Ok(user)
}

pub async fn me(store: &dyn Store, email: &str) -> ServiceResult<User> {
    resolve_user(store, email).await
}

/// Grants the educator role. Calling it again changes nothing.
#[tracing::instrument(skip(store))]
pub async fn promote_to_educator(store: &dyn Store, email: &str) -> ServiceResult<User> {
    let user = resolve_user(store, email).await?;

    match user.role {
        Role::Educator => Ok(user),
        Role::Student => store
            .set_role(user.id, Role::Educator)
            .await?
            .ok_or_else(user_not_found),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::MemoryStore;

    fn registration(email: &str, role: Role) -> UserRegisterData {
        UserRegisterData {
            full_name: " Ada Lovelace ".to_string(),
            email: email.to_string(),
            password: "analytical engine".to_string(),
            role,
            matric_number: Some("CSC/19/0042".to_string()),
            level: Some("300".to_string()),
            course_of_study: None,
            staff_id: Some("STAFF-1".to_string()),
        }
    }

    fn credentials(email: &str, password: &str) -> UserLoginData {
        UserLoginData {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[rocket::async_test]
    async fn register_then_login() {
        let store = MemoryStore::new();
        let user = register(&store, registration("Ada@Example.com", Role::Student))
            .await
            .expect("registration succeeds");

        assert_eq!(user.email, "ada@example.com");
        assert_eq!(user.full_name, "Ada Lovelace");
        assert_eq!(user.matric_number.as_deref(), Some("CSC/19/0042"));
        assert_eq!(user.staff_id, None, "student keeps no staff id");

        let logged_in = login(&store, credentials("ada@example.com", "analytical engine"))
            .await
            .expect("login succeeds");
        assert_eq!(logged_in.id, user.id);

        let wrong = login(&store, credentials("ada@example.com", "difference engine")).await;
        assert!(matches!(wrong, Err(ServiceError::Forbidden(_))));
        let unknown = login(&store, credentials("bob@example.com", "analytical engine")).await;
        assert!(matches!(unknown, Err(ServiceError::Forbidden(_))));
    }

    #[rocket::async_test]
    async fn duplicate_email_conflicts() {
        let store = MemoryStore::new();
        register(&store, registration("ada@example.com", Role::Student))
            .await
            .unwrap();

        let again = register(&store, registration("ADA@example.com", Role::Educator)).await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));
    }

    #[rocket::async_test]
    async fn promotion_is_idempotent() {
        let store = MemoryStore::new();
        let user = register(&store, registration("ada@example.com", Role::Student))
            .await
            .unwrap();

        let promoted = promote_to_educator(&store, "ada@example.com").await.unwrap();
        assert_eq!(promoted.role, Role::Educator);
        let again = promote_to_educator(&store, "ada@example.com").await.unwrap();
        assert_eq!(again.role, Role::Educator);
        assert_eq!(again.id, user.id);

        let missing = promote_to_educator(&store, "bob@example.com").await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }
}
