use serde_json::Value;
use uuid::Uuid;

use super::{course_not_found, resolve_course, ServiceError, ServiceResult};
use crate::data::course::{RatingOutcome, MAX_RATING, MIN_RATING};
use crate::data::store::Store;

fn not_enrolled() -> ServiceError {
    ServiceError::Forbidden("Only enrolled students can rate this course.".to_string())
}

fn invalid_rating() -> ServiceError {
    ServiceError::InvalidArgument(format!(
        "Rating must be a whole number from {} to {}.",
        MIN_RATING, MAX_RATING
    ))
}

/// Reads a rating sent as a JSON number. Fractional values and other types
/// are rejected.
pub fn rating_value(value: &Value) -> ServiceResult<i64> {
    let rating = match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        _ => None,
    };

    rating.ok_or_else(invalid_rating)
}

/// Records `rating` for the course, replacing an earlier rating by the same
/// user.
#[tracing::instrument(skip(store))]
pub async fn rate(
    store: &dyn Store,
    email: &str,
    course_id: Uuid,
    rating: i64,
) -> ServiceResult<RatingOutcome> {
    if !(MIN_RATING..=MAX_RATING).contains(&rating) {
        return Err(invalid_rating());
    }

    let course = resolve_course(store, course_id).await?;
    let user = match store.find_user_by_email(email).await? {
        Some(user) if user.is_enrolled_in(course.id) => user,
        _ => return Err(not_enrolled()),
    };

    // Range checked above.
    let rating = rating as u8;
    let outcome = store
        .upsert_rating(course.id, user.id, rating)
        .await?
        .ok_or_else(course_not_found)?;
    tracing::info!("Rating {:?} by {}.", outcome, user.id);

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::MemoryStore;
    use crate::data::store::CatalogStore;
    use crate::role::Role;
    use crate::service::{enrollment, fixtures};

    #[rocket::async_test]
    async fn out_of_range_values_are_invalid() {
        let store = MemoryStore::new();
        fixtures::user(&store, "ada@example.com", Role::Student).await;

        // Checked before the course is even looked up.
        for value in [0, 6, -1] {
            let result = rate(&store, "ada@example.com", Uuid::new_v4(), value).await;
            assert!(matches!(result, Err(ServiceError::InvalidArgument(_))));
        }
    }

    #[test]
    fn only_whole_numbers_are_ratings() {
        assert_eq!(rating_value(&serde_json::json!(4)).unwrap(), 4);
        assert_eq!(rating_value(&serde_json::json!(5.0)).unwrap(), 5);
        assert!(rating_value(&serde_json::json!(4.5)).is_err());
        assert!(rating_value(&serde_json::json!("4")).is_err());
        assert!(rating_value(&serde_json::Value::Null).is_err());
    }

    #[rocket::async_test]
    async fn unknown_course_is_not_found() {
        let store = MemoryStore::new();
        fixtures::user(&store, "ada@example.com", Role::Student).await;

        let result = rate(&store, "ada@example.com", Uuid::new_v4(), 4).await;
        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }

    #[rocket::async_test]
    async fn only_enrolled_users_rate() {
        let store = MemoryStore::new();
        fixtures::user(&store, "ada@example.com", Role::Student).await;
        let course = fixtures::course(&store, &[1]).await;

        let stranger = rate(&store, "ada@example.com", course.id, 4).await;
        assert!(matches!(stranger, Err(ServiceError::Forbidden(_))));

        let ghost = rate(&store, "ghost@example.com", course.id, 4).await;
        assert!(matches!(ghost, Err(ServiceError::Forbidden(_))));
    }

    #[rocket::async_test]
    async fn rerating_replaces_in_place() {
        let store = MemoryStore::new();
        fixtures::user(&store, "ada@example.com", Role::Student).await;
        fixtures::user(&store, "bob@example.com", Role::Student).await;
        let course = fixtures::course(&store, &[1]).await;
        for email in ["ada@example.com", "bob@example.com"] {
            enrollment::enroll(&store, email, course.id, String::new())
                .await
                .unwrap();
        }

        assert_eq!(
            rate(&store, "ada@example.com", course.id, 2).await.unwrap(),
            RatingOutcome::Added
        );
        rate(&store, "bob@example.com", course.id, 5).await.unwrap();
        assert_eq!(
            rate(&store, "ada@example.com", course.id, 4).await.unwrap(),
            RatingOutcome::Updated
        );

        let course = store.get_course(course.id).await.unwrap().unwrap();
        assert_eq!(course.ratings.len(), 2);
        assert_eq!(course.ratings[0].rating, 4);
        assert_eq!(course.average_rating(), 4.5);
    }
}
