//! Common MongoDB query filters. Identifiers are stored as hyphenated UUID
//! strings.
use bson::{doc, Bson, Document};
use uuid::Uuid;

#[inline]
pub fn by_id(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

#[inline]
pub fn by_ids(ids: &[Uuid]) -> Document {
    doc! { "_id": { "$in": uuid_array(ids) } }
}

#[inline]
pub fn by_email(email: impl AsRef<str>) -> Document {
    doc! { "email": email.as_ref().to_lowercase() }
}

#[inline]
pub fn by_user_and_course(user: Uuid, course: Uuid) -> Document {
    doc! {
        "user_id": user.to_string(),
        "course_id": course.to_string(),
    }
}

pub fn uuid_array(ids: &[Uuid]) -> Vec<Bson> {
    ids.iter().map(|id| Bson::String(id.to_string())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emails_are_matched_case_insensitively() {
        assert_eq!(by_email("Ada@Example.com"), doc! { "email": "ada@example.com" });
    }

    #[test]
    fn id_filters_use_hyphenated_strings() {
        let id = Uuid::new_v4();
        assert_eq!(by_id(id), doc! { "_id": id.to_string() });
        assert_eq!(
            by_ids(&[id]),
            doc! { "_id": { "$in": [id.to_string()] } }
        );
    }
}
