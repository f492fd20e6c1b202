use bson::{doc, Document};
use chrono::Utc;
use mongodb::options::FindOptions;
use mongodb::{Collection, Database};
use rocket::futures::TryStreamExt;
use utoipa::ToSchema;
use uuid::Uuid;

use super::{Chapter, Course, CourseRating, Lecture, LectureKind, RatingOutcome, COURSE_COLLECTION_NAME};
use crate::data::filter;
use crate::data::store::CatalogStore;
use crate::error::{StoreError, StoreResult};
use crate::middleware::paging::PageState;
use crate::service::ServiceError;
use crate::util::content_id;

const MAX_TITLE_LENGTH: usize = 200;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LectureData {
    #[serde(default)]
    pub lecture_id: Option<String>,
    pub title: String,
    pub duration: u32,
    #[serde(default)]
    pub url: Option<String>,
    pub kind: LectureKind,
    #[serde(default)]
    pub preview_free: bool,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ChapterData {
    #[serde(default)]
    pub chapter_id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub lectures: Vec<LectureData>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CourseCreateData {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default = "super::published_default")]
    pub published: bool,
    pub content: Vec<ChapterData>,
}

impl CourseCreateData {
    pub fn validate(&self) -> Result<(), ServiceError> {
        let invalid = |detail: &str| Err(ServiceError::InvalidArgument(detail.to_string()));

        if self.title.trim().is_empty() {
            return invalid("Course title is required.");
        }
        if self.title.len() > MAX_TITLE_LENGTH {
            return invalid("Course title can't be longer than 200 characters (bytes).");
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return invalid("Course price can't be negative.");
        }
        if !self.discount.is_finite() || !(0.0..=100.0).contains(&self.discount) {
            return invalid("Discount must be a percentage between 0 and 100.");
        }
        if self.content.is_empty() {
            return invalid("Course needs at least one chapter.");
        }

        for chapter in &self.content {
            if chapter.title.trim().is_empty() {
                return invalid("Every chapter needs a title.");
            }
            if chapter.lectures.is_empty() {
                return invalid("Every chapter needs at least one lecture.");
            }
            for lecture in &chapter.lectures {
                if lecture.title.trim().is_empty() {
                    return invalid("Every lecture needs a title.");
                }
                if lecture.duration == 0 {
                    return invalid("Lecture duration must be a positive number of minutes.");
                }
                if lecture.url.as_deref().map_or(true, |url| url.trim().is_empty()) {
                    return invalid("Every lecture needs a content URL.");
                }
            }
        }

        let mut lecture_ids: Vec<&str> = self
            .content
            .iter()
            .flat_map(|c| c.lectures.iter())
            .filter_map(|l| l.lecture_id.as_deref())
            .collect();
        let given = lecture_ids.len();
        lecture_ids.sort_unstable();
        lecture_ids.dedup();
        if lecture_ids.len() != given {
            return invalid("Lecture identifiers must be unique within a course.");
        }

        Ok(())
    }

    /// Builds the stored course, numbering chapters and lectures in the order
    /// they were given and generating missing identifiers.
    pub fn into_course(self, educator: Uuid) -> Course {
        let content = self
            .content
            .into_iter()
            .enumerate()
            .map(|(c, chapter)| Chapter {
                chapter_id: chapter.chapter_id.unwrap_or_else(content_id),
                title: chapter.title,
                order: c as u32 + 1,
                lectures: chapter
                    .lectures
                    .into_iter()
                    .enumerate()
                    .map(|(l, lecture)| Lecture {
                        lecture_id: lecture.lecture_id.unwrap_or_else(content_id),
                        title: lecture.title,
                        duration: lecture.duration,
                        url: lecture.url,
                        kind: lecture.kind,
                        preview_free: lecture.preview_free,
                        order: l as u32 + 1,
                    })
                    .collect(),
            })
            .collect();

        Course {
            id: Uuid::new_v4(),
            title: self.title.trim().to_string(),
            description: self.description,
            thumbnail: self.thumbnail,
            price: self.price,
            discount: self.discount,
            published: self.published,
            content,
            ratings: vec![],
            enrolled_students: vec![],
            educator,
            created: Utc::now(),
        }
    }
}

#[inline]
fn courses(db: &Database) -> Collection<Document> {
    db.collection(COURSE_COLLECTION_NAME)
}

fn decode_courses(documents: Vec<Document>) -> Vec<Course> {
    documents
        .into_iter()
        .filter_map(|document| match bson::from_document(document) {
            Ok(course) => Some(course),
            Err(_) => {
                tracing::warn!("Unable to deserialize Course document.");
                None
            }
        })
        .collect()
}

async fn find_courses(
    db: &Database,
    filter: Document,
    options: impl Into<Option<FindOptions>>,
) -> StoreResult<Vec<Course>> {
    let documents: Vec<Document> = courses(db)
        .find(filter, options)
        .await?
        .try_collect()
        .await?;

    Ok(decode_courses(documents))
}

#[rocket::async_trait]
impl CatalogStore for Database {
    async fn insert_course(&self, course: &Course) -> StoreResult<()> {
        courses(self)
            .insert_one(bson::to_document(course)?, None)
            .await?;
        Ok(())
    }

    async fn get_course(&self, id: Uuid) -> StoreResult<Option<Course>> {
        match courses(self).find_one(filter::by_id(id), None).await? {
            Some(document) => Ok(Some(bson::from_document(document)?)),
            None => Ok(None),
        }
    }

    async fn get_courses(&self, ids: &[Uuid]) -> StoreResult<Vec<Course>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let options = FindOptions::builder().sort(doc! { "title": 1 }).build();
        find_courses(self, filter::by_ids(ids), options).await
    }

    async fn list_courses(
        &self,
        published_only: bool,
        page: PageState,
    ) -> StoreResult<Vec<Course>> {
        let filter = if published_only {
            doc! { "published": true }
        } else {
            doc! {}
        };
        let options = FindOptions::builder()
            .sort(doc! { "title": 1, "_id": 1 })
            .skip(page.skip())
            .limit(page.limit())
            .build();

        find_courses(self, filter, options).await
    }

    async fn courses_by_educator(&self, educator: Uuid) -> StoreResult<Vec<Course>> {
        let options = FindOptions::builder().sort(doc! { "title": 1 }).build();
        find_courses(self, doc! { "educator": educator.to_string() }, options).await
    }

    async fn add_enrolled_student(&self, course: Uuid, user: Uuid) -> StoreResult<bool> {
        let result = courses(self)
            .update_one(
                filter::by_id(course),
                doc! { "$addToSet": { "enrolled_students": user.to_string() } },
                None,
            )
            .await?;

        Ok(result.modified_count > 0)
    }

    async fn upsert_rating(
        &self,
        course: Uuid,
        user: Uuid,
        rating: u8,
    ) -> StoreResult<Option<RatingOutcome>> {
        let course_id = course.to_string();
        let user_id = user.to_string();
        let entry = bson::to_bson(&CourseRating {
            user_id: user,
            rating,
        })?;

        // Another request may add this user's entry between the two updates,
        // in which case the positional update is attempted again.
        for _ in 0..2 {
            let updated = courses(self)
                .update_one(
                    doc! { "_id": course_id.as_str(), "ratings.user_id": user_id.as_str() },
                    doc! { "$set": { "ratings.$.rating": rating as i32 } },
                    None,
                )
                .await?;
            if updated.matched_count > 0 {
                return Ok(Some(RatingOutcome::Updated));
            }

            let pushed = courses(self)
                .update_one(
                    doc! { "_id": course_id.as_str(), "ratings.user_id": { "$ne": user_id.as_str() } },
                    doc! { "$push": { "ratings": entry.clone() } },
                    None,
                )
                .await?;
            if pushed.matched_count > 0 {
                return Ok(Some(RatingOutcome::Added));
            }

            if courses(self)
                .count_documents(filter::by_id(course), None)
                .await?
                == 0
            {
                return Ok(None);
            }
        }

        Err(StoreError::Conflict(format!(
            "concurrent rating of course '{}' by user '{}'",
            course, user
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lecture(id: Option<&str>) -> LectureData {
        LectureData {
            lecture_id: id.map(str::to_string),
            title: "Intro".to_string(),
            duration: 12,
            url: Some("https://videos.example.com/intro".to_string()),
            kind: LectureKind::VideoLink,
            preview_free: true,
        }
    }

    fn create_data() -> CourseCreateData {
        CourseCreateData {
            title: " Secure Coding ".to_string(),
            description: String::new(),
            thumbnail: None,
            price: 20.0,
            discount: 5.0,
            published: true,
            content: vec![
                ChapterData {
                    chapter_id: None,
                    title: "Basics".to_string(),
                    lectures: vec![lecture(Some("intro")), lecture(None)],
                },
                ChapterData {
                    chapter_id: Some("advanced".to_string()),
                    title: "Advanced".to_string(),
                    lectures: vec![lecture(None)],
                },
            ],
        }
    }

    #[test]
    fn valid_course_builds_ordered_content() {
        let data = create_data();
        data.validate().expect("course data is valid");

        let educator = Uuid::new_v4();
        let course = data.into_course(educator);

        assert_eq!(course.title, "Secure Coding");
        assert_eq!(course.educator, educator);
        assert_eq!(course.total_lectures(), 3);
        assert_eq!(course.content[1].chapter_id, "advanced");
        assert_eq!(course.content[1].order, 2);
        assert_eq!(course.content[0].lectures[0].lecture_id, "intro");
        assert_eq!(course.content[0].lectures[1].order, 2);
        assert!(!course.content[0].lectures[1].lecture_id.is_empty());
    }

    #[test]
    fn rejects_bad_course_data() {
        let mut empty_chapter = create_data();
        empty_chapter.content[1].lectures.clear();

        let mut no_content = create_data();
        no_content.content.clear();

        let mut zero_duration = create_data();
        zero_duration.content[0].lectures[0].duration = 0;

        let mut discount = create_data();
        discount.discount = 120.0;

        let mut duplicate_ids = create_data();
        duplicate_ids.content[1].lectures[0].lecture_id = Some("intro".to_string());

        let mut blank_title = create_data();
        blank_title.title = "  ".to_string();

        for data in [
            empty_chapter,
            no_content,
            zero_duration,
            discount,
            duplicate_ids,
            blank_title,
        ] {
            assert!(
                matches!(data.validate(), Err(ServiceError::InvalidArgument(_))),
                "expected invalid: {:?}",
                data
            );
        }
    }
}
