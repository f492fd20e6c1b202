use chrono::{DateTime, Utc};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::util::round_cents;

pub mod db;

pub static COURSE_COLLECTION_NAME: &str = "courses";

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LectureKind {
    VideoLink,
    Document,
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Lecture {
    pub lecture_id: String,
    pub title: String,
    /// Length in minutes.
    pub duration: u32,
    /// Location of the lecture content. Withheld in public listings unless
    /// the lecture is free to preview.
    #[serde(default)]
    pub url: Option<String>,
    pub kind: LectureKind,
    #[serde(default)]
    pub preview_free: bool,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Chapter {
    pub chapter_id: String,
    pub title: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub lectures: Vec<Lecture>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CourseRating {
    pub user_id: Uuid,
    pub rating: u8,
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum RatingOutcome {
    Added,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub thumbnail: Option<String>,

    pub price: f64,
    /// Percentage taken off `price`.
    #[serde(default)]
    pub discount: f64,
    #[serde(default = "published_default")]
    pub published: bool,

    #[serde(default)]
    pub content: Vec<Chapter>,
    #[serde(default)]
    pub ratings: Vec<CourseRating>,
    #[serde(default)]
    pub enrolled_students: Vec<Uuid>,

    pub educator: Uuid,
    #[serde(default = "Utc::now")]
    pub created: DateTime<Utc>,
}

fn published_default() -> bool {
    true
}

impl Course {
    pub fn total_lectures(&self) -> usize {
        self.content.iter().map(|chapter| chapter.lectures.len()).sum()
    }

    /// Total lecture length in minutes.
    pub fn total_duration(&self) -> u64 {
        self.lectures().map(|lecture| lecture.duration as u64).sum()
    }

    pub fn lectures(&self) -> impl Iterator<Item = &Lecture> {
        self.content.iter().flat_map(|chapter| chapter.lectures.iter())
    }

    pub fn has_lecture(&self, lecture_id: &str) -> bool {
        self.lectures().any(|lecture| lecture.lecture_id == lecture_id)
    }

    pub fn has_student(&self, user: Uuid) -> bool {
        self.enrolled_students.contains(&user)
    }

    /// Price after discount, rounded to cents.
    pub fn amount_due(&self) -> f64 {
        round_cents(self.price - self.discount * self.price / 100.0)
    }

    /// Mean of all ratings with one decimal, `0.0` when unrated.
    pub fn average_rating(&self) -> f64 {
        if self.ratings.is_empty() {
            return 0.0;
        }

        let total: u64 = self.ratings.iter().map(|r| r.rating as u64).sum();
        (total as f64 / self.ratings.len() as f64 * 10.0).round() / 10.0
    }

    pub fn upsert_rating(&mut self, user: Uuid, rating: u8) -> RatingOutcome {
        match self.ratings.iter_mut().find(|r| r.user_id == user) {
            Some(existing) => {
                existing.rating = rating;
                RatingOutcome::Updated
            }
            None => {
                self.ratings.push(CourseRating {
                    user_id: user,
                    rating,
                });
                RatingOutcome::Added
            }
        }
    }

    /// Copy of the course fit for visitors: lecture URLs are only kept for
    /// preview lectures and the student list is dropped.
    pub fn public_view(&self) -> Course {
        let mut course = self.clone();
        course.enrolled_students.clear();
        for lecture in course
            .content
            .iter_mut()
            .flat_map(|chapter| chapter.lectures.iter_mut())
        {
            if !lecture.preview_free {
                lecture.url = None;
            }
        }
        course
    }
}

/// Course summary used in listings.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CourseListResponse {
    #[serde(flatten)]
    pub course: Course,
    pub average_rating: f64,
    pub total_lectures: usize,
    pub total_duration: u64,
    pub student_count: usize,
}

impl From<&Course> for CourseListResponse {
    fn from(course: &Course) -> Self {
        CourseListResponse {
            course: course.public_view(),
            average_rating: course.average_rating(),
            total_lectures: course.total_lectures(),
            total_duration: course.total_duration(),
            student_count: course.enrolled_students.len(),
        }
    }
}
