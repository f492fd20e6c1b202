use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{resolve_user, ServiceError, ServiceResult};
use crate::data::course::db::CourseCreateData;
use crate::data::course::Course;
use crate::data::purchase::{Purchase, PurchaseStatus};
use crate::data::store::Store;
use crate::data::user::{StudentInfo, User};
use crate::role::Role;
use crate::util::round_cents;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct EnrolledStudent {
    pub student: StudentInfo,
    pub course_id: Uuid,
    pub course_title: String,
    pub purchase_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Dashboard {
    pub total_courses: usize,
    pub total_earnings: f64,
    pub enrolled_students_data: Vec<EnrolledStudent>,
}

async fn resolve_educator(store: &dyn Store, email: &str) -> ServiceResult<User> {
    let user = resolve_user(store, email).await?;
    match user.role {
        Role::Educator => Ok(user),
        Role::Student => Err(ServiceError::Forbidden(
            "Only educators can manage courses.".to_string(),
        )),
    }
}

#[tracing::instrument(skip(store))]
pub async fn add_course(
    store: &dyn Store,
    email: &str,
    data: CourseCreateData,
) -> ServiceResult<Course> {
    let educator = resolve_educator(store, email).await?;
    data.validate()?;

    let course = data.into_course(educator.id);
    store.insert_course(&course).await?;
    tracing::info!("Educator {} added course {}.", educator.id, course.id);

    Ok(course)
}

pub async fn educator_courses(store: &dyn Store, email: &str) -> ServiceResult<Vec<Course>> {
    let educator = resolve_educator(store, email).await?;
    Ok(store.courses_by_educator(educator.id).await?)
}

/// One entry per (student, course) pair, dated by the first completed
/// purchase, newest first.
fn enrolled_students_of(
    courses: &[Course],
    purchases: &[Purchase],
    students: &[User],
) -> Vec<EnrolledStudent> {
    let titles: HashMap<Uuid, &str> = courses
        .iter()
        .map(|course| (course.id, course.title.as_str()))
        .collect();
    let students: HashMap<Uuid, &User> = students.iter().map(|user| (user.id, user)).collect();

    let mut completed: Vec<&Purchase> = purchases
        .iter()
        .filter(|p| p.status == PurchaseStatus::Completed)
        .collect();
    completed.sort_by_key(|p| p.created);

    let mut seen = HashSet::new();
    let mut result: Vec<EnrolledStudent> = completed
        .into_iter()
        .filter(|p| seen.insert((p.user_id, p.course_id)))
        .filter_map(|p| {
            Some(EnrolledStudent {
                student: StudentInfo::from(*students.get(&p.user_id)?),
                course_id: p.course_id,
                course_title: titles.get(&p.course_id)?.to_string(),
                purchase_date: p.created,
            })
        })
        .collect();

    result.reverse();
    result
}

async fn collect_enrollments(
    store: &dyn Store,
    courses: &[Course],
) -> ServiceResult<(Vec<Purchase>, Vec<EnrolledStudent>)> {
    let course_ids: Vec<Uuid> = courses.iter().map(|course| course.id).collect();
    let purchases = store.purchases_for_courses(&course_ids).await?;

    let student_ids: Vec<Uuid> = purchases
        .iter()
        .map(|p| p.user_id)
        .collect::<HashSet<_>>()
        .into_iter()
        .collect();
    let students = store.get_users(&student_ids).await?;

    let enrolled = enrolled_students_of(courses, &purchases, &students);
    Ok((purchases, enrolled))
}

pub async fn dashboard(store: &dyn Store, email: &str) -> ServiceResult<Dashboard> {
    let educator = resolve_educator(store, email).await?;
    let courses = store.courses_by_educator(educator.id).await?;
    let (purchases, enrolled_students_data) = collect_enrollments(store, &courses).await?;

    let earnings: f64 = purchases
        .iter()
        .filter(|p| p.status == PurchaseStatus::Completed)
        .map(|p| p.amount)
        .sum();

    Ok(Dashboard {
        total_courses: courses.len(),
        total_earnings: round_cents(earnings),
        enrolled_students_data,
    })
}

pub async fn enrolled_students(
    store: &dyn Store,
    email: &str,
) -> ServiceResult<Vec<EnrolledStudent>> {
    let educator = resolve_educator(store, email).await?;
    let courses = store.courses_by_educator(educator.id).await?;
    let (_, enrolled) = collect_enrollments(store, &courses).await?;

    Ok(enrolled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::course::db::{ChapterData, LectureData};
    use crate::data::course::LectureKind;
    use crate::data::memory::MemoryStore;
    use crate::service::{enrollment, fixtures};

    fn course_data(title: &str, price: f64) -> CourseCreateData {
        CourseCreateData {
            title: title.to_string(),
            description: "<p>Intro</p>".to_string(),
            thumbnail: None,
            price,
            discount: 0.0,
            published: true,
            content: vec![ChapterData {
                chapter_id: None,
                title: "Basics".to_string(),
                lectures: vec![LectureData {
                    lecture_id: None,
                    title: "Welcome".to_string(),
                    duration: 12,
                    url: Some("https://videos.example.com/welcome".to_string()),
                    kind: LectureKind::VideoLink,
                    preview_free: true,
                }],
            }],
        }
    }

    #[rocket::async_test]
    async fn students_cannot_author() {
        let store = MemoryStore::new();
        fixtures::user(&store, "ada@example.com", Role::Student).await;

        let result = add_course(&store, "ada@example.com", course_data("Rust", 10.0)).await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
        assert!(matches!(
            dashboard(&store, "ada@example.com").await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[rocket::async_test]
    async fn invalid_course_is_rejected() {
        let store = MemoryStore::new();
        fixtures::user(&store, "grace@example.com", Role::Educator).await;

        let mut data = course_data("Rust", 10.0);
        data.content[0].lectures.clear();
        let result = add_course(&store, "grace@example.com", data).await;
        assert!(matches!(result, Err(ServiceError::InvalidArgument(_))));
    }

    #[rocket::async_test]
    async fn dashboard_sums_completed_purchases() {
        let store = MemoryStore::new();
        let educator = fixtures::user(&store, "grace@example.com", Role::Educator).await;
        fixtures::user(&store, "ada@example.com", Role::Student).await;
        fixtures::user(&store, "bob@example.com", Role::Student).await;

        let rust = add_course(&store, "grace@example.com", course_data("Rust", 19.99))
            .await
            .unwrap();
        let cobol = add_course(&store, "grace@example.com", course_data("Cobol", 5.0))
            .await
            .unwrap();
        assert_eq!(rust.educator, educator.id);
        assert_eq!(rust.content[0].lectures[0].order, 1);

        for (email, course) in [
            ("ada@example.com", rust.id),
            ("bob@example.com", rust.id),
            ("ada@example.com", cobol.id),
        ] {
            enrollment::enroll(&store, email, course, String::new())
                .await
                .unwrap();
        }

        let dashboard = dashboard(&store, "grace@example.com").await.unwrap();
        assert_eq!(dashboard.total_courses, 2);
        assert_eq!(dashboard.total_earnings, 44.98);
        assert_eq!(dashboard.enrolled_students_data.len(), 3);

        let listed = enrolled_students(&store, "grace@example.com").await.unwrap();
        assert_eq!(listed, dashboard.enrolled_students_data);
        assert!(listed
            .iter()
            .any(|e| e.student.email == "bob@example.com" && e.course_title == "Rust"));

        let courses = educator_courses(&store, "grace@example.com").await.unwrap();
        let titles: Vec<&str> = courses.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Cobol", "Rust"]);
    }

    #[rocket::async_test]
    async fn reenrollment_lists_student_once() {
        let store = MemoryStore::new();
        fixtures::user(&store, "grace@example.com", Role::Educator).await;
        fixtures::user(&store, "ada@example.com", Role::Student).await;
        let course = add_course(&store, "grace@example.com", course_data("Rust", 10.0))
            .await
            .unwrap();

        for _ in 0..2 {
            enrollment::enroll(&store, "ada@example.com", course.id, String::new())
                .await
                .unwrap();
        }

        let listed = enrolled_students(&store, "grace@example.com").await.unwrap();
        assert_eq!(listed.len(), 1);
    }
}
