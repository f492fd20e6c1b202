use uuid::Uuid;

use super::{course_not_found, ServiceResult};
use crate::data::course::CourseListResponse;
use crate::data::store::Store;
use crate::middleware::paging::PageState;

/// Published courses as visitors see them.
pub async fn list_courses(
    store: &dyn Store,
    page: PageState,
) -> ServiceResult<Vec<CourseListResponse>> {
    let courses = store.list_courses(true, page).await?;
    Ok(courses.iter().map(CourseListResponse::from).collect())
}

pub async fn course_details(store: &dyn Store, id: Uuid) -> ServiceResult<CourseListResponse> {
    match store.get_course(id).await? {
        Some(course) if course.published => Ok(CourseListResponse::from(&course)),
        _ => Err(course_not_found()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::memory::MemoryStore;
    use crate::data::store::CatalogStore;
    use crate::service::{fixtures, ServiceError};

    #[rocket::async_test]
    async fn visitors_only_see_preview_urls() {
        let store = MemoryStore::new();
        let course = fixtures::course(&store, &[2, 2]).await;

        let details = course_details(&store, course.id).await.unwrap();
        let urls: Vec<bool> = details.course.lectures().map(|l| l.url.is_some()).collect();
        assert_eq!(urls, vec![true, false, true, false]);
        assert_eq!(details.total_lectures, 4);

        let listed = list_courses(&store, PageState::default()).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].course.lectures().nth(1).unwrap().url.is_none());
    }

    #[rocket::async_test]
    async fn drafts_are_hidden() {
        let store = MemoryStore::new();
        let mut course = fixtures::course(&store, &[1]).await;
        course.id = Uuid::new_v4();
        course.published = false;
        store.insert_course(&course).await.unwrap();

        assert_eq!(list_courses(&store, PageState::default()).await.unwrap().len(), 1);
        assert!(matches!(
            course_details(&store, course.id).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(
            course_details(&store, Uuid::new_v4()).await,
            Err(ServiceError::NotFound(_))
        ));
    }
}
