use rocket::State;
use uuid::Uuid;

use crate::data::store::SharedStore;
use crate::middleware::paging::PageState;
use crate::resp::reply::{ApiResult, Reply};
use crate::service::catalog;

/// List published courses
#[utoipa::path(
    params(
        ("page" = Option<u32>, Query, description = "Zero based page index"),
        ("len" = Option<u32>, Query, description = "Courses per page, at most 100"),
    ),
    responses(
        (status = 200, description = "Courses with locked lecture URLs removed", body = [CourseListResponse]),
    )
)]
#[get("/course/all")]
#[tracing::instrument(skip(store))]
pub async fn course_list(page: PageState, store: &State<SharedStore>) -> ApiResult {
    let courses = catalog::list_courses(store.inner().as_ref(), page).await?;
    Ok(Reply::success().with("courses", courses))
}

/// Course details
#[utoipa::path(
    params(
        ("id", description = "course ID")
    ),
    responses(
        (status = 200, description = "Course with locked lecture URLs removed", body = CourseListResponse),
    )
)]
#[get("/course/<id>")]
#[tracing::instrument(skip(store))]
pub async fn course_info(id: Uuid, store: &State<SharedStore>) -> ApiResult {
    let course = catalog::course_details(store.inner().as_ref(), id).await?;
    Ok(Reply::success().with("course_data", course))
}

#[cfg(test)]
mod tests {
    use rocket::http::Status;
    use serde_json::Value;
    use uuid::Uuid;

    use crate::route::testing::{self, client};

    #[rocket::async_test]
    async fn listing_hides_locked_lectures() {
        let client = client().await;
        let educator = testing::register(&client, "grace@example.com", "educator").await;
        testing::add_course(&client, &educator).await;

        let response = client.get("/api/v1/course/all?page=0&len=5").dispatch().await;
        assert_eq!(response.status(), Status::Ok);
        let body: Value = response.into_json().await.unwrap();

        let courses = body["courses"].as_array().unwrap();
        assert_eq!(courses.len(), 1);
        let lectures = courses[0]["content"][0]["lectures"].as_array().unwrap();
        assert!(lectures[0]["url"].is_string(), "preview lecture keeps its url");
        assert!(lectures[1]["url"].is_null());
        assert_eq!(courses[0]["total_lectures"], 3);
    }

    #[rocket::async_test]
    async fn unknown_course_reports_not_found() {
        let client = client().await;

        let response = client
            .get(format!("/api/v1/course/{}", Uuid::new_v4()))
            .dispatch()
            .await;
        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "not_found");

        let response = client.get("/api/v1/course/not-a-uuid").dispatch().await;
        assert!(response.status().class().is_client_error());
    }
}
