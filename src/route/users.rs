use rocket::serde::json::Json;
use rocket::State;
use serde_json::Value;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::Config;
use crate::data::store::SharedStore;
use crate::data::user::UserResponse;
use crate::middleware::origin::RequestOrigin;
use crate::resp::jwt::UserRoleToken;
use crate::resp::reply::{ApiResult, Reply};
use crate::service::enrollment;
use crate::service::progress;
use crate::service::{account, rating, ServiceError, ServiceResult};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CourseRef {
    #[schema(value_type = String, format = Uuid)]
    pub course_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LectureRef {
    #[schema(value_type = String, format = Uuid)]
    pub course_id: Option<String>,
    #[schema(value_type = String)]
    pub lecture_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RatingData {
    #[schema(value_type = String, format = Uuid)]
    pub course_id: Option<String>,
    #[schema(value_type = i64, minimum = 1, maximum = 5)]
    pub rating: Option<Value>,
}

/// Absent and null fields are refused as invalid arguments.
fn required<T>(value: Option<T>, field: &str) -> ServiceResult<T> {
    value.ok_or_else(|| {
        ServiceError::InvalidArgument(format!("Missing required field '{}'.", field))
    })
}

fn parse_course_id(value: Option<&str>) -> ServiceResult<Uuid> {
    let raw = required(value, "course_id")?;
    Uuid::parse_str(raw.trim())
        .map_err(|_| ServiceError::InvalidArgument("Invalid course_id.".to_string()))
}

/// Profile of the logged in user
#[utoipa::path(
    responses(
        (status = 200, description = "Public view of the user", body = UserResponse),
        (status = 401, description = "Missing or invalid token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[get("/user/me")]
#[tracing::instrument(skip(store))]
pub async fn user_me(auth: UserRoleToken, store: &State<SharedStore>) -> ApiResult {
    let user = account::me(store.inner().as_ref(), &auth.email).await?;
    Ok(Reply::success().with("user", UserResponse::from(user)))
}

/// Enroll in a course
#[utoipa::path(
    request_body = CourseRef,
    responses(
        (status = 200, description = "Purchase record and where to continue", body = EnrollmentResult),
        (status = 401, description = "Missing or invalid token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/user/purchase", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(store))]
pub async fn user_purchase(
    data: Json<CourseRef>,
    auth: UserRoleToken,
    origin: RequestOrigin,
    store: &State<SharedStore>,
    config: &State<Config>,
) -> ApiResult {
    let course_id = parse_course_id(data.course_id.as_deref())?;
    let result = enrollment::enroll(
        store.inner().as_ref(),
        &auth.email,
        course_id,
        config.redirect_target(origin.as_deref()),
    )
    .await?;

    Ok(Reply::success()
        .with("purchase", result.purchase)
        .with("session_url", result.session_url))
}

/// Courses the user is enrolled in
#[utoipa::path(
    responses(
        (status = 200, description = "Enrolled courses with full content", body = [Course]),
        (status = 401, description = "Missing or invalid token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/user/enrolled-courses")]
#[tracing::instrument(skip(store))]
pub async fn user_enrolled_courses(auth: UserRoleToken, store: &State<SharedStore>) -> ApiResult {
    let courses = enrollment::enrolled_courses(store.inner().as_ref(), &auth.email).await?;
    Ok(Reply::success().with("enrolled_courses", courses))
}

/// Mark a lecture as completed
#[utoipa::path(
    request_body = LectureRef,
    responses(
        (status = 200, description = "Acknowledgement"),
        (status = 401, description = "Missing or invalid token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/user/update-course-progress", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(store))]
pub async fn user_update_progress(
    data: Json<LectureRef>,
    auth: UserRoleToken,
    store: &State<SharedStore>,
) -> ApiResult {
    let course_id = parse_course_id(data.course_id.as_deref())?;
    let lecture_id = required(data.lecture_id.as_deref(), "lecture_id")?;
    let outcome = progress::mark_lecture_complete(
        store.inner().as_ref(),
        &auth.email,
        course_id,
        lecture_id,
    )
    .await?;

    Ok(Reply::success().message(progress::outcome_message(outcome)))
}

/// Completed lectures of a course
#[utoipa::path(
    request_body = CourseRef,
    responses(
        (status = 200, description = "Stored record (nullable) and summary", body = ProgressReport),
        (status = 401, description = "Missing or invalid token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/user/get-course-progress", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(store))]
pub async fn user_get_progress(
    data: Json<CourseRef>,
    auth: UserRoleToken,
    store: &State<SharedStore>,
) -> ApiResult {
    let course_id = parse_course_id(data.course_id.as_deref())?;
    let report = progress::get_progress(store.inner().as_ref(), &auth.email, course_id).await?;

    Ok(Reply::success()
        .with("progress_data", report.progress_data)
        .with("summary", report.summary))
}

/// Rate an enrolled course
#[utoipa::path(
    request_body = RatingData,
    responses(
        (status = 200, description = "Acknowledgement"),
        (status = 401, description = "Missing or invalid token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/user/add-rating", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(store))]
pub async fn user_add_rating(
    data: Json<RatingData>,
    auth: UserRoleToken,
    store: &State<SharedStore>,
) -> ApiResult {
    let course_id = parse_course_id(data.course_id.as_deref())?;
    let value = rating::rating_value(required(data.rating.as_ref(), "rating")?)?;
    rating::rate(store.inner().as_ref(), &auth.email, course_id, value).await?;

    Ok(Reply::success().message("Rating added."))
}
