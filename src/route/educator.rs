use rocket::http::CookieJar;
use rocket::serde::json::Json;
use rocket::State;

use crate::config::Config;
use crate::data::course::db::CourseCreateData;
use crate::data::store::SharedStore;
use crate::resp::jwt::UserRoleToken;
use crate::resp::reply::{ApiResult, Reply};
use crate::route::auth::issue_token;
use crate::security::Security;
use crate::service::account;
use crate::service::educator;

/// Become an educator
///
/// The token is re-issued so it carries the new role.
#[utoipa::path(
    responses(
        (status = 200, description = "Acknowledgement and a fresh token"),
        (status = 401, description = "Missing or invalid token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/educator/update-role")]
#[tracing::instrument(skip(cookies, store, security))]
pub async fn educator_update_role(
    auth: UserRoleToken,
    cookies: &CookieJar<'_>,
    store: &State<SharedStore>,
    security: &State<Security>,
    config: &State<Config>,
) -> ApiResult {
    let user = account::promote_to_educator(store.inner().as_ref(), &auth.email).await?;
    let token = issue_token(&user, cookies, security, config)?;

    Ok(Reply::success()
        .message("You can publish a course now.")
        .with("token", token))
}

/// Publish a new course
#[utoipa::path(
    request_body = CourseCreateData,
    responses(
        (status = 200, description = "Stored course", body = Course),
        (status = 401, description = "Missing or invalid token", body = Problem),
        (status = 422, description = "Malformed request body", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/educator/add-course", format = "application/json", data = "<data>")]
#[tracing::instrument(skip(store))]
pub async fn educator_add_course(
    data: Json<CourseCreateData>,
    auth: UserRoleToken,
    store: &State<SharedStore>,
) -> ApiResult {
    let course =
        educator::add_course(store.inner().as_ref(), &auth.email, data.into_inner()).await?;
    Ok(Reply::success().message("Course added.").with("course", course))
}

/// Courses created by the caller
#[utoipa::path(
    responses(
        (status = 200, description = "Own courses", body = [Course]),
        (status = 401, description = "Missing or invalid token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/educator/courses")]
#[tracing::instrument(skip(store))]
pub async fn educator_courses(auth: UserRoleToken, store: &State<SharedStore>) -> ApiResult {
    let courses = educator::educator_courses(store.inner().as_ref(), &auth.email).await?;
    Ok(Reply::success().with("courses", courses))
}

/// Earnings and enrollments across own courses
#[utoipa::path(
    responses(
        (status = 200, description = "Dashboard figures", body = Dashboard),
        (status = 401, description = "Missing or invalid token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/educator/dashboard")]
#[tracing::instrument(skip(store))]
pub async fn educator_dashboard(auth: UserRoleToken, store: &State<SharedStore>) -> ApiResult {
    let dashboard = educator::dashboard(store.inner().as_ref(), &auth.email).await?;
    Ok(Reply::success().with("dashboard_data", dashboard))
}

/// Students enrolled in own courses
#[utoipa::path(
    responses(
        (status = 200, description = "Students with course and purchase date", body = [EnrolledStudent]),
        (status = 401, description = "Missing or invalid token", body = Problem),
    ),
    security(("jwt" = []))
)]
#[post("/educator/enrolled-students")]
#[tracing::instrument(skip(store))]
pub async fn educator_enrolled_students(
    auth: UserRoleToken,
    store: &State<SharedStore>,
) -> ApiResult {
    let students = educator::enrolled_students(store.inner().as_ref(), &auth.email).await?;
    Ok(Reply::success().with("enrolled_students", students))
}
