use std::collections::BTreeMap;

use rocket::serde::json::Json;
use rocket::{Build, Catcher, Request, Rocket, Route};

pub mod auth;
pub mod course;
pub mod educator;
pub mod users;

use auth::*;
use course::*;
use educator::*;
use users::*;

use utoipa::OpenApi;

use crate::{
    data::{
        course::{
            db::{ChapterData, CourseCreateData, LectureData},
            Chapter, Course, CourseListResponse, CourseRating, Lecture, LectureKind,
        },
        progress::{CourseProgress, ProgressState, ProgressSummary},
        purchase::{Purchase, PurchaseStatus},
        user::db::{UserLoginData, UserRegisterData},
        user::{StudentInfo, UserResponse},
    },
    resp::{
        jwt::doc::JWTAuth,
        problem::{problems, Problem},
    },
    role::Role,
    service::{
        educator::{Dashboard, EnrolledStudent},
        enrollment::EnrollmentResult,
        progress::ProgressReport,
    },
};

#[derive(OpenApi)]
#[openapi(
    paths(
        register,
        login,
        logout,
        user_me,
        user_purchase,
        user_enrolled_courses,
        user_update_progress,
        user_get_progress,
        user_add_rating,
        course_list,
        course_info,
        educator_update_role,
        educator_add_course,
        educator_courses,
        educator_dashboard,
        educator_enrolled_students,
    ),
    components(schemas(
        Role,
        UserResponse,
        UserLoginData,
        UserRegisterData,
        StudentInfo,
        Course,
        Chapter,
        Lecture,
        LectureKind,
        CourseRating,
        CourseListResponse,
        CourseCreateData,
        ChapterData,
        LectureData,
        CourseProgress,
        ProgressState,
        ProgressSummary,
        ProgressReport,
        Purchase,
        PurchaseStatus,
        EnrollmentResult,
        Dashboard,
        EnrolledStudent,
        CourseRef,
        LectureRef,
        RatingData,
        Problem
    )),
    modifiers(&JWTAuth, &V1_PREFIX)
)]
pub struct ApiDocV1;

pub struct PathPrefix(pub &'static str);
static V1_PREFIX: PathPrefix = PathPrefix("/api/v1");

impl utoipa::Modify for PathPrefix {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let mut new_paths = BTreeMap::new();

        for (path, item) in std::mem::take(&mut openapi.paths.paths) {
            new_paths.insert(self.0.to_string() + path.as_ref(), item);
        }

        openapi.paths.paths = new_paths;
    }
}

#[get("/openapi.json")]
pub fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDocV1::openapi())
}

pub fn api_v1() -> Vec<Route> {
    routes![
        register,
        login,
        logout,
        user_me,
        user_purchase,
        user_enrolled_courses,
        user_update_progress,
        user_get_progress,
        user_add_rating,
        course_list,
        course_info,
        educator_update_role,
        educator_add_course,
        educator_courses,
        educator_dashboard,
        educator_enrolled_students,
        openapi_json,
    ]
}

#[catch(400)]
fn bad_request() -> Problem {
    problems::parse_problem()
}

#[catch(401)]
fn unauthorized() -> Problem {
    crate::resp::jwt::auth_problem("Missing, expired or invalid JWT.")
}

#[catch(404)]
fn not_found(req: &Request) -> Problem {
    problems::not_found_problem(req.uri())
}

#[catch(422)]
fn unprocessable() -> Problem {
    problems::unprocessable_problem()
}

#[catch(500)]
fn internal() -> Problem {
    problems::internal_problem()
}

pub fn catchers() -> Vec<Catcher> {
    catchers![bad_request, unauthorized, not_found, unprocessable, internal]
}

pub fn mount_api(rocket: Rocket<Build>) -> Rocket<Build> {
    let rocket = rocket
        .mount("/api/v1", api_v1())
        .register("/", catchers());

    #[cfg(feature = "swagger-ui")]
    let rocket = rocket.mount(
        "/",
        utoipa_swagger_ui::SwaggerUi::new("/swagger/<_..>")
            .url("/api/v1/openapi.json", ApiDocV1::openapi()),
    );

    rocket
}


#[cfg(test)]
mod tests {
    use rocket::http::Status;
    use serde_json::Value;

    use super::testing::client;

    #[rocket::async_test]
    async fn openapi_document_is_prefixed() {
        let client = client().await;

        let response = client.get("/api/v1/openapi.json").dispatch().await;
        assert_eq!(response.status(), Status::Ok);

        let doc: Value = response.into_json().await.unwrap();
        assert!(doc["paths"]["/api/v1/user/purchase"].is_object());
        assert!(doc["components"]["securitySchemes"]["jwt"].is_object());
    }

    #[rocket::async_test]
    async fn unknown_routes_are_problems() {
        let client = client().await;

        let response = client.get("/api/v1/nothing-here").dispatch().await;
        assert_eq!(response.status(), Status::NotFound);

        let body: Value = response.into_json().await.unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["instance"], "/api/v1/nothing-here");
    }
}
