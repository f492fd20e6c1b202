//! Success envelope shared by every endpoint and the rendering of service
//! failures.
//!
//! Each body carries a `success` flag. Service failures are not transport
//! failures, so they are sent with status 200 and `success: false`.

use std::io::Cursor;

use rocket::http::{ContentType, Status};
use rocket::response::Responder;
use rocket::{response, Request, Response};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::resp::problem::{problems, Problem};
use crate::service::ServiceError;

fn json_response(status: Status, body: Map<String, Value>) -> response::Result<'static> {
    let body_string = Value::Object(body).to_string();

    Response::build()
        .status(status)
        .header(ContentType::JSON)
        .sized_body(body_string.len(), Cursor::new(body_string))
        .ok()
}

/// A reply with a field that failed to serialize is sent as an internal
/// problem instead.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    body: Map<String, Value>,
    broken_field: Option<String>,
}

impl Reply {
    pub fn success() -> Reply {
        let mut body = Map::new();
        body.insert(String::from("success"), Value::Bool(true));
        Reply {
            body,
            broken_field: None,
        }
    }

    pub fn with<V: Serialize>(mut self, key: impl ToString, value: V) -> Reply {
        let key = key.to_string();
        match serde_json::to_value(value) {
            Ok(value) => {
                self.body.insert(key, value);
            }
            Err(e) => {
                tracing::error!("Unable to serialize reply field '{}': {}", key, e);
                self.broken_field.get_or_insert(key);
            }
        }
        self
    }

    pub fn message(self, text: impl ToString) -> Reply {
        self.with("message", text.to_string())
    }
}

impl<'r> Responder<'r, 'static> for Reply {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        if let Some(field) = &self.broken_field {
            tracing::error!(
                "{} {} produced an unserializable '{}'",
                req.method(),
                req.uri(),
                field
            );
            return problems::internal_problem().respond_to(req);
        }

        json_response(Status::Ok, self.body)
    }
}

impl ServiceError {
    pub fn to_json(&self) -> Map<String, Value> {
        let mut body = Map::new();
        body.insert(String::from("success"), Value::Bool(false));
        body.insert(String::from("error"), Value::from(self.kind()));
        body.insert(String::from("message"), Value::from(self.message()));
        body
    }
}

impl<'r> Responder<'r, 'static> for ServiceError {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        match &self {
            ServiceError::Internal(e) => {
                tracing::error!("{} {} failed: {}", req.method(), req.uri(), e)
            }
            other => tracing::debug!("{} {} refused: {}", req.method(), req.uri(), other),
        }

        json_response(Status::Ok, self.to_json())
    }
}

/// Failure of a route: either a service refusal or a transport problem.
#[derive(Debug, Responder)]
pub enum ApiError {
    Service(ServiceError),
    Problem(Problem),
}

impl From<ServiceError> for ApiError {
    fn from(e: ServiceError) -> Self {
        ApiError::Service(e)
    }
}

impl From<Problem> for ApiError {
    fn from(e: Problem) -> Self {
        ApiError::Problem(e)
    }
}

impl From<jsonwebtoken::errors::Error> for ApiError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        tracing::error!("Unable to issue JWT: {}", e);
        ApiError::Problem(problems::internal_problem())
    }
}

pub type ApiResult = Result<Reply, ApiError>;
