use std::convert::Infallible;

use rocket::request::{FromRequest, Outcome, Request};

/// Value of the `Origin` header, if the client sent one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestOrigin(pub Option<String>);

impl RequestOrigin {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for RequestOrigin {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let origin = request
            .headers()
            .get_one("Origin")
            .map(str::trim)
            .filter(|origin| !origin.is_empty() && *origin != "null")
            .map(str::to_string);

        Outcome::Success(RequestOrigin(origin))
    }
}
