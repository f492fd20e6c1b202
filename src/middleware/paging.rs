use std::convert::Infallible;

use rocket::request::{FromRequest, Outcome, Request};

const DEFAULT_PAGE_LENGTH: u32 = 20;
const MAX_PAGE_LENGTH: u32 = 100;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PageState {
    pub page_length: u32,
    pub page: u32,
}

impl Default for PageState {
    fn default() -> Self {
        PageState {
            page_length: DEFAULT_PAGE_LENGTH,
            page: 0,
        }
    }
}

impl PageState {
    pub fn new(page: u32, page_length: u32) -> PageState {
        PageState {
            page_length: page_length.clamp(1, MAX_PAGE_LENGTH),
            page,
        }
    }

    /// Number of entries preceding this page.
    pub fn skip(&self) -> u64 {
        self.page as u64 * self.page_length as u64
    }

    pub fn limit(&self) -> i64 {
        self.page_length as i64
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for PageState {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let length: Option<u32> = request
            .query_value("len")
            .and_then(|it| it.ok())
            .or_else(|| request.query_value("l").and_then(|it| it.ok()));

        let page: Option<u32> = request
            .query_value("page")
            .and_then(|it| it.ok())
            .or_else(|| request.query_value("p").and_then(|it| it.ok()));

        Outcome::Success(PageState::new(
            page.unwrap_or(0),
            length.unwrap_or(DEFAULT_PAGE_LENGTH),
        ))
    }
}
