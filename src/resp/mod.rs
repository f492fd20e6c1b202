pub mod jwt;
pub mod problem;
pub mod reply;
pub mod util;
