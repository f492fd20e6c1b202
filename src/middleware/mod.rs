pub mod origin;
pub mod paging;
