pub mod response;

pub use response::{ApiResult, Rendered};
