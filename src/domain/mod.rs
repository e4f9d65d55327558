pub mod article;
pub mod category;
pub mod fetch_result;
pub mod source;

pub use article::{Article, ArticleSource};
pub use category::Category;
pub use fetch_result::{FetchResult, UNEXPECTED_ERROR};
pub use source::Source;
