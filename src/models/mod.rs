pub mod article;
pub mod user;

pub use article::{Article, Tag};
pub use user::{Role, User};
