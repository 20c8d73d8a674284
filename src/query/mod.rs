pub mod ast;
pub mod params;

pub use ast::{CompareOp, Condition, DocQuery, SortKey};
pub use params::{ListParams, PageRef, PageWindow, Pagination};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("Invalid field name: {0}")]
    InvalidField(String),

    #[error("Invalid sort specification: {0}")]
    InvalidSort(String),
}
