pub mod service;

pub use service::RegisterRequest;
