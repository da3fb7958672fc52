pub mod extractor;
pub mod handlers;
pub mod models;
pub mod password;
pub mod service;
pub mod token;

pub use extractor::{AdminUser, AuthUser};
pub use service::AuthService;
pub use token::TokenKeys;
