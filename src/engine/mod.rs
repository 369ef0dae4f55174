pub mod analytics;
pub mod filter;
pub mod validator;
