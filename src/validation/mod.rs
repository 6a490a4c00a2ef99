//! Post-composition checks over the finished stack

pub mod rules;
pub mod validator;

pub use rules::ValidationRule;
pub use validator::Validator;
