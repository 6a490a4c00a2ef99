pub mod template;

pub use template::{Output, Resource, Template};
