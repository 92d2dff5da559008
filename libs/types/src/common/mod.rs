pub mod errors;

pub use errors::ValidationError;
