pub mod contrast;
pub mod validation;
