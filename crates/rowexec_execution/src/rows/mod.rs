pub mod batch;
pub mod value;
