pub mod model;
pub mod shape;
pub mod validate;
