pub mod field;
pub mod mapping;
pub mod occurrence;
pub mod suggestion;
pub mod template;
pub mod value;
