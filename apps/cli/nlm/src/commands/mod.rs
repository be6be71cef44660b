pub mod list;
pub mod raw;
