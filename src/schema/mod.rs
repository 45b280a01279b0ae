pub mod entity;
pub mod message;
pub mod raw;
pub mod report;
