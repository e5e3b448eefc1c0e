pub mod aggregate;
pub mod classify;
pub mod dictionary;
pub mod domain;
pub mod duty;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod report;
