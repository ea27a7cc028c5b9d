#![forbid(unsafe_code)]

pub mod clock;
pub mod model;
pub mod policy;
pub mod storage;
pub mod store;
