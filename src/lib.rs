pub mod desk;
pub mod engine;
pub mod feed;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod policy;
pub mod reaper;
