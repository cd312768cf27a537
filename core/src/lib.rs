pub mod baseline;
pub mod db;
pub mod id;
pub mod ledger;
pub mod notice;
pub mod pipeline;
pub mod player;
pub mod position;
pub mod rating;
pub mod raw;
pub mod store;
pub mod summary;
pub mod telemetry;
