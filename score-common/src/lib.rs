pub mod config;

pub mod match_snapshot;

pub mod scores_api;
