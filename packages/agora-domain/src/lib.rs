pub mod cluster_model;
pub mod consensus;
pub mod grouping;
pub mod progress;
pub mod status;
pub mod strategy;
pub mod vector;
