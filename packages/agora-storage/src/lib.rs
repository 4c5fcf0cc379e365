pub mod cluster_models;
pub mod conversations;
pub mod db;
pub mod embeddings;
pub mod jobs;
pub mod members;
pub mod models;
pub mod responses;
pub mod schema;
pub mod statements;
pub mod themes;
pub mod vector;
pub mod votes;

mod error;

pub use error::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;
