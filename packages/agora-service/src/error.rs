pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Unauthorized: {message}")]
	Unauthorized { message: String },
	#[error("Not found: {message}")]
	NotFound { message: String },
	#[error("Conflict: {message}")]
	Conflict { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Storage error: {message}")]
	Storage { message: String },
}
impl From<sqlx::Error> for Error {
	fn from(err: sqlx::Error) -> Self {
		Self::Storage { message: err.to_string() }
	}
}

impl From<agora_storage::Error> for Error {
	fn from(err: agora_storage::Error) -> Self {
		match err {
			agora_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			agora_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
			agora_storage::Error::NotFound(message) => Self::NotFound { message },
			agora_storage::Error::Conflict(message) => Self::Conflict { message },
		}
	}
}

impl From<agora_providers::Error> for Error {
	fn from(err: agora_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}

impl From<agora_domain::cluster_model::GeometryError> for Error {
	fn from(err: agora_domain::cluster_model::GeometryError) -> Self {
		Self::Provider { message: format!("Clustering output is unusable: {err}") }
	}
}
