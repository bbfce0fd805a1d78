pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Provider error: {message}")]
	Provider { message: String },
	#[error("Retrieval error: {message}")]
	Qdrant { message: String },
}
impl From<sift_providers::Error> for Error {
	fn from(err: sift_providers::Error) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
impl From<sift_storage::Error> for Error {
	fn from(err: sift_storage::Error) -> Self {
		Self::Qdrant { message: err.to_string() }
	}
}
