pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Storage(#[from] sift_storage::Error),
	#[error(transparent)]
	Graph(#[from] sift_graph::Error),
	#[error(transparent)]
	Taxonomy(#[from] sift_taxonomy::Error),
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("No graph store is configured.")]
	GraphUnconfigured,
	#[error("{message}")]
	Internal { message: String },
}

impl Error {
	pub(crate) fn internal(message: impl Into<String>) -> Self {
		Self::Internal { message: message.into() }
	}
}
