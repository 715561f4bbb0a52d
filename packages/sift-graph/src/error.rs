pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Graph request failed.")]
	Http(#[from] reqwest::Error),
	#[error("Graph store rejected the statement: {message}")]
	Protocol { message: String },
	#[error("Graph row did not match the expected shape: {message}")]
	Decode { message: String },
	#[error("Graph call exceeded its timeout.")]
	Timeout,
	#[error("Graph circuit breaker is open.")]
	CircuitOpen,
}
