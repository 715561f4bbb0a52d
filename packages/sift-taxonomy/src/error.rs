pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Malformed CSV at line {line}: {message}")]
	Csv { line: usize, message: String },
	#[error("Taxonomy document does not meet required coverage: {message}")]
	Coverage { message: String },
}
