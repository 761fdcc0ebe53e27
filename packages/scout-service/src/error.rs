use scout_domain::query::QueryError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Authentication required.")]
	Unauthenticated,
	#[error("Forbidden: {message}")]
	Forbidden { message: String },
	#[error("Invalid input: {message}")]
	InvalidInput { message: String },
	#[error("Reasoning service unavailable: {message}")]
	ReasoningUnavailable { message: String },
	#[error("Persistence unavailable: {message}")]
	PersistenceUnavailable { message: String },
}
impl Error {
	/// Stable machine-readable code for the public error body.
	pub fn code(&self) -> &'static str {
		match self {
			Self::Unauthenticated => "UNAUTHENTICATED",
			Self::Forbidden { .. } => "FORBIDDEN",
			Self::InvalidInput { .. } => "INVALID_INPUT",
			Self::ReasoningUnavailable { .. } => "REASONING_UNAVAILABLE",
			Self::PersistenceUnavailable { .. } => "PERSISTENCE_UNAVAILABLE",
		}
	}

	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::ReasoningUnavailable { .. })
	}
}

impl From<scout_storage::Error> for Error {
	fn from(err: scout_storage::Error) -> Self {
		Self::PersistenceUnavailable { message: err.to_string() }
	}
}

impl From<scout_providers::Error> for Error {
	fn from(err: scout_providers::Error) -> Self {
		Self::ReasoningUnavailable { message: err.to_string() }
	}
}

impl From<QueryError> for Error {
	fn from(err: QueryError) -> Self {
		Self::InvalidInput { message: err.message() }
	}
}
