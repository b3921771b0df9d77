pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid request: {message}")]
	InvalidRequest { message: String },
	#[error("Data integrity fault: {message}")]
	DataIntegrity { message: String },
	#[error("Keyword table error: {message}")]
	KeywordTable { message: String },
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

impl From<kueater_storage::Error> for Error {
	fn from(err: kueater_storage::Error) -> Self {
		match err {
			kueater_storage::Error::Sqlx(inner) => Self::Storage { message: inner.to_string() },
			kueater_storage::Error::InvalidArgument(message) => Self::InvalidRequest { message },
		}
	}
}

impl From<kueater_domain::ScoreFault> for Error {
	fn from(err: kueater_domain::ScoreFault) -> Self {
		Self::DataIntegrity { message: err.to_string() }
	}
}

impl From<color_eyre::Report> for Error {
	fn from(err: color_eyre::Report) -> Self {
		Self::Provider { message: err.to_string() }
	}
}
