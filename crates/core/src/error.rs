use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("pdf parse error: {0}")]
    PdfParse(String),

    #[error("docx parse error: {0}")]
    Docx(String),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),

    #[error("file is not valid utf-8: {0}")]
    InvalidEncoding(String),

    #[error("no readable text in {0}")]
    EmptyDocument(String),

    #[error("regex error: {0}")]
    RegexError(#[from] regex::Error),

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("invalid chunking config: {0}")]
    InvalidChunkConfig(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("invalid response from {backend}: {details}")]
    BackendResponse { backend: String, details: String },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialize error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{service} is unreachable at {endpoint}: {details}")]
    Unavailable {
        service: String,
        endpoint: String,
        details: String,
    },

    #[error("service request failed: {0}")]
    Request(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("no documents loaded yet")]
    NotReady,

    #[error("unknown session: {0}")]
    UnknownSession(String),

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("external service error: {0}")]
    ExternalService(#[from] ServiceError),
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
