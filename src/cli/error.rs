#[derive(Debug, thiserror::Error)]
pub(crate) enum AnkrError {
    #[error("missing required arguments: {0}")]
    MissingArguments(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("rpc error: code = {code:?} desc = {message}")]
    Remote { code: tonic::Code, message: String },

    #[error("operation aborted: confirmation declined")]
    ConfirmationDeclined,

    #[error("unable to connect to the hub at {addr}: {reason}")]
    Connection { addr: String, reason: String },

    #[error("deadline exceeded waiting for {0}")]
    Deadline(String),

    #[error("timed out waiting for {0}")]
    WaitTimeout(String),

    #[error("{kind} {id} ended up {status}")]
    Unhealthy {
        kind: &'static str,
        id: String,
        status: &'static str,
    },

    #[error("{} of {} operations failed:\n{}", .failed.len(), .total, .failed.join("\n"))]
    Partial { total: usize, failed: Vec<String> },

    #[error("command `{0}` is registered twice")]
    DuplicateCommand(String),

    #[error("no auth context named `{0}`")]
    UnknownContext(String),

    #[error("not logged in; run `ankrctl user login` first")]
    NotLoggedIn,

    #[error("file error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("interactive prompt error: {0}")]
    Interactive(#[from] inquire::InquireError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("template error: {0}")]
    Render(#[from] handlebars::RenderError),

    #[error("invalid request metadata: {0}")]
    Metadata(#[from] tonic::metadata::errors::InvalidMetadataValue),

    #[error("url parse error: {0}")]
    Url(#[from] url::ParseError),

    #[error("xdg base directory error: {0}")]
    Xdg(#[from] xdg::BaseDirectoriesError),

    #[error("config file error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<tonic::Status> for AnkrError {
    fn from(status: tonic::Status) -> Self {
        AnkrError::Remote {
            code: status.code(),
            message: status.message().to_string(),
        }
    }
}
