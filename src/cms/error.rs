#[derive(Debug, thiserror::Error)]
pub enum CmsError {
    #[error("Reqwest error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Status code {status} from {url}")]
    Status { status: u16, url: String },

    #[error("Invalid response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Repository has no master ref")]
    NoMasterRef,

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Fixture error: {0}")]
    Fixture(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
