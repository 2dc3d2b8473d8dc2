#[derive(thiserror::Error, Debug)]
pub enum IdfmError {
    #[error("Init error: {0}")]
    Init(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Error response from {url}: {status}")]
    Status { status: u16, url: String },

    #[error("Deserialize error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Line not found in reference dataset: {0}")]
    LineNotFound(String),
}

pub type IdfmResult<T> = Result<T, IdfmError>;
