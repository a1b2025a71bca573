use thiserror::Error;

#[derive(Error, Debug)]
pub enum OfxError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Signon rejected with code {code}: {message}")]
    SignonRejected { code: String, message: String },
    #[error("Malformed OFX response: {0}")]
    MalformedResponse(String),
}
