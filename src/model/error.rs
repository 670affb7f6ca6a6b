use rocket::{
    http::{ContentType, Status},
    request::Request,
    response::{self, Responder, Response},
};
use std::{io, io::Cursor, path::PathBuf};
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to build request: {0}")]
    RequestBuildFailed(String),
    #[error("upstream unavailable: {0}")]
    UpstreamUnavailable(String),
    #[error("failed to decode response: {0}")]
    DecodeFailed(String),
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    #[error("failed to write quote: {0}")]
    StorageWriteFailed(String),
    #[error("failed to write {}: {source}", path.display())]
    LocalWriteFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Classifies a reqwest failure by the stage it happened in.
    pub fn from_reqwest(e: reqwest::Error) -> Error {
        if e.is_builder() {
            Error::RequestBuildFailed(e.to_string())
        } else if e.is_decode() {
            Error::DecodeFailed(e.to_string())
        } else {
            Error::UpstreamUnavailable(e.to_string())
        }
    }
}

/// Plain text 500 carrying the error message.
impl<'r> Responder<'r, 'static> for Error {
    fn respond_to(self, _: &'r Request<'_>) -> response::Result<'static> {
        error!(error = %self, "Error from controller");

        let body = format!("{}\n", self);

        Response::build()
            .header(ContentType::Plain)
            .status(Status::InternalServerError)
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}
