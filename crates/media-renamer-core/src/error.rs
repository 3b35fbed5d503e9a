use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Metadata unavailable: {0}")]
    MetadataUnavailable(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Tag error: {0}")]
    Tags(String),

    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(code, response) => {
                Error::Http(format!("{} returned status {}", response.get_url(), code))
            }
            ureq::Error::Transport(transport) => Error::Http(transport.to_string()),
        }
    }
}
