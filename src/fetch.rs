use std::io::Read;
use std::path::Path;

use tracing::debug;

use crate::error::{Result, SignError};

/// Somewhere source documents can be read from.
pub trait DocumentSource {
    fn fetch(&self, location: &str) -> Result<Vec<u8>>;
}

/// Retrieves documents over HTTP(S). One attempt, no retries.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: ureq::Agent,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    pub fn with_agent(agent: ureq::Agent) -> Self {
        Self { agent }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentSource for HttpFetcher {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        debug!(url = location, "fetching source document");

        let response = match self.agent.get(location).call() {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                return Err(SignError::FetchError {
                    status,
                    reason: response.status_text().to_string(),
                });
            }
            Err(ureq::Error::Transport(transport)) => {
                return Err(SignError::UnreachableError(transport.to_string()));
            }
        };

        let mut bytes = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut bytes)
            .map_err(|e| SignError::UnreachableError(format!("Failed to read response: {}", e)))?;

        debug!(url = location, bytes = bytes.len(), "fetched source document");
        Ok(bytes)
    }
}

/// Reads documents from the local filesystem.
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSource;

impl DocumentSource for FileSource {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        std::fs::read(Path::new(location))
            .map_err(|e| SignError::UnreachableError(format!("{}: {}", location, e)))
    }
}

/// Dispatches `http://`/`https://` locations to HTTP and everything else to
/// the filesystem.
#[derive(Debug, Clone, Default)]
pub struct AnySource {
    http: HttpFetcher,
}

impl DocumentSource for AnySource {
    fn fetch(&self, location: &str) -> Result<Vec<u8>> {
        if location.starts_with("http://") || location.starts_with("https://") {
            self.http.fetch(location)
        } else {
            FileSource.fetch(location)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_unreachable() {
        let err = FileSource
            .fetch("/definitely/not/here/source.pdf")
            .unwrap_err();
        assert!(matches!(err, SignError::UnreachableError(_)));
        assert!(err.is_fetch_failure());
    }

    #[test]
    fn reads_local_files() {
        let path = std::env::temp_dir().join("quickink-fetch-test.pdf");
        std::fs::write(&path, b"%PDF-1.4").unwrap();
        let bytes = AnySource::default()
            .fetch(path.to_str().unwrap())
            .unwrap();
        assert_eq!(bytes, b"%PDF-1.4");
        std::fs::remove_file(&path).ok();
    }
}
