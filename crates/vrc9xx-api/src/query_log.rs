// Query log
//
// Optional diagnostic sink: every authenticated request and its decoded
// response are appended, timestamped, as pretty JSON to `vrc9xx-query.log`. Login-phase
// requests are never written.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{SecondsFormat, Utc};
use serde_json::Value;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Error;
use crate::request::ApiRequest;

const RECORD_SEPARATOR: &str = "=======================================\n";
const BODY_SEPARATOR: &str = "---------------------------------------\n";

/// Append-only request/response dump.
#[derive(Debug)]
pub struct QueryLog {
    path: PathBuf,
    file: Mutex<File>,
}

impl QueryLog {
    pub const FILE_NAME: &'static str = "vrc9xx-query.log";

    /// Create (or truncate) the log file inside `dir`. Runs before any
    /// request, so the header is written synchronously.
    pub fn create(dir: &Path) -> Result<Self, Error> {
        let path = dir.join(Self::FILE_NAME);
        let mut file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)?;
        file.write_all(RECORD_SEPARATOR.as_bytes())?;
        debug!(path = %path.display(), "dumping queries");
        Ok(Self {
            path,
            file: Mutex::new(File::from_std(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one request/response pair. Failures are logged, never raised.
    pub async fn record(&self, request: &ApiRequest, response: &Value) {
        if request.unauthenticated {
            return;
        }
        if let Err(e) = self.append(request, response).await {
            warn!(error = %e, "failed to write query log");
        }
    }

    async fn append(&self, request: &ApiRequest, response: &Value) -> Result<(), Error> {
        let request = serde_json::to_string_pretty(request).map_err(std::io::Error::from)?;
        let response = serde_json::to_string_pretty(response).map_err(std::io::Error::from)?;
        let at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let record =
            format!("{at}\n{request}\n{BODY_SEPARATOR}{response}\n{RECORD_SEPARATOR}");

        let mut file = self.file.lock().await;
        file.write_all(record.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
