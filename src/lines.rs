use std::{
    io,
    path::{Path, PathBuf},
    time::{Duration, SystemTime},
};

use tokio::fs;

use crate::{
    idfm::{
        client::IdfmClient,
        entities::LineRecord,
        error::{IdfmError, IdfmResult},
    },
    trains::Line,
};

/// Cached line records older than this are fetched again
pub const MAX_AGE: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(thiserror::Error, Debug)]
pub enum LineCacheError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Reference dataset error: {0}")]
    Idfm(#[from] IdfmError),

    #[error("Invalid cached record: {0}")]
    Deserialize(#[from] serde_json::Error),
}

pub type LineCacheResult<T> = Result<T, LineCacheError>;

/// Where fresh line records come from
#[allow(async_fn_in_trait)]
pub trait LineSource {
    async fn fetch_line_record(&self, line_id: &str) -> IdfmResult<serde_json::Value>;
}

impl LineSource for IdfmClient {
    async fn fetch_line_record(&self, line_id: &str) -> IdfmResult<serde_json::Value> {
        self.get_line_record(line_id).await
    }
}

/// One JSON file per line, named `<line id>.json`, holding the raw
/// reference record. The file's modification time decides staleness.
///
/// There is no locking: two polls racing on a stale line both fetch and
/// both overwrite the file with the same record.
pub struct LineCache<S> {
    source: S,
    dir: PathBuf,
    max_age: Duration,
}

impl<S: LineSource> LineCache<S> {
    pub fn new(source: S, dir: impl Into<PathBuf>) -> Self {
        LineCache {
            source,
            dir: dir.into(),
            max_age: MAX_AGE,
        }
    }

    /// Creates the cache directory if missing
    pub async fn init(&self) -> io::Result<()> {
        fs::create_dir_all(&self.dir).await
    }

    fn path(&self, line_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", line_id))
    }

    async fn is_fresh(&self, path: &Path, now: SystemTime) -> bool {
        let modified = match fs::metadata(path).await.and_then(|m| m.modified()) {
            Ok(modified) => modified,
            Err(_) => return false,
        };

        // a modification time in the future counts as fresh
        match now.duration_since(modified) {
            Ok(age) => age <= self.max_age,
            Err(_) => true,
        }
    }

    pub async fn resolve(&self, line_id: &str) -> LineCacheResult<Line> {
        let path = self.path(line_id);

        if !self.is_fresh(&path, SystemTime::now()).await {
            log::debug!("Refreshing line info for {}", line_id);
            let record = self.source.fetch_line_record(line_id).await?;
            // a record that won't read back is never cached
            let line: LineRecord = serde_json::from_value(record.clone())?;
            fs::write(&path, serde_json::to_vec(&record)?).await?;
            return Ok(line.into());
        }

        let contents = fs::read(&path).await?;
        let record: LineRecord = serde_json::from_slice(&contents)?;
        Ok(record.into())
    }
}
