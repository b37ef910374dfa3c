//! Durable response store, one directory per generation
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/<generation>/generation.json     metadata
//! <root>/<generation>/<sha256>.entry      JSON header line + raw body
//! <root>/.trash-<uuid>/                   generation being deleted
//! ```
//!
//! Every write lands in a `.tmp-<uuid>` file first and is renamed into
//! place, so readers only ever see whole entries.

use crate::cache::generation::{GenerationId, GenerationInfo};
use crate::error::{WarmbootError, WarmbootResult};
use crate::fetch::{Request, Response, ResponseSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

const METADATA_FILE: &str = "generation.json";
const ENTRY_EXTENSION: &str = "entry";
const TRASH_PREFIX: &str = ".trash-";
const TMP_PREFIX: &str = ".tmp-";

/// Header stored in front of every entry body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryHeader {
    pub url: String,
    pub status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub stored_at: DateTime<Utc>,
}

/// One cached response
#[derive(Debug, Clone)]
pub struct CachedEntry {
    pub header: EntryHeader,
    pub body: Vec<u8>,
}

impl CachedEntry {
    fn decode(path: &Path, bytes: Vec<u8>) -> WarmbootResult<Self> {
        let corrupt = |reason: String| WarmbootError::CacheCorrupt {
            path: path.to_path_buf(),
            reason,
        };

        let split = bytes
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| corrupt("missing header terminator".to_string()))?;
        let header: EntryHeader =
            serde_json::from_slice(&bytes[..split]).map_err(|e| corrupt(e.to_string()))?;
        let body = bytes[split + 1..].to_vec();

        Ok(Self { header, body })
    }

    fn encode(header: &EntryHeader, body: &[u8]) -> WarmbootResult<Vec<u8>> {
        let mut bytes = serde_json::to_vec(header)?;
        bytes.reserve(body.len() + 1);
        bytes.push(b'\n');
        bytes.extend_from_slice(body);
        Ok(bytes)
    }

    /// Serve this entry as a response
    pub fn into_response(self) -> Response {
        Response {
            url: self.header.url,
            status: self.header.status,
            content_type: self.header.content_type,
            body: self.body,
            source: ResponseSource::Cache,
        }
    }
}

/// Entry count and on-disk size of a generation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationStats {
    pub entries: usize,
    pub bytes: u64,
}

/// Root of all cache generations
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn generation_dir(&self, id: &GenerationId) -> PathBuf {
        self.root.join(id.as_str())
    }

    /// Open a generation, creating it (state `building`) if needed.
    ///
    /// Opening an existing generation never resets its metadata or entries.
    pub async fn open(&self, id: &GenerationId) -> WarmbootResult<CacheHandle> {
        let dir = self.generation_dir(id);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| WarmbootError::io(format!("creating cache generation {}", dir.display()), e))?;

        let metadata = dir.join(METADATA_FILE);
        if !fs::try_exists(&metadata).await.unwrap_or(false) {
            let info = GenerationInfo::new(id.clone());
            write_atomic(&dir, &metadata, &serde_json::to_vec_pretty(&info)?).await?;
            debug!("Created cache generation {}", id);
        }

        Ok(CacheHandle {
            id: id.clone(),
            dir,
        })
    }

    /// Handle to a generation only if it already exists
    pub async fn existing(&self, id: &GenerationId) -> WarmbootResult<Option<CacheHandle>> {
        let dir = self.generation_dir(id);
        match fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(Some(CacheHandle {
                id: id.clone(),
                dir,
            })),
            Ok(_) => Ok(None),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WarmbootError::io(format!("inspecting {}", dir.display()), e)),
        }
    }

    /// All generation ids currently in the store
    pub async fn list_generations(&self) -> WarmbootResult<BTreeSet<GenerationId>> {
        let mut generations = BTreeSet::new();

        let mut entries = match fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(generations),
            Err(e) => return Err(WarmbootError::io("reading cache root", e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| WarmbootError::io("reading cache root entry", e))?
        {
            let is_dir = entry.file_type().await.map(|t| t.is_dir()).unwrap_or(false);
            if !is_dir {
                continue;
            }
            // Hidden names are trash or scratch space; GenerationId refuses them
            if let Ok(id) = GenerationId::new(entry.file_name().to_string_lossy().into_owned()) {
                generations.insert(id);
            }
        }

        Ok(generations)
    }

    /// Metadata of a generation, `None` if it does not exist
    pub async fn generation_info(&self, id: &GenerationId) -> WarmbootResult<Option<GenerationInfo>> {
        let path = self.generation_dir(id).join(METADATA_FILE);
        match fs::read(&path).await {
            Ok(bytes) => {
                let info = serde_json::from_slice(&bytes).map_err(|e| WarmbootError::CacheCorrupt {
                    path: path.clone(),
                    reason: e.to_string(),
                })?;
                Ok(Some(info))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(WarmbootError::io(format!("reading {}", path.display()), e)),
        }
    }

    /// Mark a generation's install as finished
    pub async fn mark_complete(&self, id: &GenerationId) -> WarmbootResult<GenerationInfo> {
        let info = self
            .generation_info(id)
            .await?
            .ok_or_else(|| WarmbootError::GenerationNotFound(id.to_string()))?
            .complete();

        let dir = self.generation_dir(id);
        write_atomic(&dir, &dir.join(METADATA_FILE), &serde_json::to_vec_pretty(&info)?).await?;
        Ok(info)
    }

    /// Newest generation whose install completed
    pub async fn latest_complete(&self) -> WarmbootResult<Option<GenerationInfo>> {
        let mut latest: Option<GenerationInfo> = None;
        for id in self.list_generations().await? {
            let info = match self.generation_info(&id).await {
                Ok(Some(info)) => info,
                Ok(None) => continue,
                Err(e) => {
                    warn!("Skipping generation {}: {}", id, e);
                    continue;
                }
            };
            if !info.is_complete() {
                continue;
            }
            let newer = latest
                .as_ref()
                .map_or(true, |current| info.completed_at > current.completed_at);
            if newer {
                latest = Some(info);
            }
        }
        Ok(latest)
    }

    /// Delete every generation except `current`, returning the removed ids.
    ///
    /// Each stale generation is first renamed to a hidden trash directory,
    /// so it leaves `list_generations` in one step, then removed. Readers
    /// holding an open entry finish against it; later lookups see a miss.
    pub async fn delete_all_except(&self, current: &GenerationId) -> WarmbootResult<Vec<GenerationId>> {
        let mut removed = Vec::new();

        for id in self.list_generations().await? {
            if &id == current {
                continue;
            }
            if self.remove_generation(&id).await? {
                removed.push(id);
            }
        }

        self.sweep_trash().await;
        self.sweep_scratch(current).await;

        if !removed.is_empty() {
            info!("Removed {} stale cache generation(s)", removed.len());
        }
        Ok(removed)
    }

    /// Delete every generation
    pub async fn clear(&self) -> WarmbootResult<Vec<GenerationId>> {
        let mut removed = Vec::new();
        for id in self.list_generations().await? {
            if self.remove_generation(&id).await? {
                removed.push(id);
            }
        }
        self.sweep_trash().await;
        Ok(removed)
    }

    async fn remove_generation(&self, id: &GenerationId) -> WarmbootResult<bool> {
        let dir = self.generation_dir(id);
        let trash = self.root.join(format!("{}{}", TRASH_PREFIX, Uuid::new_v4()));

        match fs::rename(&dir, &trash).await {
            Ok(()) => {}
            // Someone else got there first
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(false),
            Err(e) => {
                return Err(WarmbootError::io(
                    format!("detaching cache generation {}", id),
                    e,
                ))
            }
        }

        if let Err(e) = fs::remove_dir_all(&trash).await {
            warn!("Failed to remove detached generation {}: {}", id, e);
        }
        debug!("Deleted cache generation {}", id);
        Ok(true)
    }

    /// Remove trash left behind by an interrupted deletion
    async fn sweep_trash(&self) {
        let Ok(mut entries) = fs::read_dir(&self.root).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(TRASH_PREFIX) {
                if let Err(e) = fs::remove_dir_all(entry.path()).await {
                    debug!("Leaving trash {}: {}", entry.path().display(), e);
                }
            }
        }
    }

    /// Remove scratch files an interrupted write left inside a generation
    async fn sweep_scratch(&self, id: &GenerationId) {
        let Ok(mut entries) = fs::read_dir(self.generation_dir(id)).await else {
            return;
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            if entry.file_name().to_string_lossy().starts_with(TMP_PREFIX) {
                if let Err(e) = fs::remove_file(entry.path()).await {
                    debug!("Leaving scratch file {}: {}", entry.path().display(), e);
                }
            }
        }
    }
}

/// Access to the entries of one generation
#[derive(Debug, Clone)]
pub struct CacheHandle {
    id: GenerationId,
    dir: PathBuf,
}

impl CacheHandle {
    pub fn generation(&self) -> &GenerationId {
        &self.id
    }

    fn entry_path(&self, request: &Request) -> PathBuf {
        self.dir
            .join(format!("{}.{}", request.cache_key(), ENTRY_EXTENSION))
    }

    /// Look up the entry for a request
    ///
    /// A generation deleted underneath the caller reads as a miss.
    pub async fn get(&self, request: &Request) -> WarmbootResult<Option<CachedEntry>> {
        let path = self.entry_path(request);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(WarmbootError::io(format!("reading {}", path.display()), e)),
        };

        let entry = CachedEntry::decode(&path, bytes)?;
        if entry.header.url != request.url() {
            // SHA256 collision or a hand-edited file; either way not ours
            warn!("Cache entry {} belongs to {}", path.display(), entry.header.url);
            return Ok(None);
        }
        Ok(Some(entry))
    }

    /// Store a response for a request, overwriting any previous entry.
    ///
    /// Only 2xx responses are written; returns whether anything was stored.
    pub async fn put(&self, request: &Request, response: &Response) -> WarmbootResult<bool> {
        if !response.is_success() {
            debug!("Not caching {} (HTTP {})", request, response.status);
            return Ok(false);
        }

        let header = EntryHeader {
            url: request.url().to_string(),
            status: response.status,
            content_type: response.content_type.clone(),
            stored_at: Utc::now(),
        };
        let bytes = CachedEntry::encode(&header, &response.body)?;
        write_atomic(&self.dir, &self.entry_path(request), &bytes).await?;

        debug!("Cached {} in {}", request, self.id);
        Ok(true)
    }

    /// Headers of every entry, sorted by URL
    pub async fn entries(&self) -> WarmbootResult<Vec<EntryHeader>> {
        let mut headers = Vec::new();
        for path in self.entry_paths().await? {
            let bytes = match fs::read(&path).await {
                Ok(bytes) => bytes,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(WarmbootError::io(format!("reading {}", path.display()), e)),
            };
            headers.push(CachedEntry::decode(&path, bytes)?.header);
        }
        headers.sort_by(|a, b| a.url.cmp(&b.url));
        Ok(headers)
    }

    /// Entry count and total size on disk
    pub async fn stats(&self) -> WarmbootResult<GenerationStats> {
        let mut stats = GenerationStats::default();
        for path in self.entry_paths().await? {
            if let Ok(meta) = fs::metadata(&path).await {
                stats.entries += 1;
                stats.bytes += meta.len();
            }
        }
        Ok(stats)
    }

    async fn entry_paths(&self) -> WarmbootResult<Vec<PathBuf>> {
        let mut paths = Vec::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(paths),
            Err(e) => return Err(WarmbootError::io("reading cache generation", e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| WarmbootError::io("reading cache generation entry", e))?
        {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == ENTRY_EXTENSION) {
                paths.push(path);
            }
        }
        Ok(paths)
    }
}

/// Write `bytes` to `target` through a scratch file in `dir`
async fn write_atomic(dir: &Path, target: &Path, bytes: &[u8]) -> WarmbootResult<()> {
    let tmp = dir.join(format!("{}{}", TMP_PREFIX, Uuid::new_v4()));

    fs::write(&tmp, bytes)
        .await
        .map_err(|e| WarmbootError::io(format!("writing {}", tmp.display()), e))?;

    if let Err(e) = fs::rename(&tmp, target).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(WarmbootError::io(format!("moving entry into {}", target.display()), e));
    }
    Ok(())
}
