//! Shared test fixtures for the engine tests
//!
//! `MockRemoteStore` keeps the remote tree in memory, pages listings with
//! numeric offset tokens, and lets tests inject failures, hold operations at
//! a gate and observe transfer concurrency.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::Path;
use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tempfile::TempDir;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use skyfold_cache::{DatabasePool, SqliteCachedFileRegistry, SqliteMetadataStore, SqliteTaskStore};
use skyfold_core::domain::{ItemId, ItemType, RemotePath};
use skyfold_core::ports::{IRemoteStore, RemoteError, RemoteItem, RemoteListing};
use skyfold_sync::{
    ExecutorContext, LocalFileCache, SyncAdapter, TransferRegistry, WorkflowScheduler,
};

// ============================================================================
// Mock remote store
// ============================================================================

#[derive(Debug, Clone)]
struct Entry {
    path: RemotePath,
    item_type: ItemType,
    data: Vec<u8>,
    last_modified: DateTime<Utc>,
}

/// Tracks current and peak concurrency of one operation kind
#[derive(Debug, Default)]
pub struct Gauge {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl Gauge {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

/// Opens a gate installed with [`MockRemoteStore::hold`]
pub struct GateHandle {
    open: watch::Sender<bool>,
}

impl GateHandle {
    pub fn open(&self) {
        self.open.send_replace(true);
    }
}

pub struct MockRemoteStore {
    entries: Mutex<BTreeMap<String, Entry>>,
    page_size: usize,
    clock: AtomicI64,
    failures: Mutex<HashMap<&'static str, VecDeque<RemoteError>>>,
    gates: Mutex<HashMap<&'static str, watch::Receiver<bool>>>,
    calls: Mutex<Vec<String>>,
    transfer_delay: Mutex<Duration>,
    reported_size: Mutex<Option<u64>>,
    pub uploads: Gauge,
    pub downloads: Gauge,
}

impl MockRemoteStore {
    pub fn new(page_size: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            page_size,
            clock: AtomicI64::new(0),
            failures: Mutex::new(HashMap::new()),
            gates: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
            transfer_delay: Mutex::new(Duration::ZERO),
            reported_size: Mutex::new(None),
            uploads: Gauge::default(),
            downloads: Gauge::default(),
        }
    }

    /// Every mutation moves the clock one second forward
    fn tick(&self) -> DateTime<Utc> {
        let n = self.clock.fetch_add(1, Ordering::SeqCst) + 1;
        Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + chrono::Duration::seconds(n)
    }

    fn key(path: &RemotePath) -> String {
        path.key()
    }

    // --- test setup ---

    pub fn add_file(&self, path: &str, data: &[u8]) -> DateTime<Utc> {
        let path: RemotePath = path.parse().unwrap();
        let last_modified = self.tick();
        self.entries.lock().unwrap().insert(
            Self::key(&path),
            Entry {
                path,
                item_type: ItemType::File,
                data: data.to_vec(),
                last_modified,
            },
        );
        last_modified
    }

    pub fn add_folder(&self, path: &str) {
        let path: RemotePath = path.parse().unwrap();
        let last_modified = self.tick();
        self.entries.lock().unwrap().insert(
            Self::key(&path),
            Entry {
                path,
                item_type: ItemType::Folder,
                data: Vec::new(),
                last_modified,
            },
        );
    }

    /// Removes an entry and everything below it
    pub fn remove(&self, path: &str) {
        let path: RemotePath = path.parse().unwrap();
        self.entries
            .lock()
            .unwrap()
            .retain(|_, e| !(e.path.matches(&path) || path.is_ancestor_of(&e.path)));
    }

    pub fn contents(&self, path: &str) -> Option<Vec<u8>> {
        let path: RemotePath = path.parse().unwrap();
        self.entries
            .lock()
            .unwrap()
            .get(&Self::key(&path))
            .map(|e| e.data.clone())
    }

    pub fn exists(&self, path: &str) -> bool {
        let path: RemotePath = path.parse().unwrap();
        self.entries.lock().unwrap().contains_key(&Self::key(&path))
    }

    /// Makes the next call of `op` fail with `error`
    pub fn fail_next(&self, op: &'static str, error: RemoteError) {
        self.failures
            .lock()
            .unwrap()
            .entry(op)
            .or_default()
            .push_back(error);
    }

    /// Blocks calls of `op` until the returned gate is opened
    pub fn hold(&self, op: &'static str) -> GateHandle {
        let (tx, rx) = watch::channel(false);
        self.gates.lock().unwrap().insert(op, rx);
        GateHandle { open: tx }
    }

    pub fn set_transfer_delay(&self, delay: Duration) {
        *self.transfer_delay.lock().unwrap() = delay;
    }

    /// Uploads report this size instead of the stored size
    pub fn report_size(&self, size: u64) {
        *self.reported_size.lock().unwrap() = Some(size);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, op: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.starts_with(op))
            .count()
    }

    // --- internals ---

    async fn enter(&self, op: &'static str, path: &RemotePath) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(format!("{op} {path}"));
        let gate = self.gates.lock().unwrap().get(op).cloned();
        if let Some(mut gate) = gate {
            let _ = gate.wait_for(|open| *open).await;
        }
        match self.failures.lock().unwrap().get_mut(op).and_then(|q| q.pop_front()) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    async fn delay(&self) {
        let delay = *self.transfer_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn describe(entry: &Entry) -> RemoteItem {
        RemoteItem {
            name: entry.path.file_name().unwrap_or_default().to_string(),
            path: entry.path.clone(),
            item_type: entry.item_type,
            size: (entry.item_type == ItemType::File).then_some(entry.data.len() as u64),
            last_modified: Some(entry.last_modified),
        }
    }

    fn get(&self, path: &RemotePath) -> Option<Entry> {
        if path.is_root() {
            return Some(Entry {
                path: RemotePath::root(),
                item_type: ItemType::Folder,
                data: Vec::new(),
                last_modified: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
            });
        }
        self.entries.lock().unwrap().get(&Self::key(path)).cloned()
    }

    fn require_parent(&self, path: &RemotePath) -> Result<(), RemoteError> {
        match path.parent().and_then(|p| self.get(&p)) {
            Some(parent) if parent.item_type == ItemType::Folder => Ok(()),
            _ => Err(RemoteError::ParentFolderDoesNotExist),
        }
    }

    fn children(&self, path: &RemotePath) -> Vec<Entry> {
        self.entries
            .lock()
            .unwrap()
            .values()
            .filter(|e| e.path.parent().is_some_and(|p| p.matches(path)))
            .cloned()
            .collect()
    }

    fn move_entry(&self, source: &RemotePath, target: &RemotePath) -> Result<RemoteItem, RemoteError> {
        self.require_parent(target)?;
        if self.get(target).is_some() {
            return Err(RemoteError::ItemAlreadyExists);
        }
        let now = self.tick();
        let mut entries = self.entries.lock().unwrap();
        let moving: Vec<String> = entries
            .iter()
            .filter(|(_, e)| e.path.matches(source) || source.is_ancestor_of(&e.path))
            .map(|(k, _)| k.clone())
            .collect();
        for key in moving {
            if let Some(mut entry) = entries.remove(&key) {
                entry.path = entry
                    .path
                    .rebase(source, target)
                    .ok_or(RemoteError::ItemNotFound)?;
                if entry.path.matches(target) {
                    entry.last_modified = now;
                }
                entries.insert(Self::key(&entry.path), entry);
            }
        }
        entries
            .get(&Self::key(target))
            .map(Self::describe)
            .ok_or(RemoteError::ItemNotFound)
    }
}

#[async_trait]
impl IRemoteStore for MockRemoteStore {
    async fn fetch_metadata(&self, path: &RemotePath) -> Result<RemoteItem, RemoteError> {
        self.enter("metadata", path).await?;
        self.get(path)
            .map(|e| Self::describe(&e))
            .ok_or(RemoteError::ItemNotFound)
    }

    async fn fetch_listing(
        &self,
        path: &RemotePath,
        page_token: Option<&str>,
    ) -> Result<RemoteListing, RemoteError> {
        self.enter("listing", path).await?;
        match self.get(path) {
            Some(e) if e.item_type == ItemType::Folder => {}
            Some(_) => return Err(RemoteError::ItemTypeMismatch),
            None => return Err(RemoteError::ItemNotFound),
        }

        let offset = match page_token {
            Some(t) => t.parse::<usize>().map_err(|_| RemoteError::PageTokenInvalid)?,
            None => 0,
        };
        let children = self.children(path);
        if offset > children.len() {
            return Err(RemoteError::PageTokenInvalid);
        }
        let end = (offset + self.page_size).min(children.len());
        Ok(RemoteListing {
            items: children[offset..end].iter().map(Self::describe).collect(),
            next_page_token: (end < children.len()).then(|| end.to_string()),
        })
    }

    async fn download(
        &self,
        path: &RemotePath,
        destination: &Path,
        _cancel: &CancellationToken,
    ) -> Result<(), RemoteError> {
        self.downloads.enter();
        let result = async {
            self.enter("download", path).await?;
            self.delay().await;
            let entry = self.get(path).ok_or(RemoteError::ItemNotFound)?;
            if entry.item_type != ItemType::File {
                return Err(RemoteError::ItemTypeMismatch);
            }
            tokio::fs::write(destination, &entry.data)
                .await
                .map_err(|_| RemoteError::NoInternetConnection)
        }
        .await;
        self.downloads.leave();
        result
    }

    async fn upload(
        &self,
        source: &Path,
        path: &RemotePath,
        replace_existing: bool,
        _cancel: &CancellationToken,
    ) -> Result<RemoteItem, RemoteError> {
        self.uploads.enter();
        let result = async {
            self.enter("upload", path).await?;
            self.delay().await;
            self.require_parent(path)?;
            match self.get(path) {
                Some(e) if e.item_type == ItemType::Folder => {
                    return Err(RemoteError::ItemTypeMismatch)
                }
                Some(_) if !replace_existing => return Err(RemoteError::ItemAlreadyExists),
                _ => {}
            }
            let data = tokio::fs::read(source)
                .await
                .map_err(|_| RemoteError::ItemNotFound)?;
            let entry = Entry {
                path: path.clone(),
                item_type: ItemType::File,
                data,
                last_modified: self.tick(),
            };
            let mut described = Self::describe(&entry);
            if let Some(size) = *self.reported_size.lock().unwrap() {
                described.size = Some(size);
            }
            self.entries.lock().unwrap().insert(Self::key(path), entry);
            Ok(described)
        }
        .await;
        self.uploads.leave();
        result
    }

    async fn create_folder(&self, path: &RemotePath) -> Result<RemoteItem, RemoteError> {
        self.enter("create_folder", path).await?;
        self.require_parent(path)?;
        if self.get(path).is_some() {
            return Err(RemoteError::ItemAlreadyExists);
        }
        self.add_folder(path.as_str());
        self.get(path)
            .map(|e| Self::describe(&e))
            .ok_or(RemoteError::ItemNotFound)
    }

    async fn delete_file(&self, path: &RemotePath) -> Result<(), RemoteError> {
        self.enter("delete", path).await?;
        match self.get(path) {
            Some(e) if e.item_type == ItemType::File => {
                self.remove(path.as_str());
                Ok(())
            }
            Some(_) => Err(RemoteError::ItemTypeMismatch),
            None => Err(RemoteError::ItemNotFound),
        }
    }

    async fn delete_folder(&self, path: &RemotePath) -> Result<(), RemoteError> {
        self.enter("delete", path).await?;
        match self.get(path) {
            Some(e) if e.item_type == ItemType::Folder => {
                self.remove(path.as_str());
                Ok(())
            }
            Some(_) => Err(RemoteError::ItemTypeMismatch),
            None => Err(RemoteError::ItemNotFound),
        }
    }

    async fn move_file(
        &self,
        source: &RemotePath,
        target: &RemotePath,
    ) -> Result<RemoteItem, RemoteError> {
        self.enter("move", source).await?;
        match self.get(source) {
            Some(e) if e.item_type == ItemType::File => self.move_entry(source, target),
            Some(_) => Err(RemoteError::ItemTypeMismatch),
            None => Err(RemoteError::ItemNotFound),
        }
    }

    async fn move_folder(
        &self,
        source: &RemotePath,
        target: &RemotePath,
    ) -> Result<RemoteItem, RemoteError> {
        self.enter("move", source).await?;
        match self.get(source) {
            Some(e) if e.item_type == ItemType::Folder => self.move_entry(source, target),
            Some(_) => Err(RemoteError::ItemTypeMismatch),
            None => Err(RemoteError::ItemNotFound),
        }
    }
}

// ============================================================================
// Harness
// ============================================================================

/// An adapter wired to in-memory stores and a mock remote
pub struct Harness {
    pub adapter: SyncAdapter,
    pub ctx: Arc<ExecutorContext>,
    pub remote: Arc<MockRemoteStore>,
    pub dir: TempDir,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_options(100, 2, 4).await
    }

    pub async fn with_options(page_size: usize, max_uploads: usize, max_downloads: usize) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let pool = DatabasePool::in_memory()
            .await
            .expect("Failed to create in-memory database");
        let tasks = Arc::new(SqliteTaskStore::new(pool.clone()));
        let remote = Arc::new(MockRemoteStore::new(page_size));

        let ctx = Arc::new(ExecutorContext {
            metadata: Arc::new(SqliteMetadataStore::new(pool.clone())),
            uploads: tasks.clone(),
            deletions: tasks.clone(),
            reparents: tasks.clone(),
            enumerations: tasks,
            cached_files: Arc::new(SqliteCachedFileRegistry::new(pool)),
            remote: remote.clone(),
            local_cache: LocalFileCache::new(dir.path().join("cache")).expect("cache dir"),
            transfers: Arc::new(TransferRegistry::new()),
        });
        let adapter = SyncAdapter::new(
            Arc::clone(&ctx),
            WorkflowScheduler::new(max_uploads, max_downloads),
        );

        Self {
            adapter,
            ctx,
            remote,
            dir,
        }
    }

    /// Writes a host file and returns its path
    pub fn host_file(&self, name: &str, data: &[u8]) -> std::path::PathBuf {
        let path = self.dir.path().join("host").join(name);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, data).unwrap();
        path
    }

    /// Enumerates a folder fully and returns the child names, sorted
    pub async fn names(&self, folder: ItemId) -> Vec<String> {
        let mut names: Vec<String> = self
            .adapter
            .enumerate_all(folder)
            .await
            .unwrap()
            .into_iter()
            .map(|v| v.item.name)
            .collect();
        names.sort();
        names
    }

    pub async fn id_at(&self, path: &str) -> ItemId {
        self.adapter
            .item_id_for_path(&path.parse().unwrap())
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("no item at {path}"))
    }
}

pub fn path(s: &str) -> RemotePath {
    s.parse().unwrap()
}

/// Polls `check` until it holds, for at most two seconds
pub async fn eventually<F: FnMut() -> bool>(mut check: F) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within two seconds");
}
