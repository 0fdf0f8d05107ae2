use crate::error::StoreError;
use crate::memory::Tables;
use serde::{Deserialize, Serialize};
use std::fs::{create_dir_all, rename, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use time::format_description::well_known::Rfc3339;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
pub struct MetaFile {
    pub sites: usize,
    pub pages: usize,
    pub lemmas: usize,
    pub created_at: String,
    pub version: u32,
}

pub struct IndexPaths {
    pub root: PathBuf,
}

impl IndexPaths {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        Self { root: root.as_ref().to_path_buf() }
    }
    fn snapshot(&self) -> PathBuf { self.root.join("snapshot.bin") }
    fn snapshot_tmp(&self) -> PathBuf { self.root.join("snapshot.bin.tmp") }
    fn meta(&self) -> PathBuf { self.root.join("meta.json") }
}

pub fn snapshot_exists(paths: &IndexPaths) -> bool {
    paths.snapshot().is_file()
}

/// Write all tables, replacing the previous snapshot only once the new one is
/// complete on disk.
pub fn save_snapshot(paths: &IndexPaths, tables: &Tables) -> Result<(), StoreError> {
    create_dir_all(&paths.root)?;
    let bytes = bincode::serialize(tables)?;
    {
        let mut f = File::create(paths.snapshot_tmp())?;
        f.write_all(&bytes)?;
        f.sync_all()?;
    }
    rename(paths.snapshot_tmp(), paths.snapshot())?;

    let meta = MetaFile {
        sites: tables.site_count(),
        pages: tables.page_count(),
        lemmas: tables.lemma_count(),
        created_at: time::OffsetDateTime::now_utc().format(&Rfc3339).unwrap_or_default(),
        version: SNAPSHOT_VERSION,
    };
    save_meta(paths, &meta)?;
    tracing::debug!(root = %paths.root.display(), pages = meta.pages, "index snapshot saved");
    Ok(())
}

pub fn load_snapshot(paths: &IndexPaths) -> Result<Tables, StoreError> {
    let meta = load_meta(paths)?;
    if meta.version != SNAPSHOT_VERSION {
        return Err(StoreError::Backend(format!(
            "unsupported snapshot version {} (expected {SNAPSHOT_VERSION})",
            meta.version
        )));
    }
    let mut f = File::open(paths.snapshot())?;
    let mut buf = Vec::new();
    f.read_to_end(&mut buf)?;
    let tables = bincode::deserialize(&buf)?;
    Ok(tables)
}

pub fn save_meta(paths: &IndexPaths, meta: &MetaFile) -> Result<(), StoreError> {
    create_dir_all(&paths.root)?;
    let mut f = File::create(paths.meta())?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

pub fn load_meta(paths: &IndexPaths) -> Result<MetaFile, StoreError> {
    let mut f = File::open(paths.meta())?;
    let mut buf = String::new();
    f.read_to_string(&mut buf)?;
    let meta: MetaFile = serde_json::from_str(&buf)?;
    Ok(meta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::Store;
    use crate::NewPage;
    use std::collections::HashMap;

    #[test]
    fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = MemoryStore::open(dir.path()).unwrap();
            let site = store.begin_site("Docs", "https://docs.example").unwrap();
            let lemmas: HashMap<String, u32> = [("rust".to_string(), 2)].into_iter().collect();
            let page = NewPage { site_id: site.id, path: "/", code: 200, content: "<p>rust rust</p>" };
            store.replace_page(page, &lemmas).unwrap();
            store.flush().unwrap();
        }

        let meta = load_meta(&IndexPaths::new(dir.path())).unwrap();
        assert_eq!((meta.sites, meta.pages, meta.lemmas), (1, 1, 1));

        let reopened = MemoryStore::open(dir.path()).unwrap();
        let site = reopened.site_by_url("https://docs.example/").unwrap().unwrap();
        let page = reopened.page(site.id, "/").unwrap().unwrap();
        assert_eq!(page.content, "<p>rust rust</p>");
        assert_eq!(reopened.lemma(site.id, "rust").unwrap().unwrap().frequency, 1);
    }

    #[test]
    fn missing_snapshot_opens_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = MemoryStore::open(dir.path().join("fresh")).unwrap();
        assert!(store.sites().unwrap().is_empty());
    }
}
