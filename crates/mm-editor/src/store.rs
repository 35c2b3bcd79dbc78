//! Node persistence.
//!
//! `NodeStore` is the seam to whatever keeps maps between sessions. The
//! session writes through it after every applied mutation and treats
//! failures as non-fatal.

use mm_core::id::NodeId;
use mm_core::model::{MapId, Node};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("node {id} already exists in map {map}")]
    Conflict { map: MapId, id: NodeId },
    #[error("node {id} not found in map {map}")]
    NotFound { map: MapId, id: NodeId },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed map file: {0}")]
    Format(#[from] serde_json::Error),
}

/// Persistence for the nodes of one or more maps.
pub trait NodeStore {
    fn create(&mut self, map: &MapId, node: &Node) -> Result<(), StoreError>;
    fn update(&mut self, map: &MapId, node: &Node) -> Result<(), StoreError>;
    fn delete(&mut self, map: &MapId, id: NodeId) -> Result<(), StoreError>;
    /// Every node of `map`, sorted by id. Unknown maps are empty.
    fn fetch_all(&self, map: &MapId) -> Result<Vec<Node>, StoreError>;
}

type MapNodes = HashMap<NodeId, Node>;

fn sorted(nodes: &MapNodes) -> Vec<Node> {
    let mut out: Vec<Node> = nodes.values().cloned().collect();
    out.sort_by(|a, b| a.id.cmp(&b.id));
    out
}

fn apply_create(nodes: &mut MapNodes, map: &MapId, node: &Node) -> Result<(), StoreError> {
    if nodes.contains_key(&node.id) {
        return Err(StoreError::Conflict {
            map: map.clone(),
            id: node.id,
        });
    }
    nodes.insert(node.id, node.clone());
    Ok(())
}

fn apply_update(nodes: &mut MapNodes, map: &MapId, node: &Node) -> Result<(), StoreError> {
    match nodes.get_mut(&node.id) {
        Some(slot) => {
            *slot = node.clone();
            Ok(())
        }
        None => Err(StoreError::NotFound {
            map: map.clone(),
            id: node.id,
        }),
    }
}

fn apply_delete(nodes: &mut MapNodes, map: &MapId, id: NodeId) -> Result<(), StoreError> {
    nodes
        .remove(&id)
        .map(|_| ())
        .ok_or_else(|| StoreError::NotFound {
            map: map.clone(),
            id,
        })
}

// ─── In-memory store ────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct MemoryInner {
    maps: HashMap<MapId, MapNodes>,
    fail_writes: bool,
    writes: usize,
}

/// Shared in-memory store. Clones share state, so a test can keep a handle
/// while a session owns another.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make every subsequent write fail with `Unavailable`.
    pub fn set_fail_writes(&self, fail: bool) {
        self.lock().fail_writes = fail;
    }

    /// Replace the contents of `map` wholesale.
    pub fn seed(&self, map: &MapId, nodes: Vec<Node>) {
        let entries = nodes.into_iter().map(|n| (n.id, n)).collect();
        self.lock().maps.insert(map.clone(), entries);
    }

    pub fn nodes(&self, map: &MapId) -> Vec<Node> {
        self.lock().maps.get(map).map(sorted).unwrap_or_default()
    }

    pub fn get(&self, map: &MapId, id: NodeId) -> Option<Node> {
        self.lock().maps.get(map)?.get(&id).cloned()
    }

    /// Successful writes so far.
    pub fn write_count(&self) -> usize {
        self.lock().writes
    }

    fn write<F>(&self, map: &MapId, op: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut MapNodes) -> Result<(), StoreError>,
    {
        let mut inner = self.lock();
        if inner.fail_writes {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        op(inner.maps.entry(map.clone()).or_default())?;
        inner.writes += 1;
        Ok(())
    }
}

impl NodeStore for MemoryStore {
    fn create(&mut self, map: &MapId, node: &Node) -> Result<(), StoreError> {
        self.write(map, |nodes| apply_create(nodes, map, node))
    }

    fn update(&mut self, map: &MapId, node: &Node) -> Result<(), StoreError> {
        self.write(map, |nodes| apply_update(nodes, map, node))
    }

    fn delete(&mut self, map: &MapId, id: NodeId) -> Result<(), StoreError> {
        self.write(map, |nodes| apply_delete(nodes, map, id))
    }

    fn fetch_all(&self, map: &MapId) -> Result<Vec<Node>, StoreError> {
        Ok(self.nodes(map))
    }
}

// ─── JSON file store ────────────────────────────────────────────────────

/// One `<map>.json` file per map under a directory. Every write rewrites
/// the file through a temporary and a rename.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing `map`. Characters outside `[A-Za-z0-9_-]` become `_`.
    pub fn path_for(&self, map: &MapId) -> PathBuf {
        let stem: String = map
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        let stem = if stem.is_empty() { "map".to_string() } else { stem };
        self.dir.join(format!("{stem}.json"))
    }

    fn load(&self, map: &MapId) -> Result<MapNodes, StoreError> {
        let path = self.path_for(map);
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(MapNodes::new()),
            Err(e) => return Err(e.into()),
        };
        let nodes: Vec<Node> = serde_json::from_str(&text)?;
        Ok(nodes.into_iter().map(|n| (n.id, n)).collect())
    }

    fn save(&self, map: &MapId, nodes: &MapNodes) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(map);
        let tmp = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(&sorted(nodes))?;
        if let Err(e) = fs::write(&tmp, json).and_then(|()| fs::rename(&tmp, &path)) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        Ok(())
    }

    fn modify<F>(&self, map: &MapId, op: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut MapNodes) -> Result<(), StoreError>,
    {
        let mut nodes = self.load(map)?;
        op(&mut nodes)?;
        self.save(map, &nodes)
    }
}

impl NodeStore for JsonFileStore {
    fn create(&mut self, map: &MapId, node: &Node) -> Result<(), StoreError> {
        self.modify(map, |nodes| apply_create(nodes, map, node))
    }

    fn update(&mut self, map: &MapId, node: &Node) -> Result<(), StoreError> {
        self.modify(map, |nodes| apply_update(nodes, map, node))
    }

    fn delete(&mut self, map: &MapId, id: NodeId) -> Result<(), StoreError> {
        self.modify(map, |nodes| apply_delete(nodes, map, id))
    }

    fn fetch_all(&self, map: &MapId) -> Result<Vec<Node>, StoreError> {
        Ok(sorted(&self.load(map)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mm_core::model::Point;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn node(name: &str) -> Node {
        Node::new(NodeId::intern(name), name, Point::new(1.0, 2.0))
    }

    #[test]
    fn memory_store_crud() {
        let map = MapId::new("plans");
        let mut store = MemoryStore::new();
        store.create(&map, &node("b")).unwrap();
        store.create(&map, &node("a")).unwrap();
        assert!(matches!(
            store.create(&map, &node("a")),
            Err(StoreError::Conflict { .. })
        ));

        let mut a = node("a");
        a.title = "renamed".into();
        store.update(&map, &a).unwrap();
        let ids: Vec<String> = store
            .fetch_all(&map)
            .unwrap()
            .iter()
            .map(|n| n.id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(store.get(&map, NodeId::intern("a")).unwrap().title, "renamed");

        store.delete(&map, NodeId::intern("b")).unwrap();
        assert!(matches!(
            store.delete(&map, NodeId::intern("b")),
            Err(StoreError::NotFound { .. })
        ));
        assert_eq!(store.nodes(&map).len(), 1);
        assert_eq!(store.write_count(), 4);
    }

    #[test]
    fn memory_store_failure_injection() {
        let map = MapId::new("plans");
        let mut store = MemoryStore::new();
        let handle = store.clone();
        handle.set_fail_writes(true);
        assert!(matches!(
            store.create(&map, &node("a")),
            Err(StoreError::Unavailable(_))
        ));
        assert!(handle.nodes(&map).is_empty());
        handle.set_fail_writes(false);
        store.create(&map, &node("a")).unwrap();
        assert_eq!(handle.nodes(&map).len(), 1);
    }

    #[test]
    fn maps_are_isolated() {
        let mut store = MemoryStore::new();
        store.create(&MapId::new("one"), &node("a")).unwrap();
        assert!(store.fetch_all(&MapId::new("two")).unwrap().is_empty());
    }

    #[test]
    fn json_store_persists_between_instances() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("maps");
        let map = MapId::new("Trip / 2026");
        let mut store = JsonFileStore::new(&dir);
        assert!(store.fetch_all(&map).unwrap().is_empty());

        store.create(&map, &node("a")).unwrap();
        store.create(&map, &node("b")).unwrap();
        store.delete(&map, NodeId::intern("a")).unwrap();

        assert_eq!(store.path_for(&map), dir.join("Trip___2026.json"));
        let reopened = JsonFileStore::new(&dir);
        let nodes = reopened.fetch_all(&map).unwrap();
        assert_eq!(nodes, vec![node("b")]);
        assert!(!dir.join("Trip___2026.json.tmp").exists());
    }

    #[test]
    fn json_store_reports_corrupt_files() {
        let tmp = TempDir::new().unwrap();
        let store = JsonFileStore::new(tmp.path());
        let map = MapId::new("broken");
        fs::write(store.path_for(&map), "{ not json").unwrap();
        assert!(matches!(store.fetch_all(&map), Err(StoreError::Format(_))));
    }
}
