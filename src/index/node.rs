//! Index nodes and the per-root arena that owns them
//!
//! Links run from a node toward its ancestors: a file node maps the name
//! of its containing directory to that directory's node, which in turn maps
//! its own parent's name, and so on up to the header root. The sentinel at
//! slot 0 maps every indexed file name to the nodes of those files.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Position of a node inside its `RootIndex` arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The sentinel node of every root
    pub const SENTINEL: NodeId = NodeId(0);

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One file or directory retained while scanning a header root
#[derive(Debug)]
pub struct IndexNode {
    /// Base name (empty only for the sentinel)
    name: Box<str>,

    /// Absolute path of the directory containing this entry
    parent: PathBuf,

    /// Name -> nodes reachable by stepping one level up under that name
    ancestors: HashMap<Box<str>, Vec<NodeId>>,
}

impl IndexNode {
    fn new(name: &str, parent: &Path) -> Self {
        Self {
            name: name.into(),
            parent: parent.to_path_buf(),
            ancestors: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Directory that contains this entry
    pub fn containing_dir(&self) -> &Path {
        &self.parent
    }

    /// Full path of the entry
    pub fn path(&self) -> PathBuf {
        self.parent.join(&*self.name)
    }

    /// Nodes reachable from this one under `name`
    pub fn ancestors(&self, name: &str) -> &[NodeId] {
        self.ancestors.get(name).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Arena of nodes for one scanned header root
#[derive(Debug)]
pub struct RootIndex {
    /// Absolute path of the scanned root
    root: PathBuf,

    nodes: Vec<IndexNode>,

    /// Number of indexed header files
    files: usize,
}

impl RootIndex {
    /// Create an arena holding only the sentinel
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            nodes: vec![IndexNode::new("", Path::new(""))],
            files: 0,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn node(&self, id: NodeId) -> &IndexNode {
        &self.nodes[id.index()]
    }

    pub fn sentinel(&self) -> &IndexNode {
        self.node(NodeId::SENTINEL)
    }

    /// Total number of nodes, sentinel excluded
    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of indexed header files
    pub fn file_count(&self) -> usize {
        self.files
    }

    pub(crate) fn alloc(&mut self, name: &str, parent: &Path) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(IndexNode::new(name, parent));
        id
    }

    /// Register a file node under its base name on the sentinel
    pub(crate) fn register_file(&mut self, file: NodeId) {
        let name = self.node(file).name.clone();
        self.link(NodeId::SENTINEL, name, file);
        self.files += 1;
    }

    /// Make `to` reachable from `from` under `name`
    pub(crate) fn link(&mut self, from: NodeId, name: Box<str>, to: NodeId) {
        self.nodes[from.index()]
            .ancestors
            .entry(name)
            .or_default()
            .push(to);
    }
}
