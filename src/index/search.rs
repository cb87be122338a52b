//! Header path lookup

use crate::error::{IndexError, IndexResult};
use crate::index::node::NodeId;
use crate::index::HeaderIndex;
use std::collections::HashSet;
use std::path::PathBuf;

impl HeaderIndex {
    /// Find every directory from which `header` resolves
    ///
    /// `header` is a slash-separated relative path (`a/b/c.h`); a leading
    /// slash and `.` segments are ignored. Segments are matched from the file
    /// name backwards and the search stops at the first segment with no
    /// match, so partial matches are never returned. Results are ordered by
    /// root registration, then by scan order, without duplicates.
    pub fn search(&self, header: &str) -> IndexResult<Vec<PathBuf>> {
        let segments: Vec<&str> = header
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();

        let not_found = || IndexError::NotFound {
            header: header.to_string(),
        };
        if segments.is_empty() {
            return Err(not_found());
        }

        // (arena, node) pairs; every sentinel is a starting point
        let mut candidates: Vec<(usize, NodeId)> = (0..self.arenas().len())
            .map(|arena| (arena, NodeId::SENTINEL))
            .collect();

        for segment in segments.iter().rev() {
            let next: Vec<(usize, NodeId)> = candidates
                .iter()
                .flat_map(|&(arena, id)| {
                    self.arenas()[arena]
                        .node(id)
                        .ancestors(segment)
                        .iter()
                        .map(move |&up| (arena, up))
                })
                .collect();

            if next.is_empty() {
                return Err(not_found());
            }
            candidates = next;
        }

        let mut seen = HashSet::new();
        let dirs = candidates
            .into_iter()
            .map(|(arena, id)| self.arenas()[arena].node(id).containing_dir().to_path_buf())
            .filter(|dir| seen.insert(dir.clone()))
            .collect();

        Ok(dirs)
    }
}
