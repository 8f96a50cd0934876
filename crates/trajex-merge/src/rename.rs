//! Positional run-name substitution

use indexmap::IndexMap;
use trajex_core::RunNaming;
use trajex_leaf::NodePath;

/// Source run names mapped to their new target names
#[derive(Debug, Clone)]
pub(crate) struct RunRenames {
    naming: RunNaming,
    names: IndexMap<String, String>,
}

impl RunRenames {
    /// `naming` is the source's convention, used to spot run segments
    pub(crate) fn new(naming: RunNaming, names: IndexMap<String, String>) -> Self {
        Self { naming, names }
    }

    pub(crate) fn naming(&self) -> &RunNaming {
        &self.naming
    }

    /// New name of a source run
    pub(crate) fn run(&self, name: &str) -> Option<&str> {
        self.names.get(name).map(String::as_str)
    }

    /// New target names in source order
    pub(crate) fn new_names(&self) -> impl Iterator<Item = &str> {
        self.names.values().map(String::as_str)
    }

    pub(crate) fn into_names(self) -> IndexMap<String, String> {
        self.names
    }

    /// `path` with every run segment replaced by its new name
    ///
    /// `None` when a run segment belongs to a run that is not carried over.
    /// Paths without run segments come back unchanged.
    pub(crate) fn rename(&self, path: &NodePath) -> Option<NodePath> {
        let mut renamed = path.clone();
        for position in self.naming.run_positions(path) {
            let old = path.segments().get(position)?;
            let new = self.run(old)?;
            renamed = renamed.with_replaced(&[position], new);
        }
        Some(renamed)
    }

    /// Whether `path` lies in a carried-over run branch
    pub(crate) fn is_moved(&self, path: &NodePath) -> bool {
        let positions = self.naming.run_positions(path);
        !positions.is_empty()
            && positions
                .iter()
                .all(|&p| path.segments().get(p).is_some_and(|s| self.names.contains_key(s)))
    }
}
