//! Property tree of a mapping
//!
//! Source properties mirror the source dot path of a registration; each source
//! leaf owns a chain of destination properties mirroring the destination dot
//! path. The deepest destination node of a chain carries the transformation
//! chain, the ignore flag and the condition.
//!
//! Nodes live in two arenas and reference each other by index. A source node
//! has either children or a terminal destination, never both. Intermediate
//! source nodes are shared between registrations with a common source prefix;
//! leaves never are, so two destinations fed by the same source member get two
//! sibling leaves of the same name.
//!
//! Detached nodes stay in the arenas but are unreachable from the roots.

use std::fmt;

use crate::error::{MappingError, MappingResult};
use crate::options::ConditionFn;
use crate::path;
use crate::transformation::Transformation;

/// Index of a source property in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourcePropertyId(usize);

/// Index of a destination property in its tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DestinationPropertyId(usize);

/// One segment of a source path
#[derive(Debug, Clone)]
pub struct SourceProperty {
    name: String,
    full_source_path: String,
    full_destination_path: String,
    parent: Option<SourcePropertyId>,
    depth: usize,
    children: Vec<SourcePropertyId>,
    terminal: Option<DestinationPropertyId>,
}

impl SourceProperty {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_source_path(&self) -> &str {
        &self.full_source_path
    }

    pub fn full_destination_path(&self) -> &str {
        &self.full_destination_path
    }

    pub fn parent(&self) -> Option<SourcePropertyId> {
        self.parent
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn children(&self) -> &[SourcePropertyId] {
        &self.children
    }

    pub fn terminal(&self) -> Option<DestinationPropertyId> {
        self.terminal
    }
}

/// One segment of a destination path
#[derive(Clone)]
pub struct DestinationProperty {
    name: String,
    full_source_path: String,
    full_destination_path: String,
    parent: Option<DestinationPropertyId>,
    depth: usize,
    child: Option<DestinationPropertyId>,
    pub(crate) transformations: Vec<Transformation>,
    pub(crate) ignore: bool,
    pub(crate) source_mapping: bool,
    pub(crate) condition: Option<ConditionFn>,
}

impl DestinationProperty {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_source_path(&self) -> &str {
        &self.full_source_path
    }

    pub fn full_destination_path(&self) -> &str {
        &self.full_destination_path
    }

    pub fn parent(&self) -> Option<DestinationPropertyId> {
        self.parent
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn child(&self) -> Option<DestinationPropertyId> {
        self.child
    }

    pub fn transformations(&self) -> &[Transformation] {
        &self.transformations
    }

    pub fn is_ignored(&self) -> bool {
        self.ignore
    }

    /// Registered through `for_source_member` rather than `for_member`
    pub fn is_source_mapping(&self) -> bool {
        self.source_mapping
    }

    pub fn has_condition(&self) -> bool {
        self.condition.is_some()
    }

    /// Evaluate the condition against the whole source object
    pub fn condition_holds(&self, source: &serde_json::Value) -> bool {
        self.condition
            .as_ref()
            .is_none_or(|condition| condition(source))
    }
}

impl fmt::Debug for DestinationProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DestinationProperty")
            .field("name", &self.name)
            .field("full_source_path", &self.full_source_path)
            .field("full_destination_path", &self.full_destination_path)
            .field("depth", &self.depth)
            .field("child", &self.child)
            .field("transformations", &self.transformations)
            .field("ignore", &self.ignore)
            .field("source_mapping", &self.source_mapping)
            .field("condition", &self.condition.is_some())
            .finish()
    }
}

/// A registered source leaf together with the deepest node of its destination chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PropertyEntry {
    pub source: SourcePropertyId,
    pub destination: DestinationPropertyId,
}

/// Settings applied to the deepest destination node on insert
#[derive(Default)]
pub(crate) struct PropertySettings {
    pub(crate) transformations: Vec<Transformation>,
    pub(crate) ignore: bool,
    pub(crate) condition: Option<ConditionFn>,
    pub(crate) source_mapping: bool,
}

/// Arena-backed tree of source and destination properties
#[derive(Debug, Clone, Default)]
pub struct PropertyTree {
    sources: Vec<SourceProperty>,
    destinations: Vec<DestinationProperty>,
    roots: Vec<SourcePropertyId>,
}

impl PropertyTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    /// Root source properties in registration order
    pub fn roots(&self) -> &[SourcePropertyId] {
        &self.roots
    }

    pub fn source(&self, id: SourcePropertyId) -> &SourceProperty {
        &self.sources[id.0]
    }

    pub fn destination(&self, id: DestinationPropertyId) -> &DestinationProperty {
        &self.destinations[id.0]
    }

    pub(crate) fn destination_mut(&mut self, id: DestinationPropertyId) -> &mut DestinationProperty {
        &mut self.destinations[id.0]
    }

    /// All registered leaves, depth-first in registration order
    pub fn entries(&self) -> Vec<PropertyEntry> {
        let mut entries = Vec::new();
        for root in &self.roots {
            self.collect_entries(*root, &mut entries);
        }
        entries
    }

    fn collect_entries(&self, id: SourcePropertyId, entries: &mut Vec<PropertyEntry>) {
        let node = &self.sources[id.0];
        for child in &node.children {
            self.collect_entries(*child, entries);
        }
        if let Some(terminal) = node.terminal {
            entries.push(PropertyEntry {
                source: id,
                destination: self.deepest(terminal),
            });
        }
    }

    fn deepest(&self, mut id: DestinationPropertyId) -> DestinationPropertyId {
        while let Some(child) = self.destinations[id.0].child {
            id = child;
        }
        id
    }

    /// Entry whose destination chain ends at `destination_path`
    pub fn find_by_destination(&self, destination_path: &str) -> Option<PropertyEntry> {
        self.entries()
            .into_iter()
            .find(|entry| self.destination(entry.destination).full_destination_path == destination_path)
    }

    /// Whether a root source property carries `name`
    pub fn has_root(&self, name: &str) -> bool {
        self.roots.iter().any(|root| self.sources[root.0].name == name)
    }

    /// Whether any entry writes to `destination_path`
    pub fn has_destination(&self, destination_path: &str) -> bool {
        self.find_by_destination(destination_path).is_some()
    }

    /// Number of destinations registered below a source property
    pub fn destination_count(&self, id: SourcePropertyId) -> usize {
        let node = &self.sources[id.0];
        let own = usize::from(node.terminal.is_some());
        own + node
            .children
            .iter()
            .map(|child| self.destination_count(*child))
            .sum::<usize>()
    }

    /// Root source property above `id`
    pub fn root_of(&self, mut id: SourcePropertyId) -> SourcePropertyId {
        while let Some(parent) = self.sources[id.0].parent {
            id = parent;
        }
        id
    }

    /// Register a new source path feeding a new destination path
    pub(crate) fn insert(
        &mut self,
        source_path: &str,
        destination_path: &str,
        settings: PropertySettings,
    ) -> MappingResult<PropertyEntry> {
        validate_path(source_path)?;
        validate_path(destination_path)?;

        let chain = self.build_destination_chain(source_path, destination_path);
        let leaf = self.build_source_chain(source_path, destination_path)?;
        self.sources[leaf.0].terminal = Some(chain);

        let deepest = self.deepest(chain);
        let node = &mut self.destinations[deepest.0];
        node.transformations = settings.transformations;
        node.ignore = settings.ignore;
        node.condition = settings.condition;
        node.source_mapping = settings.source_mapping;

        Ok(PropertyEntry {
            source: leaf,
            destination: deepest,
        })
    }

    /// Move the destination chain of `entry` onto `new_source_path`, keeping
    /// its accumulated transformations
    pub(crate) fn rebase(
        &mut self,
        entry: PropertyEntry,
        new_source_path: &str,
    ) -> MappingResult<PropertyEntry> {
        validate_path(new_source_path)?;

        let root = self.root_of(entry.source);
        if self.destination_count(root) != 1 {
            return Err(MappingError::configuration(
                "Rebasing properties with multiple destinations is not yet implemented.",
            ));
        }

        let chain = self.sources[entry.source.0].terminal.take().ok_or_else(|| {
            MappingError::configuration("Cannot rebase a source property without destination.")
        })?;
        self.detach(entry.source);

        let destination_path = self.destinations[entry.destination.0]
            .full_destination_path
            .clone();
        let leaf = self.build_source_chain(new_source_path, &destination_path)?;
        self.sources[leaf.0].terminal = Some(chain);

        let mut cursor = Some(chain);
        while let Some(id) = cursor {
            let node = &mut self.destinations[id.0];
            node.full_source_path = new_source_path.to_string();
            cursor = node.child;
        }

        Ok(PropertyEntry {
            source: leaf,
            destination: entry.destination,
        })
    }

    /// Unregister the entry writing to `destination_path`, if any
    pub(crate) fn remove_destination(&mut self, destination_path: &str) -> bool {
        match self.find_by_destination(destination_path) {
            Some(entry) => {
                self.sources[entry.source.0].terminal = None;
                self.detach(entry.source);
                true
            }
            None => false,
        }
    }

    /// Copy an entry of another tree into this one
    pub(crate) fn adopt(
        &mut self,
        other: &PropertyTree,
        entry: PropertyEntry,
    ) -> MappingResult<PropertyEntry> {
        let destination = other.destination(entry.destination);
        self.insert(
            &destination.full_source_path,
            &destination.full_destination_path,
            PropertySettings {
                transformations: destination.transformations.clone(),
                ignore: destination.ignore,
                condition: destination.condition.clone(),
                source_mapping: destination.source_mapping,
            },
        )
    }

    /// Unlink a source node and prune ancestors left without children
    fn detach(&mut self, id: SourcePropertyId) {
        let mut current = id;
        loop {
            let parent = self.sources[current.0].parent;
            match parent {
                Some(parent_id) => {
                    let parent_node = &mut self.sources[parent_id.0];
                    parent_node.children.retain(|child| *child != current);
                    if !parent_node.children.is_empty() || parent_node.terminal.is_some() {
                        break;
                    }
                    current = parent_id;
                }
                None => {
                    self.roots.retain(|root| *root != current);
                    break;
                }
            }
        }
    }

    fn build_source_chain(
        &mut self,
        source_path: &str,
        destination_path: &str,
    ) -> MappingResult<SourcePropertyId> {
        let segments = path::segments(source_path);
        let mut parent: Option<SourcePropertyId> = None;

        for (depth, segment) in segments.iter().enumerate() {
            let is_leaf = depth + 1 == segments.len();
            let shared = if is_leaf {
                None
            } else {
                self.find_branch(parent, segment)
            };

            let id = match shared {
                Some(id) => id,
                None => {
                    let id = SourcePropertyId(self.sources.len());
                    self.sources.push(SourceProperty {
                        name: segment.to_string(),
                        full_source_path: segments[..=depth].join("."),
                        full_destination_path: destination_path.to_string(),
                        parent,
                        depth,
                        children: Vec::new(),
                        terminal: None,
                    });
                    match parent {
                        Some(parent_id) => self.sources[parent_id.0].children.push(id),
                        None => self.roots.push(id),
                    }
                    id
                }
            };
            parent = Some(id);
        }

        parent.ok_or_else(|| invalid_path(source_path))
    }

    fn find_branch(&self, parent: Option<SourcePropertyId>, name: &str) -> Option<SourcePropertyId> {
        let candidates = match parent {
            Some(parent_id) => &self.sources[parent_id.0].children,
            None => &self.roots,
        };
        candidates.iter().copied().find(|id| {
            let node = &self.sources[id.0];
            node.name == name && node.terminal.is_none() && !node.children.is_empty()
        })
    }

    fn build_destination_chain(
        &mut self,
        source_path: &str,
        destination_path: &str,
    ) -> DestinationPropertyId {
        let segments = path::segments(destination_path);
        let first = DestinationPropertyId(self.destinations.len());
        let mut parent: Option<DestinationPropertyId> = None;

        for (depth, segment) in segments.iter().enumerate() {
            let id = DestinationPropertyId(self.destinations.len());
            self.destinations.push(DestinationProperty {
                name: segment.to_string(),
                full_source_path: source_path.to_string(),
                full_destination_path: segments[..=depth].join("."),
                parent,
                depth,
                child: None,
                transformations: Vec::new(),
                ignore: false,
                source_mapping: false,
                condition: None,
            });
            if let Some(parent_id) = parent {
                self.destinations[parent_id.0].child = Some(id);
            }
            parent = Some(id);
        }

        first
    }
}

fn validate_path(path: &str) -> MappingResult<()> {
    if path.is_empty() || path.split('.').any(str::is_empty) {
        return Err(invalid_path(path));
    }
    Ok(())
}

fn invalid_path(path: &str) -> MappingError {
    MappingError::configuration(format!("Member path '{}' is invalid.", path))
}
