use crate::builder::Builder;
use crate::error::Error;
use crate::layout::{DecomposedId, Layout, Plane};
use crate::snowflake::{Settings, Snowflake};
use dashmap::DashMap;

/// Group used when the caller does not name one.
pub const DEFAULT_GROUP: &str = "default";

/// Named, independent id streams.
///
/// Each group (typically a table or entity name) gets its own [`Snowflake`],
/// created on first use and kept for the lifetime of the registry. Ids are
/// monotonic within a group only; groups never contend on each other's lock.
pub struct Registry {
    settings: Settings,
    builders: DashMap<String, Snowflake>,
}

impl Registry {
    /// Create a registry with the default configuration.
    /// For custom configuration see [`Builder::build_registry`].
    pub fn new() -> Result<Self, Error> {
        Builder::new().build_registry()
    }

    pub(crate) fn from_settings(settings: Settings) -> Self {
        Self {
            settings,
            builders: DashMap::new(),
        }
    }

    /// The generator for `group`, created on first access.
    ///
    /// Every call with the same name returns a handle to the same stream.
    pub fn builder_for(&self, group: &str) -> Snowflake {
        if let Some(existing) = self.builders.get(group) {
            return existing.value().clone();
        }
        self.builders
            .entry(group.to_owned())
            .or_insert_with(|| {
                tracing::debug!(group, "creating generator for new group");
                Snowflake::from_settings(self.settings.clone())
            })
            .value()
            .clone()
    }

    /// The generator for [`DEFAULT_GROUP`].
    pub fn default_builder(&self) -> Snowflake {
        self.builder_for(DEFAULT_GROUP)
    }

    /// Generate the next id of `group` in `plane`.
    pub fn next_id(&self, group: &str, plane: Plane) -> Result<u64, Error> {
        self.builder_for(group).next_id(plane)
    }

    pub fn len(&self) -> usize {
        self.builders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.builders.is_empty()
    }

    /// Names of the groups created so far, in no particular order.
    pub fn groups(&self) -> Vec<String> {
        self.builders.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn layout(&self) -> Layout {
        self.settings.layout
    }

    pub fn decompose(&self, id: u64) -> DecomposedId {
        self.settings.layout.decompose(id)
    }

    pub fn verify(&self, id: u64) -> bool {
        self.settings.layout.verify(id, self.settings.live_since)
    }
}
