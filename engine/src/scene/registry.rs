//! Entity store: identifier allocation and the display-name registry

use hecs::Entity;
use std::collections::HashMap;
use tracing::debug;

/// Wrapper around hecs::World that owns entity identifiers and keeps a
/// bidirectional entity<->name index.
///
/// Entity handles are generation tagged by hecs, so a handle kept across a
/// destroy fails `is_valid` instead of aliasing a recycled slot. All
/// operations taking an entity degrade to no-ops or `None` on stale
/// handles.
pub struct Registry {
    inner: hecs::World,
    entity_names: HashMap<Entity, String>,
    name_to_entity: HashMap<String, Entity>,
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            inner: hecs::World::new(),
            entity_names: HashMap::new(),
            name_to_entity: HashMap::new(),
        }
    }

    /// Allocate a new entity and register a unique display name for it
    pub fn create(&mut self, name: &str) -> Entity {
        let unique = self.unique_name(name);
        let entity = self.inner.spawn(());
        self.entity_names.insert(entity, unique.clone());
        self.name_to_entity.insert(unique, entity);
        debug!(entity = ?entity, name = %self.entity_names[&entity], "Created entity");
        entity
    }

    /// Destroy an entity, removing its name mappings
    ///
    /// Relationship links are the caller's responsibility; the scene severs
    /// them before calling this.
    pub fn destroy(&mut self, entity: Entity) {
        if !self.is_valid(entity) {
            return;
        }

        if let Some(name) = self.entity_names.remove(&entity) {
            self.name_to_entity.remove(&name);
        }

        let _ = self.inner.despawn(entity);
    }

    /// Check if an entity handle refers to a live entity
    pub fn is_valid(&self, entity: Entity) -> bool {
        self.inner.contains(entity)
    }

    /// Rename an entity under the same uniqueness policy as creation
    ///
    /// The entity's own current name is excluded from the collision check,
    /// so renaming an entity to its existing name is a no-op.
    pub fn rename(&mut self, entity: Entity, desired: &str) {
        if !self.is_valid(entity) {
            return;
        }

        if self.entity_names.get(&entity).map(String::as_str) == Some(desired) {
            return;
        }

        if let Some(old) = self.entity_names.remove(&entity) {
            self.name_to_entity.remove(&old);
        }

        let unique = self.unique_name(desired);
        self.entity_names.insert(entity, unique.clone());
        self.name_to_entity.insert(unique, entity);
    }

    /// Look up an entity by display name
    pub fn find_by_name(&self, name: &str) -> Option<Entity> {
        self.name_to_entity.get(name).copied()
    }

    /// Get the display name of an entity
    pub fn name(&self, entity: Entity) -> Option<&str> {
        self.entity_names.get(&entity).map(String::as_str)
    }

    /// Produce a name not currently registered, appending a numeric
    /// suffix when the desired name collides.
    ///
    /// A desired name that already carries a `" (N)"` suffix resumes the
    /// search from N+1 on the stripped base, so duplicating "Box (2)"
    /// yields "Box (3)".
    fn unique_name(&self, desired: &str) -> String {
        if !self.name_to_entity.contains_key(desired) {
            return desired.to_string();
        }

        let (base, suffix) = split_numeric_suffix(desired);
        let start = suffix.map_or(1, |n| n + 1);

        let mut counter = start;
        loop {
            let candidate = format!("{base} ({counter})");
            if !self.name_to_entity.contains_key(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    // --- component passthroughs -------------------------------------------

    /// Spawn an entity with the given components, bypassing the name registry
    pub fn spawn(&mut self, components: impl hecs::DynamicBundle) -> Entity {
        self.inner.spawn(components)
    }

    /// Get a reference to a component on an entity
    pub fn get<T: hecs::Component>(
        &self,
        entity: Entity,
    ) -> Result<hecs::Ref<T>, hecs::ComponentError> {
        self.inner.get::<&T>(entity)
    }

    /// Query a single entity for mutable component access
    pub fn query_one_mut<Q: hecs::Query>(
        &mut self,
        entity: Entity,
    ) -> Result<Q::Item<'_>, hecs::QueryOneError> {
        self.inner.query_one_mut::<Q>(entity)
    }

    /// Insert a component into an entity
    pub fn insert_one(
        &mut self,
        entity: Entity,
        component: impl hecs::Component,
    ) -> Result<(), hecs::NoSuchEntity> {
        self.inner.insert_one(entity, component)
    }

    /// Remove a component from an entity, returning it
    pub fn remove_one<T: hecs::Component>(
        &mut self,
        entity: Entity,
    ) -> Result<T, hecs::ComponentError> {
        self.inner.remove_one::<T>(entity)
    }

    /// Query entities with specific components
    pub fn query<Q: hecs::Query>(&self) -> hecs::QueryBorrow<Q> {
        self.inner.query()
    }

    /// Query entities with specific components (mutable)
    pub fn query_mut<Q: hecs::Query>(&mut self) -> hecs::QueryMut<Q> {
        self.inner.query_mut()
    }

    /// Get access to the inner hecs::World for advanced operations
    pub fn inner(&self) -> &hecs::World {
        &self.inner
    }

    /// Get mutable access to the inner hecs::World for advanced operations
    pub fn inner_mut(&mut self) -> &mut hecs::World {
        &mut self.inner
    }
}

/// Split a trailing `" (N)"` suffix off a display name
///
/// Returns the base name and the parsed N, or the whole name and `None`
/// when no well-formed suffix is present.
fn split_numeric_suffix(name: &str) -> (&str, Option<u32>) {
    let Some(stripped) = name.strip_suffix(')') else {
        return (name, None);
    };
    let Some(open) = stripped.rfind(" (") else {
        return (name, None);
    };

    let digits = &stripped[open + 2..];
    if digits.is_empty() {
        return (name, None);
    }

    match digits.parse::<u32>() {
        Ok(n) => (&name[..open], Some(n)),
        Err(_) => (name, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_registers_name() {
        let mut registry = Registry::new();
        let entity = registry.create("Box");

        assert!(registry.is_valid(entity));
        assert_eq!(registry.name(entity), Some("Box"));
        assert_eq!(registry.find_by_name("Box"), Some(entity));
    }

    #[test]
    fn test_colliding_names_get_numeric_suffix() {
        let mut registry = Registry::new();
        let first = registry.create("Box");
        let second = registry.create("Box");
        let third = registry.create("Box");

        assert_eq!(registry.name(first), Some("Box"));
        assert_eq!(registry.name(second), Some("Box (1)"));
        assert_eq!(registry.name(third), Some("Box (2)"));
    }

    #[test]
    fn test_collision_search_resumes_from_existing_suffix() {
        let mut registry = Registry::new();
        registry.create("Box");
        registry.create("Box"); // Box (1)
        registry.create("Box"); // Box (2)

        // Duplicating "Box (2)" continues counting from 2, not from 1
        let dup = registry.create("Box (2)");
        assert_eq!(registry.name(dup), Some("Box (3)"));
    }

    #[test]
    fn test_no_two_live_entities_share_a_name() {
        let mut registry = Registry::new();
        let mut names = std::collections::HashSet::new();
        for _ in 0..16 {
            let entity = registry.create("Thing");
            assert!(names.insert(registry.name(entity).unwrap().to_string()));
        }
    }

    #[test]
    fn test_destroy_releases_name() {
        let mut registry = Registry::new();
        let entity = registry.create("Box");
        registry.destroy(entity);

        assert!(!registry.is_valid(entity));
        assert_eq!(registry.find_by_name("Box"), None);

        // The name is free for reuse without a suffix
        let again = registry.create("Box");
        assert_eq!(registry.name(again), Some("Box"));
    }

    #[test]
    fn test_rename_to_self_is_noop() {
        let mut registry = Registry::new();
        let entity = registry.create("Box");
        registry.rename(entity, "Box");
        assert_eq!(registry.name(entity), Some("Box"));
        assert_eq!(registry.find_by_name("Box"), Some(entity));
    }

    #[test]
    fn test_rename_collision_gets_suffix() {
        let mut registry = Registry::new();
        registry.create("Crate");
        let entity = registry.create("Box");
        registry.rename(entity, "Crate");
        assert_eq!(registry.name(entity), Some("Crate (1)"));
        // Old name released
        assert_eq!(registry.find_by_name("Box"), None);
    }

    #[test]
    fn test_operations_on_destroyed_entity_are_noops() {
        let mut registry = Registry::new();
        let entity = registry.create("Box");
        registry.destroy(entity);

        // None of these should panic or change state
        registry.destroy(entity);
        registry.rename(entity, "Other");
        assert_eq!(registry.name(entity), None);
        assert_eq!(registry.find_by_name("Other"), None);
    }

    #[test]
    fn test_stale_handle_after_reuse_is_invalid() {
        let mut registry = Registry::new();
        let stale = registry.create("Box");
        registry.destroy(stale);

        // Spawn more entities so the slot is likely recycled
        for _ in 0..4 {
            registry.create("Box");
        }

        assert!(!registry.is_valid(stale));
        assert_eq!(registry.name(stale), None);
    }

    #[test]
    fn test_split_numeric_suffix() {
        assert_eq!(split_numeric_suffix("Box"), ("Box", None));
        assert_eq!(split_numeric_suffix("Box (2)"), ("Box", Some(2)));
        assert_eq!(split_numeric_suffix("Box (x)"), ("Box (x)", None));
        assert_eq!(split_numeric_suffix("Box ()"), ("Box ()", None));
        assert_eq!(split_numeric_suffix("Box(2)"), ("Box(2)", None));
    }
}
