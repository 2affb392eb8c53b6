//! Scene lifecycle: entity creation, duplication, destruction,
//! reparenting and per-frame update

use super::components::{Active, ModelComponent, Relationship, Transform};
use super::hierarchy::{self, ReparentPolicy};
use super::registry::Registry;
use crate::animation::AnimatorComponent;
use crate::graphics::AssetManager;
use glam::{Mat4, Quat, Vec3};
use hecs::Entity;
use std::path::Path;
use tracing::{debug, error, info};

/// A scene: one entity registry, a designated root entity, and the
/// editor-facing selection state.
///
/// All structural mutation of the entity graph goes through this type so
/// the relationship and name invariants hold at every step.
pub struct Scene {
    name: String,
    registry: Registry,
    root: Entity,
    selected: Option<Entity>,
    reparent_policy: ReparentPolicy,
}

impl Scene {
    /// Create a new scene containing only the root entity
    pub fn new(name: impl Into<String>) -> Self {
        let mut registry = Registry::new();
        let root = registry.create("Scene Root");
        let _ = registry.insert_one(root, Relationship::default());

        Self {
            name: name.into(),
            registry,
            root,
            selected: None,
            reparent_policy: ReparentPolicy::default(),
        }
    }

    /// Scene display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename the scene
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The designated root entity all parentless entities hang off
    pub fn root_entity(&self) -> Entity {
        self.root
    }

    /// Access the underlying registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Mutable access to the underlying registry
    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// The reparent policy applied by [`Scene::update_relationship`]
    pub fn reparent_policy(&self) -> ReparentPolicy {
        self.reparent_policy
    }

    /// Change how reparenting treats local transforms
    pub fn set_reparent_policy(&mut self, policy: ReparentPolicy) {
        self.reparent_policy = policy;
    }

    // --- lifecycle --------------------------------------------------------

    /// Create an entity under the scene root
    pub fn create_entity(&mut self, name: &str) -> Entity {
        self.create_entity_with_parent(name, self.root)
    }

    /// Create an entity under an explicit parent
    ///
    /// The entity gets the default component set (Transform, Active,
    /// Relationship) and a unique display name.
    pub fn create_entity_with_parent(&mut self, name: &str, parent: Entity) -> Entity {
        let entity = self.registry.create(name);

        let transform = Transform::new(entity);
        let _ = self.registry.insert_one(entity, transform);
        let _ = self.registry.insert_one(entity, Active::default());
        let _ = self.registry.insert_one(entity, Relationship::default());

        let parent = if self.registry.is_valid(parent) && parent != entity {
            parent
        } else {
            self.root
        };
        // Initial attach keeps the default local transform so the entity
        // appears at its parent, regardless of the reparent policy.
        hierarchy::set_parent(
            self.registry.inner_mut(),
            entity,
            Some(parent),
            ReparentPolicy::KeepLocal,
        );

        entity
    }

    /// Deep-copy an entity and its whole subtree
    ///
    /// Component values are copied; the model asset itself is shared, not
    /// duplicated. The copy is attached under the source's parent and
    /// every copied entity receives a fresh disambiguated name.
    pub fn duplicate_entity(&mut self, entity: Entity) -> Option<Entity> {
        if !self.registry.is_valid(entity) {
            return None;
        }

        let parent = hierarchy::parent_of(self.registry.inner(), entity).unwrap_or(self.root);
        self.duplicate_hierarchy(entity, parent)
    }

    fn duplicate_hierarchy(&mut self, entity: Entity, parent: Entity) -> Option<Entity> {
        if !self.registry.is_valid(entity) {
            return None;
        }

        let name = self.registry.name(entity)?.to_string();
        let duplicate = self.create_entity_with_parent(&name, parent);

        // Copy transform values
        let source_transform = self
            .registry
            .get::<Transform>(entity)
            .map(|t| (t.local_position, t.local_rotation, t.local_scale))
            .ok();
        if let Some((position, rotation, scale)) = source_transform {
            if let Ok(transform) = self.registry.query_one_mut::<&mut Transform>(duplicate) {
                transform.local_position = position;
                transform.local_rotation = rotation;
                transform.local_scale = scale;
                transform.local_dirty = true;
                transform.world_dirty = true;
            }
        }

        // Copy active flag
        if let Ok(active) = self.registry.get::<Active>(entity).map(|a| *a) {
            let _ = self.registry.insert_one(duplicate, active);
        }

        // Copy model component values, sharing the asset
        if let Ok(model) = self
            .registry
            .get::<ModelComponent>(entity)
            .map(|m| ModelComponent::clone(&m))
        {
            let _ = self.registry.insert_one(duplicate, model);
        }

        // Copy animator playback state and the shared clip set
        if let Ok(animator) = self
            .registry
            .get::<AnimatorComponent>(entity)
            .map(|a| a.duplicate())
        {
            let _ = self.registry.insert_one(duplicate, animator);
        }

        // Recursively duplicate the children subtree, preserving order
        for child in hierarchy::children_of(self.registry.inner(), entity) {
            self.duplicate_hierarchy(child, duplicate);
        }

        debug!(source = ?entity, duplicate = ?duplicate, "Duplicated entity subtree");
        Some(duplicate)
    }

    /// Destroy an entity and every descendant
    ///
    /// The subtree is removed from the parent's children list, the
    /// selection is cleared if it pointed into the subtree, and all
    /// identifiers become invalid.
    pub fn destroy_entity(&mut self, entity: Entity) {
        if !self.registry.is_valid(entity) || entity == self.root {
            return;
        }

        // Collect the whole subtree iteratively, parents before children
        let mut order = Vec::new();
        let mut stack = vec![entity];
        while let Some(e) = stack.pop() {
            order.push(e);
            stack.extend(hierarchy::children_of(self.registry.inner(), e));
        }

        if let Some(selected) = self.selected {
            if order.contains(&selected) {
                self.selected = None;
            }
        }

        // Sever the subtree from its parent
        if let Some(parent) = hierarchy::parent_of(self.registry.inner(), entity) {
            if let Ok(rel) = self.registry.query_one_mut::<&mut Relationship>(parent) {
                rel.children.retain(|&c| c != entity);
            }
        }

        // Children first, then ancestors
        for e in order.into_iter().rev() {
            self.registry.destroy(e);
        }
    }

    /// Create an entity carrying a freshly imported model
    ///
    /// The entity is named after the file stem. An import failure is
    /// logged and leaves the entity with an empty model slot; the frame
    /// loop keeps running either way.
    pub fn load_model(
        &mut self,
        assets: &mut AssetManager,
        path: impl AsRef<Path>,
        position: Vec3,
        scale: Vec3,
    ) -> Entity {
        let path = path.as_ref();
        let name = entity_name_for_model(path);

        let entity = self.create_entity(&name);
        self.set_local_position(entity, position);
        self.set_local_scale(entity, scale);

        let model = match assets.load_model(path) {
            Ok(model) => Some(model),
            Err(err) => {
                error!(path = ?path, error = %err, "Model import failed");
                None
            }
        };

        let component = ModelComponent {
            model,
            model_path: Some(path.to_path_buf()),
            ..Default::default()
        };
        let _ = self.registry.insert_one(entity, component);

        info!(entity = ?entity, name = %name, path = ?path, "Loaded model entity");
        entity
    }

    // --- queries ----------------------------------------------------------

    /// Look up an entity by display name
    pub fn find_entity_by_name(&self, name: &str) -> Option<Entity> {
        self.registry.find_by_name(name)
    }

    /// Rename an entity (same uniqueness policy as creation)
    pub fn rename_entity(&mut self, entity: Entity, name: &str) {
        self.registry.rename(entity, name);
    }

    /// Direct children of the scene root, newest first
    ///
    /// The reversal puts freshly created entities at the top of an
    /// editor's hierarchy panel.
    pub fn root_entities(&self) -> Vec<Entity> {
        let mut roots = hierarchy::children_of(self.registry.inner(), self.root);
        roots.reverse();
        roots
    }

    /// Currently selected entity, if any
    pub fn selected_entity(&self) -> Option<Entity> {
        self.selected
    }

    /// Change the selection; stale handles clear it
    pub fn set_selected_entity(&mut self, entity: Option<Entity>) {
        self.selected = entity.filter(|&e| self.registry.is_valid(e));
    }

    /// Reparent `child` under `parent`, rejecting moves that would create
    /// a cycle
    ///
    /// Returns whether the relationship changed.
    pub fn update_relationship(&mut self, child: Entity, parent: Entity) -> bool {
        if !self.registry.is_valid(child) {
            return false;
        }
        if hierarchy::parent_of(self.registry.inner(), child) == Some(parent) {
            return false;
        }
        hierarchy::set_parent(
            self.registry.inner_mut(),
            child,
            Some(parent),
            self.reparent_policy,
        )
    }

    // --- transforms -------------------------------------------------------

    /// Local matrix of an entity (lazy rebuild)
    pub fn local_matrix(&mut self, entity: Entity) -> Mat4 {
        hierarchy::local_matrix(self.registry.inner_mut(), entity)
    }

    /// World matrix of an entity (lazy rebuild up the ancestor chain)
    pub fn world_matrix(&mut self, entity: Entity) -> Mat4 {
        hierarchy::world_matrix(self.registry.inner_mut(), entity)
    }

    /// World-space position of an entity
    pub fn world_position(&mut self, entity: Entity) -> Vec3 {
        hierarchy::world_position(self.registry.inner_mut(), entity)
    }

    /// World-space scale of an entity
    pub fn world_scale(&self, entity: Entity) -> Vec3 {
        hierarchy::world_scale(self.registry.inner(), entity)
    }

    /// World-space rotation of an entity
    pub fn world_rotation(&self, entity: Entity) -> Quat {
        hierarchy::world_rotation(self.registry.inner(), entity)
    }

    /// Set the local position, invalidating dependent world caches
    pub fn set_local_position(&mut self, entity: Entity, position: Vec3) {
        hierarchy::set_local_position(self.registry.inner_mut(), entity, position);
    }

    /// Set the local rotation, invalidating dependent world caches
    pub fn set_local_rotation(&mut self, entity: Entity, rotation: Quat) {
        hierarchy::set_local_rotation(self.registry.inner_mut(), entity, rotation);
    }

    /// Set the local scale, invalidating dependent world caches
    pub fn set_local_scale(&mut self, entity: Entity, scale: Vec3) {
        hierarchy::set_local_scale(self.registry.inner_mut(), entity, scale);
    }

    // --- per-frame update -------------------------------------------------

    /// Advance animation playback on every active entity
    pub fn update(&mut self, delta_time: f32) {
        for (_, (animator, active)) in self
            .registry
            .query_mut::<(&mut AnimatorComponent, &Active)>()
        {
            if active.0 {
                animator.update(delta_time);
            }
        }
    }
}

/// Derive an entity display name from a model path: file name with the
/// extension stripped.
fn entity_name_for_model(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("Model")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Animation, AnimatorComponent};
    use std::sync::Arc;

    #[test]
    fn test_new_scene_has_root() {
        let scene = Scene::new("Test Scene");
        assert_eq!(scene.name(), "Test Scene");
        assert!(scene.registry().is_valid(scene.root_entity()));
        assert!(scene.root_entities().is_empty());
    }

    #[test]
    fn test_create_entity_default_components() {
        let mut scene = Scene::new("Test");
        let entity = scene.create_entity("Box");

        assert!(scene.registry().get::<Transform>(entity).is_ok());
        assert!(scene.registry().get::<Active>(entity).is_ok());
        assert!(scene.registry().get::<Relationship>(entity).is_ok());
        assert_eq!(
            hierarchy::parent_of(scene.registry().inner(), entity),
            Some(scene.root_entity())
        );
        assert_eq!(
            scene.registry().get::<Transform>(entity).unwrap().owner,
            entity
        );
    }

    #[test]
    fn test_create_twice_disambiguates() {
        let mut scene = Scene::new("Test");
        let a = scene.create_entity("Box");
        let b = scene.create_entity("Box");

        assert_eq!(scene.registry().name(a), Some("Box"));
        assert_eq!(scene.registry().name(b), Some("Box (1)"));
    }

    #[test]
    fn test_create_under_moved_parent_spawns_at_parent() {
        let mut scene = Scene::new("Test");
        let parent = scene.create_entity("Parent");
        scene.set_local_position(parent, Vec3::new(4.0, 0.0, 0.0));

        // The child gets a default local transform, so its world pose is
        // the parent's
        let child = scene.create_entity_with_parent("Child", parent);
        assert_eq!(
            scene.registry().get::<Transform>(child).unwrap().local_position,
            Vec3::ZERO
        );
        assert!(scene
            .world_position(child)
            .abs_diff_eq(Vec3::new(4.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_root_entities_newest_first() {
        let mut scene = Scene::new("Test");
        let a = scene.create_entity("A");
        let b = scene.create_entity("B");
        let c = scene.create_entity("C");

        assert_eq!(scene.root_entities(), vec![c, b, a]);
    }

    #[test]
    fn test_destroy_cascades_to_descendants() {
        let mut scene = Scene::new("Test");
        let parent = scene.create_entity("Parent");
        let child_a = scene.create_entity_with_parent("A", parent);
        let child_b = scene.create_entity_with_parent("B", parent);
        let grandchild = scene.create_entity_with_parent("C", child_a);

        scene.destroy_entity(parent);

        for e in [parent, child_a, child_b, grandchild] {
            assert!(!scene.registry().is_valid(e));
        }
        assert!(scene.root_entities().is_empty());
        assert_eq!(scene.find_entity_by_name("Parent"), None);
        assert_eq!(scene.find_entity_by_name("C"), None);
    }

    #[test]
    fn test_destroy_clears_selection_in_subtree() {
        let mut scene = Scene::new("Test");
        let parent = scene.create_entity("Parent");
        let child = scene.create_entity_with_parent("Child", parent);

        scene.set_selected_entity(Some(child));
        scene.destroy_entity(parent);

        assert_eq!(scene.selected_entity(), None);
    }

    #[test]
    fn test_destroy_keeps_unrelated_selection() {
        let mut scene = Scene::new("Test");
        let doomed = scene.create_entity("Doomed");
        let keeper = scene.create_entity("Keeper");

        scene.set_selected_entity(Some(keeper));
        scene.destroy_entity(doomed);

        assert_eq!(scene.selected_entity(), Some(keeper));
    }

    #[test]
    fn test_destroy_root_is_noop() {
        let mut scene = Scene::new("Test");
        let root = scene.root_entity();
        scene.destroy_entity(root);
        assert!(scene.registry().is_valid(root));
    }

    #[test]
    fn test_selection_rejects_stale_handle() {
        let mut scene = Scene::new("Test");
        let entity = scene.create_entity("Box");
        scene.destroy_entity(entity);
        scene.set_selected_entity(Some(entity));
        assert_eq!(scene.selected_entity(), None);
    }

    #[test]
    fn test_duplicate_copies_subtree_structure() {
        let mut scene = Scene::new("Test");
        let parent = scene.create_entity("Rig");
        scene.set_local_position(parent, Vec3::new(1.0, 2.0, 3.0));
        let child = scene.create_entity_with_parent("Arm", parent);
        scene.set_local_position(child, Vec3::new(0.0, 1.0, 0.0));
        let _grandchild = scene.create_entity_with_parent("Hand", child);

        let copy = scene.duplicate_entity(parent).unwrap();

        assert_eq!(scene.registry().name(copy), Some("Rig (1)"));
        assert_eq!(
            hierarchy::parent_of(scene.registry().inner(), copy),
            Some(scene.root_entity())
        );

        let copy_children = hierarchy::children_of(scene.registry().inner(), copy);
        assert_eq!(copy_children.len(), 1);
        assert_eq!(scene.registry().name(copy_children[0]), Some("Arm (1)"));

        let copy_grandchildren =
            hierarchy::children_of(scene.registry().inner(), copy_children[0]);
        assert_eq!(copy_grandchildren.len(), 1);
        assert_eq!(
            scene.registry().name(copy_grandchildren[0]),
            Some("Hand (1)")
        );

        // Transform values copied
        let t = scene.registry().get::<Transform>(copy).unwrap();
        assert!(t.local_position.abs_diff_eq(Vec3::new(1.0, 2.0, 3.0), 1e-6));
    }

    #[test]
    fn test_duplicate_shares_model_asset() {
        let mut scene = Scene::new("Test");
        let entity = scene.create_entity("Crate");
        let model = Arc::new(crate::graphics::Model::from_mesh(
            crate::graphics::MeshData::cube(1.0),
            crate::graphics::Material::default(),
        ));
        let _ = scene
            .registry_mut()
            .insert_one(entity, ModelComponent::new(model.clone()));

        let copy = scene.duplicate_entity(entity).unwrap();
        let copied = scene.registry().get::<ModelComponent>(copy).unwrap();

        // Same asset, not a clone of it
        assert!(Arc::ptr_eq(copied.model.as_ref().unwrap(), &model));
    }

    #[test]
    fn test_duplicate_copies_animator_settings() {
        let mut scene = Scene::new("Test");
        let entity = scene.create_entity("Dancer");

        let clip = Arc::new(Animation::empty("Default", 24.0, 24.0));
        let mut animator = AnimatorComponent::new();
        animator.add_clip("Default", clip);
        animator.set_playback_speed(2.0);
        animator.set_looping(false);
        let _ = scene.registry_mut().insert_one(entity, animator);

        let copy = scene.duplicate_entity(entity).unwrap();
        let copied = scene.registry().get::<AnimatorComponent>(copy).unwrap();
        assert_eq!(copied.playback_speed(), 2.0);
        assert!(!copied.is_looping());
        assert!(copied.has_animation("Default"));
    }

    #[test]
    fn test_update_relationship_rejects_cycle() {
        let mut scene = Scene::new("Test");
        let parent = scene.create_entity("Parent");
        let child = scene.create_entity_with_parent("Child", parent);

        assert!(!scene.update_relationship(parent, child));
        assert_eq!(
            hierarchy::parent_of(scene.registry().inner(), child),
            Some(parent)
        );
        assert_eq!(
            hierarchy::parent_of(scene.registry().inner(), parent),
            Some(scene.root_entity())
        );
    }

    #[test]
    fn test_update_relationship_moves_entity() {
        let mut scene = Scene::new("Test");
        let a = scene.create_entity("A");
        let b = scene.create_entity("B");
        let child = scene.create_entity_with_parent("Child", a);

        assert!(scene.update_relationship(child, b));
        assert_eq!(
            hierarchy::parent_of(scene.registry().inner(), child),
            Some(b)
        );
        assert!(hierarchy::children_of(scene.registry().inner(), a).is_empty());
    }

    #[test]
    fn test_world_matrix_through_scene_api() {
        let mut scene = Scene::new("Test");
        let parent = scene.create_entity("Parent");
        let child = scene.create_entity_with_parent("Child", parent);

        scene.set_local_position(parent, Vec3::new(3.0, 0.0, 0.0));
        scene.set_local_position(child, Vec3::new(0.0, 2.0, 0.0));

        assert!(scene
            .world_position(child)
            .abs_diff_eq(Vec3::new(3.0, 2.0, 0.0), 1e-6));
    }

    #[test]
    fn test_update_advances_playing_animators() {
        let mut scene = Scene::new("Test");
        let entity = scene.create_entity("Dancer");

        let clip = Arc::new(Animation::empty("Default", 100.0, 10.0));
        let mut animator = AnimatorComponent::new();
        animator.add_clip("Default", clip);
        animator.play_animation("Default");
        let _ = scene.registry_mut().insert_one(entity, animator);

        scene.update(0.5);

        let animator = scene.registry().get::<AnimatorComponent>(entity).unwrap();
        assert!((animator.current_time() - 5.0).abs() < 1e-5);
    }

    #[test]
    fn test_update_skips_inactive_entities() {
        let mut scene = Scene::new("Test");
        let entity = scene.create_entity("Dancer");

        let clip = Arc::new(Animation::empty("Default", 100.0, 10.0));
        let mut animator = AnimatorComponent::new();
        animator.add_clip("Default", clip);
        animator.play_animation("Default");
        let _ = scene.registry_mut().insert_one(entity, animator);
        let _ = scene.registry_mut().insert_one(entity, Active(false));

        scene.update(0.5);

        let animator = scene.registry().get::<AnimatorComponent>(entity).unwrap();
        assert_eq!(animator.current_time(), 0.0);
    }

    #[test]
    fn test_entity_name_for_model() {
        assert_eq!(
            entity_name_for_model(Path::new("assets/models/vampire.glb")),
            "vampire"
        );
        assert_eq!(entity_name_for_model(Path::new("cube.obj")), "cube");
        assert_eq!(entity_name_for_model(Path::new("noext")), "noext");
    }
}
