//! Hierarchical transform graph: lazy world matrices, dirty propagation,
//! and reparenting with cycle prevention
//!
//! World matrices are resolved on read: the ancestor chain is collected
//! with an explicit stack (never recursion) and only the dirty suffix is
//! rebuilt, so each ancestor is recomputed at most once per dirty epoch no
//! matter how many descendants query it in a frame.

use super::components::{Relationship, Transform};
use glam::{Mat4, Quat, Vec3};
use hecs::{Entity, World};
use tracing::error;

/// Maximum parent-chain depth a traversal will follow
///
/// A chain deeper than this is treated as a hierarchy-integrity error
/// (most likely a corrupted relationship graph) and the walk stops.
pub const MAX_HIERARCHY_DEPTH: usize = 256;

/// How `set_parent` treats the child's local transform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReparentPolicy {
    /// Recompute the local transform so the world pose is unchanged
    #[default]
    PreserveWorld,
    /// Leave the local transform untouched (the entity jumps into the
    /// new parent's space)
    KeepLocal,
}

/// Get the parent of an entity, if it has one
pub fn parent_of(world: &World, entity: Entity) -> Option<Entity> {
    world
        .get::<&Relationship>(entity)
        .ok()
        .and_then(|rel| rel.parent)
}

/// Get the children of an entity in insertion order
pub fn children_of(world: &World, entity: Entity) -> Vec<Entity> {
    world
        .get::<&Relationship>(entity)
        .map(|rel| rel.children.clone())
        .unwrap_or_default()
}

/// Get the local matrix of an entity, rebuilding the cache if needed
///
/// Returns identity for entities without a transform.
pub fn local_matrix(world: &mut World, entity: Entity) -> Mat4 {
    match world.query_one_mut::<&mut Transform>(entity) {
        Ok(transform) => {
            rebuild_local(transform);
            transform.local_matrix
        }
        Err(_) => Mat4::IDENTITY,
    }
}

/// Get the world matrix of an entity, rebuilding stale caches on the way
///
/// Walks the ancestor chain upward (bounded by [`MAX_HIERARCHY_DEPTH`]),
/// then rebuilds top-down: a clean ancestor's cache is trusted, so repeated
/// queries in the same dirty epoch touch no matrix math at all.
pub fn world_matrix(world: &mut World, entity: Entity) -> Mat4 {
    // Collect the chain from the entity up to its topmost transformed ancestor
    let mut chain = Vec::new();
    let mut current = Some(entity);
    while let Some(e) = current {
        if !world.contains(e) || world.get::<&Transform>(e).is_err() {
            break;
        }
        chain.push(e);
        if chain.len() > MAX_HIERARCHY_DEPTH {
            error!(
                entity = ?entity,
                depth = chain.len(),
                "Parent chain exceeds maximum depth, truncating world matrix resolution"
            );
            break;
        }
        current = parent_of(world, e);
    }

    if chain.is_empty() {
        return Mat4::IDENTITY;
    }

    // Rebuild from the top of the chain down to the entity
    let mut parent_world = Mat4::IDENTITY;
    for &e in chain.iter().rev() {
        if let Ok(transform) = world.query_one_mut::<&mut Transform>(e) {
            if transform.world_dirty {
                rebuild_local(transform);
                transform.world_matrix = parent_world * transform.local_matrix;
                transform.world_dirty = false;
            }
            parent_world = transform.world_matrix;
        }
    }

    parent_world
}

/// World-space position of an entity (translation column of its world matrix)
pub fn world_position(world: &mut World, entity: Entity) -> Vec3 {
    world_matrix(world, entity).w_axis.truncate()
}

/// World-space scale, accumulated component-wise up the ancestor chain
pub fn world_scale(world: &World, entity: Entity) -> Vec3 {
    let Ok(transform) = world.get::<&Transform>(entity) else {
        return Vec3::ONE;
    };
    let mut scale = transform.local_scale;
    drop(transform);

    let mut current = parent_of(world, entity);
    let mut depth = 0;
    while let Some(e) = current {
        if let Ok(parent_transform) = world.get::<&Transform>(e) {
            scale *= parent_transform.local_scale;
        }
        depth += 1;
        if depth > MAX_HIERARCHY_DEPTH {
            error!(entity = ?entity, "Parent chain exceeds maximum depth in world_scale");
            break;
        }
        current = parent_of(world, e);
    }

    scale
}

/// World-space rotation, composed parent-before-child up the ancestor chain
pub fn world_rotation(world: &World, entity: Entity) -> Quat {
    let Ok(transform) = world.get::<&Transform>(entity) else {
        return Quat::IDENTITY;
    };
    let mut rotation = transform.local_rotation;
    drop(transform);

    let mut current = parent_of(world, entity);
    let mut depth = 0;
    while let Some(e) = current {
        if let Ok(parent_transform) = world.get::<&Transform>(e) {
            rotation = parent_transform.local_rotation * rotation;
        }
        depth += 1;
        if depth > MAX_HIERARCHY_DEPTH {
            error!(entity = ?entity, "Parent chain exceeds maximum depth in world_rotation");
            break;
        }
        current = parent_of(world, e);
    }

    rotation
}

/// Set the local position of an entity, invalidating dependent caches
pub fn set_local_position(world: &mut World, entity: Entity, position: Vec3) {
    if let Ok(transform) = world.query_one_mut::<&mut Transform>(entity) {
        transform.local_position = position;
        transform.local_dirty = true;
    } else {
        return;
    }
    mark_subtree_world_dirty(world, entity);
}

/// Set the local rotation of an entity, invalidating dependent caches
pub fn set_local_rotation(world: &mut World, entity: Entity, rotation: Quat) {
    if let Ok(transform) = world.query_one_mut::<&mut Transform>(entity) {
        transform.local_rotation = rotation;
        transform.local_dirty = true;
    } else {
        return;
    }
    mark_subtree_world_dirty(world, entity);
}

/// Set the local scale of an entity, invalidating dependent caches
pub fn set_local_scale(world: &mut World, entity: Entity, scale: Vec3) {
    if let Ok(transform) = world.query_one_mut::<&mut Transform>(entity) {
        transform.local_scale = scale;
        transform.local_dirty = true;
    } else {
        return;
    }
    mark_subtree_world_dirty(world, entity);
}

/// Reparent `child` under `new_parent` (or detach it when `None`)
///
/// Rejected without mutating anything when the child is invalid, or when
/// the new parent is the child itself or one of its descendants (which
/// would close a cycle). Returns whether the reparent happened.
///
/// Under [`ReparentPolicy::PreserveWorld`] the child's local transform is
/// recomputed from `inverse(new_parent_world) * old_world` so its world
/// pose survives the move.
pub fn set_parent(
    world: &mut World,
    child: Entity,
    new_parent: Option<Entity>,
    policy: ReparentPolicy,
) -> bool {
    if !world.contains(child) {
        return false;
    }
    if let Some(parent) = new_parent {
        if !world.contains(parent) || would_create_cycle(world, child, parent) {
            return false;
        }
    }

    // Capture the world pose before any links change
    let has_transform = world.get::<&Transform>(child).is_ok();
    let old_world = if has_transform && policy == ReparentPolicy::PreserveWorld {
        Some(world_matrix(world, child))
    } else {
        None
    };

    // Detach from the old parent's children list
    let old_parent = parent_of(world, child);
    if let Some(old) = old_parent {
        if let Ok(rel) = world.query_one_mut::<&mut Relationship>(old) {
            rel.children.retain(|&c| c != child);
        }
    }

    // Point the child at its new parent
    let relinked = match world.query_one_mut::<&mut Relationship>(child) {
        Ok(rel) => {
            rel.parent = new_parent;
            true
        }
        Err(_) => false,
    };
    if !relinked {
        let rel = Relationship {
            parent: new_parent,
            children: Vec::new(),
        };
        if world.insert_one(child, rel).is_err() {
            return false;
        }
    }

    // Append to the new parent's children list
    if let Some(parent) = new_parent {
        let appended = match world.query_one_mut::<&mut Relationship>(parent) {
            Ok(rel) => {
                rel.children.push(child);
                true
            }
            Err(_) => false,
        };
        if !appended {
            let _ = world.insert_one(
                parent,
                Relationship {
                    parent: None,
                    children: vec![child],
                },
            );
        }
    }

    // Restore the world pose in the new parent's space
    if let Some(old_world) = old_world {
        let parent_world = match new_parent {
            Some(parent) if world.get::<&Transform>(parent).is_ok() => {
                world_matrix(world, parent)
            }
            _ => Mat4::IDENTITY,
        };
        let new_local = parent_world.inverse() * old_world;
        let (scale, rotation, translation) = new_local.to_scale_rotation_translation();

        if let Ok(transform) = world.query_one_mut::<&mut Transform>(child) {
            transform.local_position = translation;
            transform.local_rotation = rotation;
            transform.local_scale = scale;
            transform.local_dirty = true;
        }
    }

    mark_subtree_world_dirty(world, child);
    true
}

/// Check whether parenting `child` under `new_parent` would close a cycle
///
/// Walks upward from `new_parent` looking for `child`; O(depth).
pub fn would_create_cycle(world: &World, child: Entity, new_parent: Entity) -> bool {
    if child == new_parent {
        return true;
    }

    let mut current = Some(new_parent);
    let mut depth = 0;
    while let Some(e) = current {
        if e == child {
            return true;
        }
        depth += 1;
        if depth > MAX_HIERARCHY_DEPTH {
            error!(
                child = ?child,
                new_parent = ?new_parent,
                "Ancestor walk exceeded maximum depth during cycle check, rejecting reparent"
            );
            return true;
        }
        current = parent_of(world, e);
    }

    false
}

/// Depth-first mark of `entity` and every descendant as world-dirty
///
/// Iterative with an explicit stack; a subtree larger than the traversal
/// budget is reported as a hierarchy-integrity error and the remainder is
/// left untouched.
pub fn mark_subtree_world_dirty(world: &mut World, entity: Entity) {
    let mut stack = vec![entity];
    let mut visited = 0usize;

    while let Some(e) = stack.pop() {
        visited += 1;
        if visited > MAX_HIERARCHY_DEPTH * MAX_HIERARCHY_DEPTH {
            error!(
                root = ?entity,
                "Dirty propagation budget exhausted, relationship graph is likely corrupted"
            );
            return;
        }

        if let Ok(transform) = world.query_one_mut::<&mut Transform>(e) {
            transform.world_dirty = true;
        }
        stack.extend(children_of(world, e));
    }
}

/// Rebuild the local matrix cache when the TRS fields changed
fn rebuild_local(transform: &mut Transform) {
    if transform.local_dirty {
        transform.local_matrix = Mat4::from_scale_rotation_translation(
            transform.local_scale,
            transform.local_rotation,
            transform.local_position,
        );
        transform.local_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::components::Active;

    fn spawn_node(world: &mut World, position: Vec3) -> Entity {
        let entity = world.spawn((Active::default(), Relationship::default()));
        let transform = Transform::from_position(entity, position);
        world.insert_one(entity, transform).unwrap();
        entity
    }

    fn link(world: &mut World, child: Entity, parent: Entity) {
        assert!(set_parent(world, child, Some(parent), ReparentPolicy::KeepLocal));
    }

    #[test]
    fn test_world_matrix_chain() {
        let mut world = World::new();
        let a = spawn_node(&mut world, Vec3::new(1.0, 0.0, 0.0));
        let b = spawn_node(&mut world, Vec3::new(0.0, 2.0, 0.0));
        link(&mut world, b, a);

        let ta = Mat4::from_translation(Vec3::new(1.0, 0.0, 0.0));
        let tb = Mat4::from_translation(Vec3::new(0.0, 2.0, 0.0));
        let expected = ta * tb;

        assert!(world_matrix(&mut world, b).abs_diff_eq(expected, 1e-6));
        assert!(world_position(&mut world, b).abs_diff_eq(Vec3::new(1.0, 2.0, 0.0), 1e-6));
    }

    #[test]
    fn test_parent_change_propagates_without_touching_child() {
        let mut world = World::new();
        let a = spawn_node(&mut world, Vec3::X);
        let b = spawn_node(&mut world, Vec3::Y);
        link(&mut world, b, a);

        assert!(world_position(&mut world, b).abs_diff_eq(Vec3::new(1.0, 1.0, 0.0), 1e-6));

        // Move the parent; the child reflects it on its next read without
        // any call against the child itself
        set_local_position(&mut world, a, Vec3::new(5.0, 0.0, 0.0));
        assert!(world_position(&mut world, b).abs_diff_eq(Vec3::new(5.0, 1.0, 0.0), 1e-6));
    }

    #[test]
    fn test_world_matrix_read_is_idempotent() {
        let mut world = World::new();
        let a = spawn_node(&mut world, Vec3::X);
        let b = spawn_node(&mut world, Vec3::Y);
        link(&mut world, b, a);

        let first = world_matrix(&mut world, b);

        // Poison the caches while leaving them marked clean: a second read
        // must come straight from the cache and return the sentinel.
        let sentinel = Mat4::from_translation(Vec3::splat(123.0));
        {
            let transform = world.query_one_mut::<&mut Transform>(b).unwrap();
            assert!(!transform.world_dirty);
            transform.world_matrix = sentinel;
        }
        assert_eq!(world_matrix(&mut world, b), sentinel);

        // Invalidating recomputes and repairs the cache
        set_local_position(&mut world, b, Vec3::Y);
        assert!(world_matrix(&mut world, b).abs_diff_eq(first, 1e-6));
    }

    #[test]
    fn test_scale_propagation() {
        let mut world = World::new();
        let parent = spawn_node(&mut world, Vec3::ZERO);
        set_local_scale(&mut world, parent, Vec3::splat(2.0));
        let child = spawn_node(&mut world, Vec3::X);
        link(&mut world, child, parent);

        assert!(world_position(&mut world, child).abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-6));
        assert!(world_scale(&world, child).abs_diff_eq(Vec3::splat(2.0), 1e-6));
    }

    #[test]
    fn test_world_rotation_composes_parent_first() {
        let mut world = World::new();
        let parent = spawn_node(&mut world, Vec3::ZERO);
        let child = spawn_node(&mut world, Vec3::ZERO);
        link(&mut world, child, parent);

        let quarter = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        set_local_rotation(&mut world, parent, quarter);
        set_local_rotation(&mut world, child, quarter);

        let expected = quarter * quarter;
        let combined = world_rotation(&world, child);
        assert!(combined.abs_diff_eq(expected, 1e-6) || combined.abs_diff_eq(-expected, 1e-6));
    }

    #[test]
    fn test_self_parent_rejected() {
        let mut world = World::new();
        let a = spawn_node(&mut world, Vec3::ZERO);
        assert!(!set_parent(&mut world, a, Some(a), ReparentPolicy::KeepLocal));
        assert_eq!(parent_of(&world, a), None);
    }

    #[test]
    fn test_cycle_rejected_and_graph_unchanged() {
        let mut world = World::new();
        let a = spawn_node(&mut world, Vec3::ZERO);
        let b = spawn_node(&mut world, Vec3::ZERO);
        let c = spawn_node(&mut world, Vec3::ZERO);
        link(&mut world, b, a);
        link(&mut world, c, b);

        // a -> b -> c; parenting a under c would close the loop
        assert!(!set_parent(&mut world, a, Some(c), ReparentPolicy::KeepLocal));

        assert_eq!(parent_of(&world, a), None);
        assert_eq!(parent_of(&world, b), Some(a));
        assert_eq!(parent_of(&world, c), Some(b));
        assert_eq!(children_of(&world, c), Vec::new());
    }

    #[test]
    fn test_reparent_detaches_from_old_parent() {
        let mut world = World::new();
        let a = spawn_node(&mut world, Vec3::ZERO);
        let b = spawn_node(&mut world, Vec3::ZERO);
        let child = spawn_node(&mut world, Vec3::ZERO);
        link(&mut world, child, a);
        link(&mut world, child, b);

        assert_eq!(children_of(&world, a), Vec::new());
        assert_eq!(children_of(&world, b), vec![child]);
        assert_eq!(parent_of(&world, child), Some(b));
    }

    #[test]
    fn test_children_keep_insertion_order() {
        let mut world = World::new();
        let parent = spawn_node(&mut world, Vec3::ZERO);
        let c1 = spawn_node(&mut world, Vec3::ZERO);
        let c2 = spawn_node(&mut world, Vec3::ZERO);
        let c3 = spawn_node(&mut world, Vec3::ZERO);
        link(&mut world, c1, parent);
        link(&mut world, c2, parent);
        link(&mut world, c3, parent);

        assert_eq!(children_of(&world, parent), vec![c1, c2, c3]);
    }

    #[test]
    fn test_reparent_preserve_world_keeps_pose() {
        let mut world = World::new();
        let old_parent = spawn_node(&mut world, Vec3::new(10.0, 0.0, 0.0));
        let new_parent = spawn_node(&mut world, Vec3::new(0.0, 0.0, 7.0));
        let child = spawn_node(&mut world, Vec3::new(0.0, 3.0, 0.0));
        link(&mut world, child, old_parent);

        let before = world_position(&mut world, child);
        assert!(set_parent(
            &mut world,
            child,
            Some(new_parent),
            ReparentPolicy::PreserveWorld
        ));
        let after = world_position(&mut world, child);

        assert!(after.abs_diff_eq(before, 1e-4));
        // The local transform absorbed the difference
        let local = world.get::<&Transform>(child).unwrap();
        assert!(local
            .local_position
            .abs_diff_eq(Vec3::new(10.0, 3.0, -7.0), 1e-4));
    }

    #[test]
    fn test_reparent_keep_local_jumps() {
        let mut world = World::new();
        let new_parent = spawn_node(&mut world, Vec3::new(0.0, 0.0, 7.0));
        let child = spawn_node(&mut world, Vec3::new(0.0, 3.0, 0.0));

        assert!(set_parent(
            &mut world,
            child,
            Some(new_parent),
            ReparentPolicy::KeepLocal
        ));

        // Local stays, world shifts into the parent's space
        assert!(world_position(&mut world, child).abs_diff_eq(Vec3::new(0.0, 3.0, 7.0), 1e-6));
    }

    #[test]
    fn test_unparent_preserve_world() {
        let mut world = World::new();
        let parent = spawn_node(&mut world, Vec3::new(4.0, 0.0, 0.0));
        let child = spawn_node(&mut world, Vec3::new(0.0, 1.0, 0.0));
        link(&mut world, child, parent);

        let before = world_position(&mut world, child);
        assert!(set_parent(&mut world, child, None, ReparentPolicy::PreserveWorld));
        assert!(world_position(&mut world, child).abs_diff_eq(before, 1e-5));
        assert_eq!(parent_of(&world, child), None);
    }

    #[test]
    fn test_missing_transform_yields_identity() {
        let mut world = World::new();
        let bare = world.spawn((Relationship::default(),));
        assert_eq!(world_matrix(&mut world, bare), Mat4::IDENTITY);
        assert_eq!(local_matrix(&mut world, bare), Mat4::IDENTITY);
        assert_eq!(world_scale(&world, bare), Vec3::ONE);
        assert_eq!(world_rotation(&world, bare), Quat::IDENTITY);
    }

    #[test]
    fn test_setters_on_dead_entity_are_noops() {
        let mut world = World::new();
        let e = spawn_node(&mut world, Vec3::ZERO);
        world.despawn(e).unwrap();

        set_local_position(&mut world, e, Vec3::X);
        set_local_rotation(&mut world, e, Quat::IDENTITY);
        set_local_scale(&mut world, e, Vec3::ONE);
        assert!(!set_parent(&mut world, e, None, ReparentPolicy::KeepLocal));
    }

    #[test]
    fn test_deep_chain_resolves() {
        let mut world = World::new();
        let mut previous = spawn_node(&mut world, Vec3::X);
        for _ in 0..64 {
            let next = spawn_node(&mut world, Vec3::X);
            link(&mut world, next, previous);
            previous = next;
        }

        // 65 links, each translating by one unit on X
        assert!(world_position(&mut world, previous).abs_diff_eq(Vec3::new(65.0, 0.0, 0.0), 1e-4));
    }
}
