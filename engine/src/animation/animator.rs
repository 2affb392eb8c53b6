//! Animation playback and per-frame bone matrix computation

use super::clip::{Animation, SkeletonNode};
use crate::scene::MAX_HIERARCHY_DEPTH;
use glam::Mat4;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, warn};

/// Capacity of the final bone-matrix array
///
/// Matches the shader-side uniform array; unused slots stay identity so
/// the upload is always fully populated.
pub const MAX_BONES: usize = 100;

/// Samples an animation clip and maintains the final bone matrices
#[derive(Debug, Clone)]
pub struct Animator {
    final_bone_matrices: Vec<Mat4>,
    current_animation: Option<Arc<Animation>>,
    current_time: f32,
    has_ended: bool,
}

impl Default for Animator {
    fn default() -> Self {
        Self::new()
    }
}

impl Animator {
    /// Create an animator with no clip and an identity pose
    pub fn new() -> Self {
        Self {
            final_bone_matrices: vec![Mat4::IDENTITY; MAX_BONES],
            current_animation: None,
            current_time: 0.0,
            has_ended: false,
        }
    }

    /// Advance the playback cursor and recompute the pose
    ///
    /// Looping wraps the cursor modulo the clip duration and always
    /// re-evaluates. Non-looping playback freezes once the cursor passes
    /// the duration: the ended flag flips exactly once, the pose snaps
    /// back to the first frame, and the cursor keeps its final value for
    /// UI readback until the clip is replayed.
    pub fn update(&mut self, delta_time: f32, looping: bool) {
        let Some(animation) = self.current_animation.clone() else {
            return;
        };

        if !self.has_ended {
            self.current_time += animation.ticks_per_second * delta_time;
        }

        if looping {
            if animation.duration > 0.0 {
                self.current_time %= animation.duration;
            }
            self.has_ended = false;
            self.evaluate_pose(&animation, self.current_time);
        } else if self.current_time >= animation.duration && !self.has_ended {
            self.has_ended = true;
            // Hold the first frame; the cursor keeps its end value
            self.evaluate_pose(&animation, 0.0);
        } else if !self.has_ended {
            self.evaluate_pose(&animation, self.current_time);
        }
    }

    /// Switch to a new clip and restart from the beginning
    pub fn play(&mut self, animation: Arc<Animation>) {
        self.current_animation = Some(animation);
        self.current_time = 0.0;
        self.has_ended = false;
    }

    /// Rewind to the beginning without changing the active clip
    pub fn rewind(&mut self) {
        self.current_time = 0.0;
        self.has_ended = false;
        if let Some(animation) = self.current_animation.clone() {
            self.evaluate_pose(&animation, 0.0);
        }
    }

    /// Playback cursor position in ticks
    pub fn current_time(&self) -> f32 {
        self.current_time
    }

    /// Whether a non-looping clip has run past its duration
    pub fn has_ended(&self) -> bool {
        self.has_ended
    }

    /// The active clip, if any
    pub fn current_animation(&self) -> Option<&Arc<Animation>> {
        self.current_animation.as_ref()
    }

    /// Final bone matrices for shader upload, always [`MAX_BONES`] entries
    pub fn final_bone_matrices(&self) -> &[Mat4] {
        &self.final_bone_matrices
    }

    /// Evaluate the skeleton pose at `time`
    ///
    /// Iterative depth-first walk of the immutable node hierarchy: each
    /// node's local transform is its channel sample (or its static
    /// transform when unanimated), accumulated into a global transform;
    /// nodes present in the bone table write `global * offset` into their
    /// slot of the final matrix array.
    fn evaluate_pose(&mut self, animation: &Animation, time: f32) {
        let mut stack: Vec<(&SkeletonNode, Mat4, usize)> =
            vec![(&animation.root, Mat4::IDENTITY, 0)];

        while let Some((node, parent_transform, depth)) = stack.pop() {
            if depth > MAX_HIERARCHY_DEPTH {
                error!(
                    clip = %animation.name,
                    node = %node.name,
                    "Skeleton deeper than the traversal limit, truncating pose evaluation"
                );
                continue;
            }

            let local = match animation.find_channel(&node.name) {
                Some(channel) => channel.sample(time),
                None => node.transform,
            };
            let global = parent_transform * local;

            if let Some(info) = animation.bone_info.get(&node.name) {
                if info.index < MAX_BONES {
                    self.final_bone_matrices[info.index] = global * info.offset;
                } else {
                    warn!(
                        bone = %node.name,
                        index = info.index,
                        "Bone index exceeds the matrix array capacity, skipping"
                    );
                }
            }

            for child in &node.children {
                stack.push((child, global, depth + 1));
            }
        }
    }
}

/// Animator component: named clips plus mutable playback state
///
/// Created empty; `initialize` binds it to a model's bone table so clips
/// loaded afterwards resolve against the same skeleton. Destroyed with
/// its owning entity.
#[derive(Debug, Clone)]
pub struct AnimatorComponent {
    animator: Animator,
    animations: HashMap<String, Arc<Animation>>,
    bone_info: crate::animation::BoneInfoMap,
    current_animation_name: String,
    is_playing: bool,
    is_looping: bool,
    playback_speed: f32,
}

impl Default for AnimatorComponent {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimatorComponent {
    /// Create an empty animator component
    pub fn new() -> Self {
        Self {
            animator: Animator::new(),
            animations: HashMap::new(),
            bone_info: crate::animation::BoneInfoMap::new(),
            current_animation_name: String::new(),
            is_playing: true,
            is_looping: true,
            playback_speed: 1.0,
        }
    }

    /// Bind this component to a model's bone table
    ///
    /// Clips loaded afterwards reuse that table when resolving channel
    /// targets to skin slots.
    pub fn initialize(&mut self, model: &crate::graphics::Model) {
        self.bone_info = model.bone_info.clone();
    }

    /// Import a clip from a file and register it under `name`
    ///
    /// A failed import is logged and leaves the clip set unchanged; the
    /// first successfully loaded clip becomes the active one.
    pub fn load_clip(&mut self, name: &str, path: impl AsRef<Path>) {
        match super::loader::load_clip(path.as_ref(), &self.bone_info) {
            Ok(clip) => self.add_clip(name, Arc::new(clip)),
            Err(err) => {
                error!(name = name, path = ?path.as_ref(), error = %err, "Animation import failed");
            }
        }
    }

    /// Register an already-built clip under `name`
    ///
    /// The first registered clip becomes the active one.
    pub fn add_clip(&mut self, name: &str, clip: Arc<Animation>) {
        let activate = self.animations.is_empty();
        self.animations.insert(name.to_string(), clip);
        if activate {
            self.play_animation(name);
        }
    }

    /// Whether a clip with this name is registered
    pub fn has_animation(&self, name: &str) -> bool {
        self.animations.contains_key(name)
    }

    /// Switch the active clip, resetting the cursor to zero
    ///
    /// Loop and speed settings are untouched. Unknown names are no-ops.
    pub fn play_animation(&mut self, name: &str) {
        if let Some(clip) = self.animations.get(name) {
            self.animator.play(clip.clone());
            self.current_animation_name = name.to_string();
        }
    }

    /// Resume playback of the active clip
    pub fn play(&mut self) {
        self.is_playing = true;
        if self.animator.has_ended() {
            self.animator.rewind();
        }
    }

    /// Pause playback, keeping the cursor where it is
    pub fn pause(&mut self) {
        self.is_playing = false;
    }

    /// Stop playback and rewind to the first frame
    pub fn stop(&mut self) {
        self.is_playing = false;
        self.animator.rewind();
    }

    /// Set whether the active clip wraps at its end
    pub fn set_looping(&mut self, looping: bool) {
        self.is_looping = looping;
    }

    /// Set the playback speed multiplier
    pub fn set_playback_speed(&mut self, speed: f32) {
        self.playback_speed = speed;
    }

    /// Advance the pose when playing; no-op otherwise
    pub fn update(&mut self, delta_time: f32) {
        if self.is_playing {
            self.animator
                .update(delta_time * self.playback_speed, self.is_looping);
        }
    }

    /// Final bone matrices for shader upload
    pub fn bone_matrices(&self) -> &[Mat4] {
        self.animator.final_bone_matrices()
    }

    /// Playback cursor position in ticks
    pub fn current_time(&self) -> f32 {
        self.animator.current_time()
    }

    /// Duration of the active clip in ticks, zero when none is active
    pub fn duration(&self) -> f32 {
        self.animator
            .current_animation()
            .map_or(0.0, |clip| clip.duration)
    }

    /// Name of the active clip
    pub fn current_animation_name(&self) -> &str {
        &self.current_animation_name
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing
    }

    pub fn is_looping(&self) -> bool {
        self.is_looping
    }

    pub fn playback_speed(&self) -> f32 {
        self.playback_speed
    }

    /// Whether a non-looping clip has reached its end
    pub fn has_ended(&self) -> bool {
        self.animator.has_ended()
    }

    /// Access the bound bone table
    pub fn bone_info(&self) -> &crate::animation::BoneInfoMap {
        &self.bone_info
    }

    /// Copy for entity duplication: shares the clip set (clips are
    /// immutable) and playback settings, with a fresh pose state.
    pub fn duplicate(&self) -> Self {
        let mut copy = self.clone();
        copy.animator = Animator::new();
        if !self.current_animation_name.is_empty() {
            let name = self.current_animation_name.clone();
            copy.play_animation(&name);
        }
        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::clip::{
        BoneChannel, BoneInfo, PositionKeyframe, RotationKeyframe, SkeletonNode,
    };
    use glam::{Quat, Vec3};

    /// Two-bone skeleton with non-trivial keys at t=12 of a 24-tick clip
    fn two_bone_clip() -> Animation {
        let mut clip = Animation::empty("Default", 24.0, 24.0);

        clip.root = SkeletonNode::new("root").with_child(
            SkeletonNode::new("upper").with_child(SkeletonNode::new("lower")),
        );

        for (name, index) in [("upper", 0usize), ("lower", 1usize)] {
            clip.bone_info.insert(
                name.to_string(),
                BoneInfo {
                    index,
                    offset: Mat4::IDENTITY,
                },
            );

            let mut channel = BoneChannel::new(name);
            channel.positions = vec![
                PositionKeyframe {
                    position: Vec3::ZERO,
                    timestamp: 0.0,
                },
                PositionKeyframe {
                    position: Vec3::new(2.0, 0.0, 0.0),
                    timestamp: 12.0,
                },
                PositionKeyframe {
                    position: Vec3::ZERO,
                    timestamp: 24.0,
                },
            ];
            channel.rotations = vec![RotationKeyframe {
                orientation: Quat::IDENTITY,
                timestamp: 0.0,
            }];
            clip.channels.insert(name.to_string(), channel);
        }

        clip
    }

    #[test]
    fn test_looping_wraps_cursor_into_duration() {
        let mut animator = Animator::new();
        animator.play(Arc::new(Animation::empty("Default", 10.0, 10.0)));

        // 1.5s at 10 ticks/s = 15 ticks, wraps to 5
        animator.update(1.5, true);
        assert!((animator.current_time() - 5.0).abs() < 1e-5);
        assert!(!animator.has_ended());

        // Keeps wrapping on subsequent updates
        animator.update(1.0, true);
        assert!(animator.current_time() >= 0.0 && animator.current_time() < 10.0);
    }

    #[test]
    fn test_non_looping_freezes_and_sets_ended_once() {
        let mut animator = Animator::new();
        animator.play(Arc::new(Animation::empty("Default", 10.0, 10.0)));

        animator.update(0.5, false);
        assert!(!animator.has_ended());

        animator.update(1.0, false);
        assert!(animator.has_ended());
        let frozen = animator.current_time();
        assert!(frozen >= 10.0);

        // The cursor no longer advances once ended
        animator.update(1.0, false);
        assert!(animator.has_ended());
        assert_eq!(animator.current_time(), frozen);
    }

    #[test]
    fn test_play_resets_cursor_and_ended_flag() {
        let mut animator = Animator::new();
        let clip = Arc::new(Animation::empty("Default", 10.0, 10.0));
        animator.play(clip.clone());
        animator.update(2.0, false);
        assert!(animator.has_ended());

        animator.play(clip);
        assert_eq!(animator.current_time(), 0.0);
        assert!(!animator.has_ended());
    }

    #[test]
    fn test_update_without_clip_is_noop() {
        let mut animator = Animator::new();
        animator.update(1.0, true);
        assert_eq!(animator.current_time(), 0.0);
        assert!(animator
            .final_bone_matrices()
            .iter()
            .all(|m| *m == Mat4::IDENTITY));
    }

    #[test]
    fn test_unused_bone_slots_stay_identity() {
        let mut animator = Animator::new();
        animator.play(Arc::new(two_bone_clip()));
        animator.update(0.5, true);

        assert_eq!(animator.final_bone_matrices().len(), MAX_BONES);
        for matrix in &animator.final_bone_matrices()[2..] {
            assert_eq!(*matrix, Mat4::IDENTITY);
        }
    }

    #[test]
    fn test_pose_accumulates_parent_transforms() {
        let mut animator = Animator::new();
        animator.play(Arc::new(two_bone_clip()));

        // Land exactly on the t=12 keys
        animator.update(0.5, true);

        let matrices = animator.final_bone_matrices();
        // upper translated by 2, lower by parent 2 + own 2
        assert!(matrices[0]
            .w_axis
            .truncate()
            .abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-4));
        assert!(matrices[1]
            .w_axis
            .truncate()
            .abs_diff_eq(Vec3::new(4.0, 0.0, 0.0), 1e-4));
    }

    #[test]
    fn test_bone_offset_matrix_is_applied() {
        let mut clip = two_bone_clip();
        let offset = Mat4::from_translation(Vec3::new(0.0, -1.0, 0.0));
        clip.bone_info.get_mut("upper").unwrap().offset = offset;

        let mut animator = Animator::new();
        animator.play(Arc::new(clip));
        animator.update(0.5, true);

        assert!(animator.final_bone_matrices()[0]
            .w_axis
            .truncate()
            .abs_diff_eq(Vec3::new(2.0, -1.0, 0.0), 1e-4));
    }

    #[test]
    fn test_unanimated_node_uses_static_transform() {
        let mut clip = Animation::empty("Default", 10.0, 10.0);
        clip.root = SkeletonNode::new("root").with_child(
            SkeletonNode::new("static")
                .with_transform(Mat4::from_translation(Vec3::new(0.0, 3.0, 0.0))),
        );
        clip.bone_info.insert(
            "static".to_string(),
            BoneInfo {
                index: 0,
                offset: Mat4::IDENTITY,
            },
        );

        let mut animator = Animator::new();
        animator.play(Arc::new(clip));
        animator.update(0.1, true);

        assert!(animator.final_bone_matrices()[0]
            .w_axis
            .truncate()
            .abs_diff_eq(Vec3::new(0.0, 3.0, 0.0), 1e-5));
    }

    #[test]
    fn test_end_to_end_two_bone_scenario() {
        // Clip of duration 1.0s at 24 ticks/sec, entity-level update of 0.5s
        let mut component = AnimatorComponent::new();
        component.add_clip("Default", Arc::new(two_bone_clip()));

        component.update(0.5);

        assert!((component.current_time() - 12.0).abs() < 1e-4);
        let matrices = component.bone_matrices();
        assert_ne!(matrices[0], Mat4::IDENTITY);
        assert_ne!(matrices[1], Mat4::IDENTITY);
    }

    #[test]
    fn test_component_playback_speed_scales_advance() {
        let mut component = AnimatorComponent::new();
        component.add_clip("Default", Arc::new(Animation::empty("Default", 100.0, 10.0)));
        component.set_playback_speed(2.0);

        component.update(1.0);
        assert!((component.current_time() - 20.0).abs() < 1e-5);
    }

    #[test]
    fn test_component_pause_and_stop() {
        let mut component = AnimatorComponent::new();
        component.add_clip("Default", Arc::new(Animation::empty("Default", 100.0, 10.0)));

        component.update(1.0);
        assert!(component.current_time() > 0.0);

        component.pause();
        let paused_at = component.current_time();
        component.update(1.0);
        assert_eq!(component.current_time(), paused_at);

        component.stop();
        assert_eq!(component.current_time(), 0.0);
        assert!(!component.is_playing());
    }

    #[test]
    fn test_component_switch_clip_keeps_settings() {
        let mut component = AnimatorComponent::new();
        component.add_clip("Idle", Arc::new(Animation::empty("Idle", 10.0, 10.0)));
        component.add_clip("Walk", Arc::new(Animation::empty("Walk", 20.0, 10.0)));
        component.set_looping(false);
        component.set_playback_speed(0.5);

        component.update(0.5);
        component.play_animation("Walk");

        assert_eq!(component.current_time(), 0.0);
        assert_eq!(component.current_animation_name(), "Walk");
        assert!(!component.is_looping());
        assert_eq!(component.playback_speed(), 0.5);
        assert_eq!(component.duration(), 20.0);
    }

    #[test]
    fn test_component_unknown_clip_is_noop() {
        let mut component = AnimatorComponent::new();
        component.add_clip("Idle", Arc::new(Animation::empty("Idle", 10.0, 10.0)));
        component.update(0.25);
        let before = component.current_time();

        component.play_animation("Missing");
        assert_eq!(component.current_animation_name(), "Idle");
        assert_eq!(component.current_time(), before);
    }

    #[test]
    fn test_replay_after_end_rewinds() {
        let mut component = AnimatorComponent::new();
        component.add_clip("Once", Arc::new(Animation::empty("Once", 10.0, 10.0)));
        component.set_looping(false);

        component.update(2.0);
        assert!(component.has_ended());

        component.play();
        assert!(!component.has_ended());
        assert_eq!(component.current_time(), 0.0);
    }
}
