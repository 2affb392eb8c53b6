//! Animation clip data: keyframe tracks, per-node channels, and the
//! imported skeleton hierarchy
//!
//! Everything in this module is immutable after import and shared across
//! animators with `Arc`.

use glam::{Mat4, Quat, Vec3};
use std::collections::HashMap;

/// A bone's slot in the final matrix array plus its inverse bind matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneInfo {
    /// Index into the final bone-matrix array
    pub index: usize,
    /// Offset (inverse bind pose) matrix
    pub offset: Mat4,
}

/// Bone name to skinning slot table, built at model import
pub type BoneInfoMap = HashMap<String, BoneInfo>;

/// Position keyframe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionKeyframe {
    pub position: Vec3,
    pub timestamp: f32,
}

/// Rotation keyframe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RotationKeyframe {
    pub orientation: Quat,
    pub timestamp: f32,
}

/// Scale keyframe
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleKeyframe {
    pub scale: Vec3,
    pub timestamp: f32,
}

/// Keyframe tracks for one animated node
///
/// The three tracks are independently keyed; each is interpolated on its
/// own and the results composed translation * rotation * scale.
#[derive(Debug, Clone, Default)]
pub struct BoneChannel {
    /// Name of the node this channel animates
    pub node: String,
    pub positions: Vec<PositionKeyframe>,
    pub rotations: Vec<RotationKeyframe>,
    pub scales: Vec<ScaleKeyframe>,
}

impl BoneChannel {
    /// Create an empty channel for the given node
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            ..Default::default()
        }
    }

    /// Sample the channel at `time`, composing the interpolated TRS
    pub fn sample(&self, time: f32) -> Mat4 {
        let translation = Mat4::from_translation(self.sample_position(time));
        let rotation = Mat4::from_quat(self.sample_rotation(time));
        let scale = Mat4::from_scale(self.sample_scale(time));
        translation * rotation * scale
    }

    /// Interpolated position at `time` (linear, clamped at the ends)
    pub fn sample_position(&self, time: f32) -> Vec3 {
        match bracket(&self.positions, |k| k.timestamp, time) {
            Bracket::Empty => Vec3::ZERO,
            Bracket::Single(i) => self.positions[i].position,
            Bracket::Pair(i, factor) => self.positions[i]
                .position
                .lerp(self.positions[i + 1].position, factor),
        }
    }

    /// Interpolated rotation at `time` (spherical linear, re-normalized)
    pub fn sample_rotation(&self, time: f32) -> Quat {
        match bracket(&self.rotations, |k| k.timestamp, time) {
            Bracket::Empty => Quat::IDENTITY,
            Bracket::Single(i) => self.rotations[i].orientation.normalize(),
            Bracket::Pair(i, factor) => self.rotations[i]
                .orientation
                .slerp(self.rotations[i + 1].orientation, factor)
                .normalize(),
        }
    }

    /// Interpolated scale at `time` (linear, clamped at the ends)
    pub fn sample_scale(&self, time: f32) -> Vec3 {
        match bracket(&self.scales, |k| k.timestamp, time) {
            Bracket::Empty => Vec3::ONE,
            Bracket::Single(i) => self.scales[i].scale,
            Bracket::Pair(i, factor) => {
                self.scales[i].scale.lerp(self.scales[i + 1].scale, factor)
            }
        }
    }
}

/// Result of a clamped keyframe search
enum Bracket {
    /// No keyframes at all
    Empty,
    /// A single applicable keyframe (one-key track, or time at/past the end)
    Single(usize),
    /// Two bracketing keyframes and the interpolation factor between them
    Pair(usize, f32),
}

/// Clamped keyframe search: find the pair bracketing `time`
///
/// Times before the first key interpolate from the first pair with a
/// clamped factor of zero; times at or past the final key return the
/// final key outright, so a degenerate span never divides by zero.
fn bracket<K>(keys: &[K], timestamp: impl Fn(&K) -> f32, time: f32) -> Bracket {
    match keys.len() {
        0 => Bracket::Empty,
        1 => Bracket::Single(0),
        len => {
            if time >= timestamp(&keys[len - 1]) {
                return Bracket::Single(len - 1);
            }
            let mut index = 0;
            for i in 0..len - 1 {
                if time < timestamp(&keys[i + 1]) {
                    index = i;
                    break;
                }
            }
            let t0 = timestamp(&keys[index]);
            let t1 = timestamp(&keys[index + 1]);
            let span = t1 - t0;
            let factor = if span > 0.0 {
                ((time - t0) / span).clamp(0.0, 1.0)
            } else {
                0.0
            };
            Bracket::Pair(index, factor)
        }
    }
}

/// One node of the imported skeleton hierarchy
///
/// Mirrors the source file's node tree; immutable after import.
#[derive(Debug, Clone)]
pub struct SkeletonNode {
    /// Node name, the key into channels and the bone table
    pub name: String,
    /// Static local transform used when the node is not animated
    pub transform: Mat4,
    /// Child nodes
    pub children: Vec<SkeletonNode>,
}

impl SkeletonNode {
    /// Create a leaf node with an identity transform
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            transform: Mat4::IDENTITY,
            children: Vec::new(),
        }
    }

    /// Set the static local transform
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    /// Append a child node
    pub fn with_child(mut self, child: SkeletonNode) -> Self {
        self.children.push(child);
        self
    }
}

/// An immutable animation clip: keyframe timelines per node plus the
/// skeleton hierarchy and bone table they apply to
#[derive(Debug, Clone)]
pub struct Animation {
    /// Clip display name
    pub name: String,
    /// Clip length in ticks
    pub duration: f32,
    /// Tick rate; the playback cursor advances by `ticks_per_second * dt`
    pub ticks_per_second: f32,
    /// Animated node channels, keyed by node name
    pub channels: HashMap<String, BoneChannel>,
    /// Root of the skeleton node hierarchy
    pub root: SkeletonNode,
    /// Bone name -> (index, offset matrix) skinning table
    pub bone_info: BoneInfoMap,
}

impl Animation {
    /// Create a clip with no channels and an empty skeleton
    ///
    /// Useful as a starting point for programmatic clips and in tests.
    pub fn empty(name: impl Into<String>, duration: f32, ticks_per_second: f32) -> Self {
        Self {
            name: name.into(),
            duration,
            ticks_per_second,
            channels: HashMap::new(),
            root: SkeletonNode::new("Root"),
            bone_info: BoneInfoMap::new(),
        }
    }

    /// Find the channel animating a node, if any
    pub fn find_channel(&self, node: &str) -> Option<&BoneChannel> {
        self.channels.get(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position_track(keys: &[(f32, Vec3)]) -> BoneChannel {
        let mut channel = BoneChannel::new("bone");
        channel.positions = keys
            .iter()
            .map(|&(timestamp, position)| PositionKeyframe {
                position,
                timestamp,
            })
            .collect();
        channel
    }

    #[test]
    fn test_single_keyframe_returns_value_for_any_time() {
        let channel = position_track(&[(0.0, Vec3::new(1.0, 2.0, 3.0))]);

        for time in [-1.0, 0.0, 0.5, 100.0] {
            assert_eq!(channel.sample_position(time), Vec3::new(1.0, 2.0, 3.0));
        }
    }

    #[test]
    fn test_two_keyframe_midpoint_is_linear_midpoint() {
        let channel = position_track(&[(0.0, Vec3::ZERO), (2.0, Vec3::new(4.0, 0.0, 0.0))]);

        assert!(channel
            .sample_position(1.0)
            .abs_diff_eq(Vec3::new(2.0, 0.0, 0.0), 1e-6));
    }

    #[test]
    fn test_time_past_final_key_clamps_to_final_value() {
        let channel = position_track(&[(0.0, Vec3::ZERO), (1.0, Vec3::X)]);

        assert_eq!(channel.sample_position(1.0), Vec3::X);
        assert_eq!(channel.sample_position(42.0), Vec3::X);
    }

    #[test]
    fn test_time_before_first_key_clamps_to_first_value() {
        let channel = position_track(&[(1.0, Vec3::X), (2.0, Vec3::Y)]);
        assert!(channel.sample_position(0.0).abs_diff_eq(Vec3::X, 1e-6));
    }

    #[test]
    fn test_degenerate_span_does_not_divide_by_zero() {
        let channel = position_track(&[(1.0, Vec3::X), (1.0, Vec3::Y), (2.0, Vec3::Z)]);
        let value = channel.sample_position(1.0);
        assert!(value.is_finite());
    }

    #[test]
    fn test_rotation_midpoint_is_normalized_slerp() {
        let mut channel = BoneChannel::new("bone");
        let half_turn = Quat::from_rotation_y(std::f32::consts::FRAC_PI_2);
        channel.rotations = vec![
            RotationKeyframe {
                orientation: Quat::IDENTITY,
                timestamp: 0.0,
            },
            RotationKeyframe {
                orientation: half_turn,
                timestamp: 1.0,
            },
        ];

        let mid = channel.sample_rotation(0.5);
        let expected = Quat::from_rotation_y(std::f32::consts::FRAC_PI_4);
        assert!(mid.abs_diff_eq(expected, 1e-5) || mid.abs_diff_eq(-expected, 1e-5));
        assert!((mid.length() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_empty_tracks_sample_identity() {
        let channel = BoneChannel::new("bone");
        assert_eq!(channel.sample_position(0.5), Vec3::ZERO);
        assert_eq!(channel.sample_rotation(0.5), Quat::IDENTITY);
        assert_eq!(channel.sample_scale(0.5), Vec3::ONE);
        assert!(channel.sample(0.5).abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn test_sample_composes_trs_in_order() {
        let mut channel = BoneChannel::new("bone");
        channel.positions = vec![PositionKeyframe {
            position: Vec3::new(1.0, 0.0, 0.0),
            timestamp: 0.0,
        }];
        channel.scales = vec![ScaleKeyframe {
            scale: Vec3::splat(2.0),
            timestamp: 0.0,
        }];

        let expected = Mat4::from_translation(Vec3::X) * Mat4::from_scale(Vec3::splat(2.0));
        assert!(channel.sample(0.0).abs_diff_eq(expected, 1e-6));
    }

    #[test]
    fn test_independent_track_lengths() {
        let mut channel = BoneChannel::new("bone");
        channel.positions = vec![
            PositionKeyframe {
                position: Vec3::ZERO,
                timestamp: 0.0,
            },
            PositionKeyframe {
                position: Vec3::X,
                timestamp: 2.0,
            },
        ];
        channel.rotations = vec![RotationKeyframe {
            orientation: Quat::IDENTITY,
            timestamp: 0.0,
        }];

        // Position interpolates while the single-key rotation holds
        assert!(channel
            .sample_position(1.0)
            .abs_diff_eq(Vec3::new(0.5, 0.0, 0.0), 1e-6));
        assert_eq!(channel.sample_rotation(1.0), Quat::IDENTITY);
    }

    #[test]
    fn test_animation_find_channel() {
        let mut clip = Animation::empty("Default", 1.0, 24.0);
        clip.channels
            .insert("spine".to_string(), BoneChannel::new("spine"));

        assert!(clip.find_channel("spine").is_some());
        assert!(clip.find_channel("missing").is_none());
    }
}
