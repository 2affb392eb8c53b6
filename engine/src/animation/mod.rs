//! Skeletal animation: keyframe clips, the pose sampler, and the
//! animator component driving playback

pub mod animator;
pub mod clip;
pub mod loader;

// Re-export commonly used types
pub use animator::{Animator, AnimatorComponent, MAX_BONES};
pub use clip::{
    Animation, BoneChannel, BoneInfo, BoneInfoMap, PositionKeyframe, RotationKeyframe,
    ScaleKeyframe, SkeletonNode,
};
pub use loader::{load_clip, load_clip_by_name};
