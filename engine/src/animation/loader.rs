//! Animation clip import
//!
//! Loads keyframe timelines and the node hierarchy from glTF/GLB files,
//! resolving channel targets against a model's bone table.

use super::clip::{
    Animation, BoneChannel, BoneInfoMap, PositionKeyframe, RotationKeyframe, ScaleKeyframe,
    SkeletonNode,
};
use crate::graphics::AssetError;
use glam::{Mat4, Quat, Vec3};
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, warn};

/// Transform-decomposition suffixes some FBX exporters leave on node
/// names when assets pass through format converters. A channel target
/// carrying one of these is retried against the bone table with the
/// suffix removed.
const DECOMPOSITION_SUFFIXES: [&str; 3] = [
    "_$AssimpFbx$_Translation",
    "_$AssimpFbx$_Rotation",
    "_$AssimpFbx$_Scaling",
];

/// Load the first animation clip in a file
///
/// `bone_info` is the owning model's bone table; channel targets are
/// matched against it (with suffix recovery) to report skinning coverage.
pub fn load_clip(path: &Path, bone_info: &BoneInfoMap) -> Result<Animation, AssetError> {
    load_clip_impl(path, bone_info, None)
}

/// Load a specific named animation clip from a file
pub fn load_clip_by_name(
    path: &Path,
    bone_info: &BoneInfoMap,
    name: &str,
) -> Result<Animation, AssetError> {
    load_clip_impl(path, bone_info, Some(name))
}

fn load_clip_impl(
    path: &Path,
    bone_info: &BoneInfoMap,
    wanted: Option<&str>,
) -> Result<Animation, AssetError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();
    if extension != "gltf" && extension != "glb" {
        return Err(AssetError::UnsupportedFormat(extension));
    }

    let (document, buffers, _images) = gltf::import(path)?;

    let animation = match wanted {
        Some(name) => document
            .animations()
            .find(|a| a.name() == Some(name))
            .ok_or_else(|| AssetError::AnimationNotFound(name.to_string()))?,
        None => document
            .animations()
            .next()
            .ok_or_else(|| AssetError::NoAnimationData(path.display().to_string()))?,
    };

    let mut channels: HashMap<String, BoneChannel> = HashMap::new();
    let mut duration = 0.0f32;

    for channel in animation.channels() {
        let target_name = node_name(&channel.target().node());
        let reader = channel.reader(|buffer| Some(&buffers[buffer.index()]));

        let Some(inputs) = reader.read_inputs() else {
            continue;
        };
        let timestamps: Vec<f32> = inputs.collect();
        if let Some(&last) = timestamps.last() {
            duration = duration.max(last);
        }

        let resolved = resolve_bone_name(&target_name, bone_info);
        let entry = channels
            .entry(resolved.clone())
            .or_insert_with(|| BoneChannel::new(resolved));

        match reader.read_outputs() {
            Some(gltf::animation::util::ReadOutputs::Translations(values)) => {
                entry.positions = timestamps
                    .iter()
                    .zip(values)
                    .map(|(&timestamp, v)| PositionKeyframe {
                        position: Vec3::from(v),
                        timestamp,
                    })
                    .collect();
            }
            Some(gltf::animation::util::ReadOutputs::Rotations(values)) => {
                entry.rotations = timestamps
                    .iter()
                    .zip(values.into_f32())
                    .map(|(&timestamp, v)| RotationKeyframe {
                        orientation: Quat::from_xyzw(v[0], v[1], v[2], v[3]),
                        timestamp,
                    })
                    .collect();
            }
            Some(gltf::animation::util::ReadOutputs::Scales(values)) => {
                entry.scales = timestamps
                    .iter()
                    .zip(values)
                    .map(|(&timestamp, v)| ScaleKeyframe {
                        scale: Vec3::from(v),
                        timestamp,
                    })
                    .collect();
            }
            _ => {}
        }
    }

    let root = read_hierarchy(&document);

    let clip_name = animation
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| "Default".to_string());

    info!(
        path = ?path,
        clip = %clip_name,
        channels = channels.len(),
        duration = duration,
        "Loaded animation clip"
    );

    Ok(Animation {
        name: clip_name,
        duration,
        // glTF keyframe times are seconds
        ticks_per_second: 1.0,
        channels,
        root,
        bone_info: bone_info.clone(),
    })
}

/// Match a channel target against the bone table, recovering names that
/// carry decomposition suffixes
///
/// An unmatched suffixed name is a defect in the asset pairing and is
/// logged at `warn!`; an unmatched plain name just animates a hierarchy
/// node that is not skinned, which is only worth a `debug!`.
fn resolve_bone_name(target: &str, bone_info: &BoneInfoMap) -> String {
    if bone_info.contains_key(target) {
        return target.to_string();
    }

    match strip_decomposition_suffix(target) {
        Some(stripped) => {
            if bone_info.contains_key(stripped) {
                debug!(target = target, bone = stripped, "Recovered suffixed bone name");
                stripped.to_string()
            } else {
                warn!(
                    target = target,
                    stripped = stripped,
                    "Animation channel target not found in the model's bone table"
                );
                stripped.to_string()
            }
        }
        None => {
            debug!(
                target = target,
                "Animation channel targets an unskinned node"
            );
            target.to_string()
        }
    }
}

/// Strip a known decomposition suffix, if present
fn strip_decomposition_suffix(name: &str) -> Option<&str> {
    for suffix in DECOMPOSITION_SUFFIXES {
        if let Some(position) = name.find(suffix) {
            return Some(&name[..position]);
        }
    }
    None
}

/// Mirror the file's node hierarchy into immutable skeleton nodes
///
/// Scenes with several root nodes get a synthetic identity root so pose
/// evaluation always starts from a single node.
fn read_hierarchy(document: &gltf::Document) -> SkeletonNode {
    let scene = match document.default_scene().or_else(|| document.scenes().next()) {
        Some(scene) => scene,
        None => return SkeletonNode::new("Root"),
    };

    let mut roots: Vec<SkeletonNode> = scene.nodes().map(|node| read_node(&node)).collect();
    if roots.len() == 1 {
        roots.remove(0)
    } else {
        let mut synthetic = SkeletonNode::new("Root");
        synthetic.children = roots;
        synthetic
    }
}

fn read_node(node: &gltf::Node) -> SkeletonNode {
    let mut out = SkeletonNode::new(node_name(node))
        .with_transform(Mat4::from_cols_array_2d(&node.transform().matrix()));
    out.children = node.children().map(|child| read_node(&child)).collect();
    out
}

/// Display name for a glTF node, falling back to its index
fn node_name(node: &gltf::Node) -> String {
    node.name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node_{}", node.index()))
}
