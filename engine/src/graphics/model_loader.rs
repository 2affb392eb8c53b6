//! Model file import
//!
//! Supports glTF/GLB (meshes, materials, textures and skinning data) and
//! OBJ (static meshes with material maps). Import runs entirely on the
//! CPU; the renderer uploads buffers and textures on first draw.

use super::material::{Material, MaterialColor, TextureData};
use super::mesh::{MeshData, Vertex};
use super::model::Model;
use crate::animation::{BoneInfo, BoneInfoMap};
use glam::{Mat4, Vec3};
use std::path::Path;
use tracing::{debug, info, warn};

/// Errors that can occur during asset import
#[derive(Debug, thiserror::Error)]
pub enum AssetError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("glTF loading error: {0}")]
    Gltf(#[from] gltf::Error),

    #[error("OBJ loading error: {0}")]
    ObjLoad(#[from] tobj::LoadError),

    #[error("image decoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("No mesh data found in file")]
    NoMeshData,

    #[error("No animation data found in {0}")]
    NoAnimationData(String),

    #[error("Animation '{0}' not found in file")]
    AnimationNotFound(String),
}

/// Load a model from a file, dispatching on the extension
pub fn load_model(path: &Path) -> Result<Model, AssetError> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|s| s.to_lowercase())
        .unwrap_or_default();

    let mut model = match extension.as_str() {
        "gltf" | "glb" => load_gltf(path),
        "obj" => load_obj(path),
        ext => Err(AssetError::UnsupportedFormat(ext.to_string())),
    }?;

    model.path = Some(path.to_path_buf());
    Ok(model)
}

/// Load a glTF/GLB model with skinning data
fn load_gltf(path: &Path) -> Result<Model, AssetError> {
    info!("Loading glTF file: {:?}", path);

    let (document, buffers, images) = gltf::import(path)?;

    // Bone table: skin joints in declaration order, offsets from the
    // inverse bind matrices
    let mut bone_info = BoneInfoMap::new();
    let mut bone_counter = 0usize;
    for skin in document.skins() {
        let reader = skin.reader(|buffer| Some(&buffers[buffer.index()]));
        let inverse_binds: Vec<Mat4> = reader
            .read_inverse_bind_matrices()
            .map(|iter| iter.map(|m| Mat4::from_cols_array_2d(&m)).collect())
            .unwrap_or_default();

        for (joint_index, joint) in skin.joints().enumerate() {
            let name = joint
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("node_{}", joint.index()));
            let offset = inverse_binds
                .get(joint_index)
                .copied()
                .unwrap_or(Mat4::IDENTITY);
            bone_info.entry(name).or_insert(BoneInfo {
                index: bone_counter,
                offset,
            });
            bone_counter += 1;
        }
    }

    let materials: Vec<Material> = document
        .materials()
        .map(|material| convert_gltf_material(&material, &images))
        .collect();

    let mut meshes = Vec::new();
    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let positions: Vec<[f32; 3]> = reader
                .read_positions()
                .map(|iter| iter.collect())
                .unwrap_or_default();
            if positions.is_empty() {
                continue;
            }
            let vertex_count = positions.len();

            let normals: Vec<[f32; 3]> = reader
                .read_normals()
                .map(|iter| iter.collect())
                .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; vertex_count]);

            let uvs: Vec<[f32; 2]> = reader
                .read_tex_coords(0)
                .map(|iter| iter.into_f32().collect())
                .unwrap_or_else(|| vec![[0.0, 0.0]; vertex_count]);

            let tangents: Vec<[f32; 4]> = reader
                .read_tangents()
                .map(|iter| iter.collect())
                .unwrap_or_else(|| vec![[1.0, 0.0, 0.0, 1.0]; vertex_count]);

            let joints: Vec<[u32; 4]> = reader
                .read_joints(0)
                .map(|iter| {
                    iter.into_u16()
                        .map(|j| [j[0] as u32, j[1] as u32, j[2] as u32, j[3] as u32])
                        .collect()
                })
                .unwrap_or_else(|| vec![[0; 4]; vertex_count]);

            let weights: Vec<[f32; 4]> = reader
                .read_weights(0)
                .map(|iter| iter.into_f32().collect())
                .unwrap_or_else(|| vec![[0.0; 4]; vertex_count]);

            let indices: Vec<u32> = reader
                .read_indices()
                .map(|iter| iter.into_u32().collect())
                .unwrap_or_else(|| (0..vertex_count as u32).collect());

            let vertices = (0..vertex_count)
                .map(|i| Vertex {
                    position: positions[i],
                    normal: normals[i],
                    uv: uvs[i],
                    tangent: tangents[i],
                    joints: joints[i],
                    weights: weights[i],
                })
                .collect();

            let mut data = MeshData::new(vertices, indices);
            data.material_index = primitive.material().index().unwrap_or(0);
            meshes.push(data);
        }
    }

    if meshes.is_empty() {
        return Err(AssetError::NoMeshData);
    }

    let name = file_stem(path);
    debug!(
        meshes = meshes.len(),
        materials = materials.len(),
        bones = bone_counter,
        "Parsed glTF model"
    );
    Ok(Model::new(name, meshes, materials, bone_info))
}

/// Convert a glTF material, decoding textures by slot: base color as
/// diffuse, metallic-roughness as specular, plus the normal map
fn convert_gltf_material(
    material: &gltf::Material,
    images: &[gltf::image::Data],
) -> Material {
    let pbr = material.pbr_metallic_roughness();

    let diffuse_texture = pbr
        .base_color_texture()
        .and_then(|info| convert_gltf_image(images.get(info.texture().source().index())));
    let specular_texture = pbr
        .metallic_roughness_texture()
        .and_then(|info| convert_gltf_image(images.get(info.texture().source().index())));
    let normal_texture = material
        .normal_texture()
        .and_then(|info| convert_gltf_image(images.get(info.texture().source().index())));

    Material {
        name: material.name().unwrap_or("material").to_string(),
        color: MaterialColor(pbr.base_color_factor()),
        diffuse_texture,
        specular_texture,
        normal_texture,
    }
}

/// Expand a decoded glTF image into RGBA8
fn convert_gltf_image(data: Option<&gltf::image::Data>) -> Option<TextureData> {
    let data = data?;
    let pixel_count = (data.width * data.height) as usize;

    let pixels = match data.format {
        gltf::image::Format::R8G8B8A8 => data.pixels.clone(),
        gltf::image::Format::R8G8B8 => {
            let mut out = Vec::with_capacity(pixel_count * 4);
            for rgb in data.pixels.chunks_exact(3) {
                out.extend_from_slice(rgb);
                out.push(255);
            }
            out
        }
        gltf::image::Format::R8 => {
            let mut out = Vec::with_capacity(pixel_count * 4);
            for &value in &data.pixels {
                out.extend_from_slice(&[value, value, value, 255]);
            }
            out
        }
        other => {
            warn!(format = ?other, "Unsupported texture pixel format, skipping");
            return None;
        }
    };

    Some(TextureData::new(data.width, data.height, pixels))
}

/// Load a static mesh from an OBJ file
fn load_obj(path: &Path) -> Result<Model, AssetError> {
    info!("Loading OBJ file: {:?}", path);

    let (models, materials) = tobj::load_obj(
        path,
        &tobj::LoadOptions {
            triangulate: true,
            single_index: true,
            ..Default::default()
        },
    )?;

    if models.is_empty() {
        return Err(AssetError::NoMeshData);
    }

    let obj_dir = path.parent().unwrap_or_else(|| Path::new("."));
    let materials = match materials {
        Ok(list) => list
            .iter()
            .map(|m| convert_obj_material(m, obj_dir))
            .collect(),
        Err(err) => {
            warn!(path = ?path, error = %err, "OBJ material library failed to load");
            Vec::new()
        }
    };

    let mut meshes = Vec::new();
    for model in &models {
        let mesh = &model.mesh;
        let num_vertices = mesh.positions.len() / 3;
        if num_vertices == 0 {
            continue;
        }

        debug!(
            "Loaded OBJ model '{}' with {} vertices and {} indices",
            model.name,
            num_vertices,
            mesh.indices.len()
        );

        let mut vertices = Vec::with_capacity(num_vertices);
        for i in 0..num_vertices {
            let pos_offset = i * 3;
            let position = [
                mesh.positions[pos_offset],
                mesh.positions[pos_offset + 1],
                mesh.positions[pos_offset + 2],
            ];

            let uv = if i * 2 + 1 < mesh.texcoords.len() {
                let tex_offset = i * 2;
                [mesh.texcoords[tex_offset], mesh.texcoords[tex_offset + 1]]
            } else {
                [0.0, 0.0]
            };

            let normal = if pos_offset + 2 < mesh.normals.len() {
                [
                    mesh.normals[pos_offset],
                    mesh.normals[pos_offset + 1],
                    mesh.normals[pos_offset + 2],
                ]
            } else {
                [0.0, 1.0, 0.0]
            };

            vertices.push(Vertex::new(position, normal, uv));
        }

        if mesh.normals.is_empty() {
            calculate_normals(&mut vertices, &mesh.indices);
        }

        let mut data = MeshData::new(vertices, mesh.indices.clone());
        data.material_index = mesh.material_id.unwrap_or(0);
        meshes.push(data);
    }

    if meshes.is_empty() {
        return Err(AssetError::NoMeshData);
    }

    Ok(Model::new(file_stem(path), meshes, materials, BoneInfoMap::new()))
}

/// Convert an OBJ material, loading its texture maps from disk
fn convert_obj_material(material: &tobj::Material, obj_dir: &Path) -> Material {
    let color = material
        .diffuse
        .map(|[r, g, b]| [r, g, b, 1.0])
        .unwrap_or([1.0, 1.0, 1.0, 1.0]);

    let load = |texture: &Option<String>| {
        texture.as_ref().and_then(|file| {
            match super::texture::load_image(&obj_dir.join(file)) {
                Ok(data) => Some(data),
                Err(err) => {
                    warn!(file = %file, error = %err, "Material texture failed to load");
                    None
                }
            }
        })
    };

    Material {
        name: material.name.clone(),
        color: MaterialColor(color),
        diffuse_texture: load(&material.diffuse_texture),
        specular_texture: load(&material.specular_texture),
        normal_texture: load(&material.normal_texture),
    }
}

/// Calculate normals for vertices based on face geometry
fn calculate_normals(vertices: &mut [Vertex], indices: &[u32]) {
    // First, zero out all normals
    for vertex in vertices.iter_mut() {
        vertex.normal = [0.0, 0.0, 0.0];
    }

    // Calculate face normals and add to vertex normals
    for chunk in indices.chunks(3) {
        if chunk.len() != 3 {
            continue;
        }

        let i0 = chunk[0] as usize;
        let i1 = chunk[1] as usize;
        let i2 = chunk[2] as usize;

        if i0 >= vertices.len() || i1 >= vertices.len() || i2 >= vertices.len() {
            continue;
        }

        let v0 = Vec3::from(vertices[i0].position);
        let v1 = Vec3::from(vertices[i1].position);
        let v2 = Vec3::from(vertices[i2].position);

        let edge1 = v1 - v0;
        let edge2 = v2 - v0;
        let face_normal = edge1.cross(edge2).normalize_or_zero();

        // Add face normal to each vertex
        for &i in &[i0, i1, i2] {
            let current = Vec3::from(vertices[i].normal);
            let new_normal = current + face_normal;
            vertices[i].normal = new_normal.to_array();
        }
    }

    // Normalize all vertex normals
    for vertex in vertices.iter_mut() {
        let normal = Vec3::from(vertex.normal).normalize_or_zero();
        vertex.normal = normal.to_array();
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("model")
        .to_string()
}
