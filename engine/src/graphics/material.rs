//! Material definition for mesh rendering
//!
//! A material carries color factors plus the decoded texture images for
//! the slots the importer detected (diffuse/specular/normal). Textures
//! stay CPU-side here; the renderer uploads them on first use.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

/// Decoded RGBA8 image for a material slot
#[derive(Debug, Clone)]
pub struct TextureData {
    pub width: u32,
    pub height: u32,
    /// Tightly packed RGBA8 pixels, `width * height * 4` bytes
    pub pixels: Vec<u8>,
}

impl TextureData {
    /// Create a texture from raw RGBA8 pixels
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), (width * height * 4) as usize);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// A single-pixel texture of the given color
    pub fn solid(color: [u8; 4]) -> Self {
        Self::new(1, 1, color.to_vec())
    }
}

/// Material defining surface properties of one mesh
#[derive(Debug, Clone, Default)]
pub struct Material {
    /// Material name from the source file
    pub name: String,
    /// Base color factor (RGBA), multiplied with the diffuse texture
    pub color: MaterialColor,
    /// Diffuse (base color) texture
    pub diffuse_texture: Option<TextureData>,
    /// Specular intensity texture
    pub specular_texture: Option<TextureData>,
    /// Tangent-space normal map
    pub normal_texture: Option<TextureData>,
}

/// Base color factor newtype so the plain-data part stays serializable
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct MaterialColor(pub [f32; 4]);

impl Default for MaterialColor {
    fn default() -> Self {
        Self([1.0, 1.0, 1.0, 1.0])
    }
}

impl Material {
    /// Create an untextured material with the given color factor
    pub fn from_color(color: [f32; 4]) -> Self {
        Self {
            color: MaterialColor(color),
            ..Default::default()
        }
    }

    /// Create a material from RGB values (alpha = 1.0)
    pub fn from_rgb(r: f32, g: f32, b: f32) -> Self {
        Self::from_color([r, g, b, 1.0])
    }

    /// Common preset: neutral gray material
    pub fn gray(value: f32) -> Self {
        Self::from_rgb(value, value, value)
    }

    /// Common preset: white material
    pub fn white() -> Self {
        Self::from_rgb(1.0, 1.0, 1.0)
    }
}

/// Material data for the GPU uniform buffer
///
/// Aligned for uniform buffer requirements; `flags.x` marks whether a
/// real normal map is bound (the fallback flat normal carries no tangent
/// space information worth the TBN math).
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialUniform {
    /// Base color factor (RGBA)
    pub color: [f32; 4],
    /// x: has normal map, yzw: unused
    pub flags: [f32; 4],
}

impl crate::graphics::uniform::UniformBuffer for MaterialUniform {}

impl From<&Material> for MaterialUniform {
    fn from(material: &Material) -> Self {
        Self {
            color: material.color.0,
            flags: [
                if material.normal_texture.is_some() {
                    1.0
                } else {
                    0.0
                },
                0.0,
                0.0,
                0.0,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_default_color() {
        let material = Material::default();
        assert_eq!(material.color, MaterialColor([1.0, 1.0, 1.0, 1.0]));
        assert!(material.diffuse_texture.is_none());
    }

    #[test]
    fn test_material_presets() {
        assert_eq!(Material::white().color.0, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(Material::gray(0.5).color.0, [0.5, 0.5, 0.5, 1.0]);
        assert_eq!(Material::from_rgb(0.2, 0.3, 0.4).color.0, [0.2, 0.3, 0.4, 1.0]);
    }

    #[test]
    fn test_material_uniform_size() {
        use std::mem;
        assert_eq!(mem::size_of::<MaterialUniform>(), 32); // 8 floats * 4 bytes
    }

    #[test]
    fn test_material_uniform_normal_flag() {
        let mut material = Material::white();
        assert_eq!(MaterialUniform::from(&material).flags[0], 0.0);

        material.normal_texture = Some(TextureData::solid([128, 128, 255, 255]));
        assert_eq!(MaterialUniform::from(&material).flags[0], 1.0);
    }

    #[test]
    fn test_texture_data_solid() {
        let texture = TextureData::solid([255, 0, 0, 255]);
        assert_eq!(texture.width, 1);
        assert_eq!(texture.height, 1);
        assert_eq!(texture.pixels, vec![255, 0, 0, 255]);
    }
}
