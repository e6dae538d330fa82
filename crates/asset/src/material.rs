//! MTL material resolution and the material-build seam.

use std::{any::Any, fmt, sync::Arc};

use corelib::Vec4;
use serde::Deserialize;

use crate::{
    lines::Document,
    source::ByteSource,
    texture::{TextureData, TextureDecode},
};

/// Caller options for material and texture handling.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct MaterialsConfig {
    /// Build a full mip chain for decoded textures.
    pub generate_mips: bool,
    /// Ignore `map_*` directives entirely.
    pub skip_textures: bool,
    /// Merge primitives that end up with the same material.
    pub merge_sections_by_material: bool,
}

impl Default for MaterialsConfig {
    fn default() -> Self {
        Self {
            generate_mips: true,
            skip_textures: false,
            merge_sections_by_material: false,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum MaterialType {
    #[default]
    Opaque,
    Translucent,
}

/// Engine-agnostic description of a material, filled from an MTL block.
#[derive(Clone, Debug, PartialEq)]
pub struct MaterialDescriptor {
    pub base_color_factor: Vec4,
    pub has_base_color_factor: bool,
    pub translucent: bool,
    pub material_type: MaterialType,
    pub base_specular_factor: f32,
    pub base_color_texture: Option<Vec<TextureData>>,
    pub normal_texture: Option<Vec<TextureData>>,
}

impl Default for MaterialDescriptor {
    fn default() -> Self {
        Self {
            base_color_factor: Vec4::ONE,
            has_base_color_factor: false,
            translucent: false,
            material_type: MaterialType::Opaque,
            base_specular_factor: 0.5,
            base_color_texture: None,
            normal_texture: None,
        }
    }
}

impl MaterialDescriptor {
    fn set_alpha(&mut self, alpha: f32) {
        self.base_color_factor.w = alpha;
        if alpha < 1.0 {
            self.translucent = true;
            self.material_type = MaterialType::Translucent;
        }
    }
}

/// Opaque material produced by a [`MaterialBuild`]. Clones share the same
/// material; equality is identity.
#[derive(Clone)]
pub struct MaterialHandle(Arc<dyn Any + Send + Sync>);

impl MaterialHandle {
    pub fn new<T: Any + Send + Sync>(material: T) -> Self {
        Self(Arc::new(material))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl PartialEq for MaterialHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for MaterialHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MaterialHandle({:p})", Arc::as_ptr(&self.0))
    }
}

/// Turns a descriptor into a renderable material.
///
/// Implementations may only be usable on the rendering thread; callers off
/// that thread go through a dispatching wrapper. `None` leaves the
/// primitive on the default surface material.
pub trait MaterialBuild: Send + Sync {
    fn build_material(
        &self,
        name: &str,
        descriptor: MaterialDescriptor,
        config: &MaterialsConfig,
    ) -> Option<MaterialHandle>;
}

/// Reads material attributes out of a parsed MTL document.
pub struct MaterialResolver<'a> {
    document: &'a Document,
    source: &'a dyn ByteSource,
    decoder: &'a dyn TextureDecode,
}

impl<'a> MaterialResolver<'a> {
    pub fn new(
        document: &'a Document,
        source: &'a dyn ByteSource,
        decoder: &'a dyn TextureDecode,
    ) -> Self {
        Self {
            document,
            source,
            decoder,
        }
    }

    /// Apply the `newmtl <name>` block to `descriptor`.
    ///
    /// Returns `false` and leaves the descriptor untouched when there is no
    /// such block. Unknown directives and unloadable textures are skipped.
    pub fn resolve(
        &self,
        name: &str,
        descriptor: &mut MaterialDescriptor,
        config: &MaterialsConfig,
    ) -> bool {
        let lines = self.document.lines();
        let Some(start) = self
            .document
            .directives("newmtl")
            .find(|(_, line)| line.remaining(1) == name)
            .map(|(index, _)| index + 1)
        else {
            log::debug!("Material '{}' not found in MTL data", name);
            return false;
        };

        for line in lines[start..]
            .iter()
            .take_while(|line| line.directive() != "newmtl")
        {
            match line.directive() {
                "Kd" if line.len() >= 4 => {
                    descriptor.has_base_color_factor = true;
                    descriptor.base_color_factor.x = line.float(1);
                    descriptor.base_color_factor.y = line.float(2);
                    descriptor.base_color_factor.z = line.float(3);
                }
                "d" if line.len() >= 2 => descriptor.set_alpha(line.float(1)),
                // Legacy transparency: inverse of dissolve.
                "Tr" if line.len() >= 2 => descriptor.set_alpha(1.0 - line.float(1)),
                "Ns" if line.len() >= 2 => descriptor.base_specular_factor = line.float(1) / 1000.0,
                "map_Kd" if !config.skip_textures => {
                    if let Some(mips) = self.load_texture(&line.remaining(1), true, config) {
                        descriptor.base_color_texture = Some(mips);
                    }
                }
                "map_Bump" if !config.skip_textures => {
                    if let Some(mips) = self.load_texture(&line.remaining(1), false, config) {
                        descriptor.normal_texture = Some(mips);
                    }
                }
                _ => {}
            }
        }
        true
    }

    fn load_texture(
        &self,
        path: &str,
        srgb: bool,
        config: &MaterialsConfig,
    ) -> Option<Vec<TextureData>> {
        let Some(bytes) = self.source.load_path(path) else {
            log::warn!("Texture '{}' could not be resolved", path);
            return None;
        };
        self.decoder.decode_mips(&bytes, srgb, config)
    }
}
