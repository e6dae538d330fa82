//! Asset loading/parsers: OBJ geometry and MTL materials.
//! Text is tokenized once per asset and cached; objects are turned into
//! engine-agnostic mesh primitives on request.

pub mod cache;
pub mod error;
pub mod face;
pub mod lines;
pub mod material;
pub mod mesh;
pub mod obj;
pub mod source;
pub mod texture;

pub use error::{ObjError, ObjResult};
pub use material::{
    MaterialBuild, MaterialDescriptor, MaterialHandle, MaterialType, MaterialsConfig,
};
pub use mesh::{MergeByMaterial, MeshLod, Primitive, PrimitiveMerge};
pub use obj::ObjAsset;
pub use source::{ByteSource, FileSource, MemorySource};
pub use texture::{ImageDecoder, TextureData, TextureDecode, TextureFormat};
