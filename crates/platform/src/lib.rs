//! Platform layer: render-thread job loop and asynchronous asset loading.
//!
//! Design goals:
//! - One core parse; sync callers use `asset::ObjAsset` directly on the
//!   render thread, async callers go through [`AsyncLoader`].
//! - Thread hops stay out of the parser: the only cross-thread step during
//!   a load is the material build, wrapped by [`RenderThreadMaterials`].

pub mod loader;
pub mod render_loop;

pub use loader::{AsyncLoader, RenderThreadMaterials};
pub use render_loop::{RenderHandle, RenderLoop};
