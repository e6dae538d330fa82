//! Asynchronous OBJ loading.
//!
//! Loads run on a worker pool and report back on the render thread.
//! Material builds that happen during a worker load are dispatched to the
//! render thread one at a time.

use std::{collections::VecDeque, sync::Arc};

use anyhow::{Context, Result};
use asset::{MaterialBuild, MaterialDescriptor, MaterialHandle, MaterialsConfig, MeshLod, ObjAsset};

use crate::render_loop::RenderHandle;

/// Runs a render-thread-only [`MaterialBuild`] from any thread by blocking
/// on a round-trip through the render loop.
pub struct RenderThreadMaterials {
    inner: Arc<dyn MaterialBuild>,
    render: RenderHandle,
}

impl RenderThreadMaterials {
    pub fn new(inner: Arc<dyn MaterialBuild>, render: RenderHandle) -> Self {
        Self { inner, render }
    }
}

impl MaterialBuild for RenderThreadMaterials {
    fn build_material(
        &self,
        name: &str,
        descriptor: MaterialDescriptor,
        config: &MaterialsConfig,
    ) -> Option<MaterialHandle> {
        if self.render.is_render_thread() {
            return self.inner.build_material(name, descriptor, config);
        }
        let inner = Arc::clone(&self.inner);
        let name = name.to_string();
        let config = config.clone();
        self.render
            .run_blocking(move || inner.build_material(&name, descriptor, &config))
            .flatten()
    }
}

/// Fire-and-forget loading on a worker pool.
///
/// Every completion callback runs on the render thread. There is no
/// cancellation: a submitted load always runs to success or failure.
#[derive(Clone)]
pub struct AsyncLoader {
    pool: Arc<rayon::ThreadPool>,
    render: RenderHandle,
}

impl AsyncLoader {
    pub fn new(render: RenderHandle, worker_threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(worker_threads.max(1))
            .thread_name(|i| format!("obj-loader-{i}"))
            .build()
            .context("Failed to build OBJ loader thread pool")?;
        Ok(Self {
            pool: Arc::new(pool),
            render,
        })
    }

    /// List object names off-thread. A failed asset yields an empty list.
    pub fn list_object_names_async(
        &self,
        asset: Arc<ObjAsset>,
        on_done: impl FnOnce(Vec<String>) + Send + 'static,
    ) {
        let render = self.render.clone();
        self.pool.spawn(move || {
            let names = asset.object_names().unwrap_or_else(|err| {
                log::error!("Listing OBJ objects failed: {err}");
                Vec::new()
            });
            if !render.submit(move || on_done(names)) {
                log::warn!("Render loop gone, object names dropped");
            }
        });
    }

    /// Load one object off-thread; `on_done(valid, lod)` runs on the render
    /// thread. An invalid result carries an empty LOD.
    pub fn load_object_async(
        &self,
        asset: Arc<ObjAsset>,
        name: String,
        config: MaterialsConfig,
        materials: Arc<dyn MaterialBuild>,
        on_done: impl FnOnce(bool, MeshLod) + Send + 'static,
    ) {
        let render = self.render.clone();
        self.pool.spawn(move || {
            let materials = RenderThreadMaterials::new(materials, render.clone());
            let (valid, lod) = match asset.load_object(&name, &config, &materials) {
                Ok(lod) => (true, lod),
                Err(err) => {
                    log::error!("Async load of '{}' failed: {}", name, err);
                    (false, MeshLod::default())
                }
            };
            if !render.submit(move || on_done(valid, lod)) {
                log::warn!("Render loop gone, result for '{}' dropped", name);
            }
        });
    }

    /// Load every object of `asset`, one after another. Each load starts
    /// from the previous completion on the render thread. `on_mesh` sees
    /// every valid object, `on_finished` runs once at the end.
    pub fn load_scene_async(
        &self,
        asset: Arc<ObjAsset>,
        config: MaterialsConfig,
        materials: Arc<dyn MaterialBuild>,
        on_mesh: impl FnMut(&str, MeshLod) + Send + 'static,
        on_finished: impl FnOnce() + Send + 'static,
    ) {
        let loader = self.clone();
        self.list_object_names_async(Arc::clone(&asset), move |names| {
            log::info!("Scene load: {} objects queued", names.len());
            SceneLoad {
                loader,
                asset,
                config,
                materials,
                pending: names.into(),
                on_mesh: Box::new(on_mesh),
                on_finished: Box::new(on_finished),
            }
            .next();
        });
    }
}

/// Sequential whole-asset load state, moved from one completion to the next.
struct SceneLoad {
    loader: AsyncLoader,
    asset: Arc<ObjAsset>,
    config: MaterialsConfig,
    materials: Arc<dyn MaterialBuild>,
    pending: VecDeque<String>,
    on_mesh: Box<dyn FnMut(&str, MeshLod) + Send>,
    on_finished: Box<dyn FnOnce() + Send>,
}

impl SceneLoad {
    fn next(mut self) {
        let Some(name) = self.pending.pop_front() else {
            (self.on_finished)();
            return;
        };
        let loader = self.loader.clone();
        let asset = Arc::clone(&self.asset);
        let materials = Arc::clone(&self.materials);
        let config = self.config.clone();
        loader.load_object_async(asset, name.clone(), config, materials, move |valid, lod| {
            if valid {
                (self.on_mesh)(&name, lod);
            }
            self.next();
        });
    }
}
