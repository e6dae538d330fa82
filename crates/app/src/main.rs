//! Entry point for objview.
//! Loads an OBJ file and logs what every object turns into.

mod config;

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use anyhow::{Result, bail};
use asset::{
    FileSource, MaterialBuild, MaterialDescriptor, MaterialHandle, MaterialsConfig, MeshLod,
    ObjAsset,
};
use corelib::Transform;
use platform::{AsyncLoader, RenderLoop};

/// Stand-in for a renderer's material factory: keeps the descriptor and
/// logs what would be built.
struct SummaryMaterials;

impl MaterialBuild for SummaryMaterials {
    fn build_material(
        &self,
        name: &str,
        descriptor: MaterialDescriptor,
        _config: &MaterialsConfig,
    ) -> Option<MaterialHandle> {
        log::info!(
            "Material '{}': color={:?} translucent={} specular={:.3} base_color_mips={} normal_mips={}",
            name,
            descriptor.base_color_factor,
            descriptor.translucent,
            descriptor.base_specular_factor,
            descriptor.base_color_texture.as_ref().map_or(0, Vec::len),
            descriptor.normal_texture.as_ref().map_or(0, Vec::len),
        );
        Some(MaterialHandle::new(descriptor))
    }
}

fn log_lod(name: &str, lod: &MeshLod) {
    log::info!(
        "Object '{}': {} primitives, {} vertices, {} triangles",
        name,
        lod.primitives.len(),
        lod.vertex_count(),
        lod.triangle_count()
    );
    for p in &lod.primitives {
        log::debug!(
            "  '{}': {} triangles, uv_channels={}, normals={}",
            p.material_name,
            p.triangle_count(),
            p.uvs.len(),
            !p.normals.is_empty()
        );
    }
}

fn run_sync(asset: &ObjAsset, names: &[String], materials: &MaterialsConfig) -> Result<()> {
    for name in names {
        let lod = asset.load_object(name, materials, &SummaryMaterials)?;
        log_lod(name, &lod);
    }
    Ok(())
}

fn run_async(
    asset: Arc<ObjAsset>,
    names: Vec<String>,
    materials: MaterialsConfig,
    workers: usize,
) -> Result<()> {
    // This thread owns the render loop; loads report back to it.
    let render = RenderLoop::new();
    let loader = AsyncLoader::new(render.handle(), workers)?;
    let finished = Arc::new(AtomicBool::new(false));

    let done = Arc::clone(&finished);
    let on_finished = move || done.store(true, Ordering::SeqCst);
    match names.as_slice() {
        [single] => {
            let name = single.clone();
            loader.load_object_async(
                asset,
                single.clone(),
                materials,
                Arc::new(SummaryMaterials),
                move |valid, lod| {
                    if valid {
                        log_lod(&name, &lod);
                    }
                    on_finished();
                },
            );
        }
        _ => loader.load_scene_async(
            asset,
            materials,
            Arc::new(SummaryMaterials),
            |name, lod| log_lod(name, &lod),
            on_finished,
        ),
    }

    while !render.pump_until(Duration::from_secs(1), || finished.load(Ordering::SeqCst)) {
        log::debug!("Still loading...");
    }
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config::Invocation { input, config } = config::parse_args(std::env::args().skip(1))?;
    log::info!(
        "Opening {} (async={}, scale={}, workers={})",
        input.display(),
        config.loader.async_load,
        config.loader.scale,
        config.loader.worker_threads
    );

    let asset = Arc::new(
        ObjAsset::new(FileSource::new(&input))
            .with_transform(Transform::from_scale(config.loader.scale)),
    );

    let all = asset.object_names()?;
    let names = match &config.loader.object {
        Some(wanted) if all.contains(wanted) => vec![wanted.clone()],
        Some(wanted) => bail!("Object '{}' not found; available: {:?}", wanted, all),
        None => all,
    };

    if config.loader.async_load {
        run_async(asset, names, config.materials, config.loader.worker_threads)?;
    } else {
        run_sync(&asset, &names, &config.materials)?;
    }

    log::info!("Done. Bye!");
    Ok(())
}
