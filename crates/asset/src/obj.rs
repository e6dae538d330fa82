//! OBJ geometry to mesh primitives.
//!
//! [`ObjAsset`] owns the byte source, the collaborators and the parse
//! cache. [`GeometryParser`] turns one named object of a cached document
//! into a [`MeshLod`].

use std::sync::Arc;

use corelib::{CoordinateTransform, Transform, Vec2, Vec3};

use crate::{
    cache::{AssetCache, CacheEntry},
    error::{ObjError, ObjResult},
    face::{FaceVertexRef, push_face},
    lines::{Document, Line},
    material::{
        MaterialBuild, MaterialDescriptor, MaterialHandle, MaterialResolver, MaterialsConfig,
    },
    mesh::{MergeByMaterial, MeshLod, Primitive, PrimitiveMerge, VertexPools},
    source::ByteSource,
    texture::{ImageDecoder, TextureDecode},
};

/// An OBJ asset: byte source, collaborators and the per-asset cache.
pub struct ObjAsset {
    source: Arc<dyn ByteSource>,
    transform: Arc<dyn CoordinateTransform>,
    decoder: Arc<dyn TextureDecode>,
    merge: Arc<dyn PrimitiveMerge>,
    cache: AssetCache,
}

impl ObjAsset {
    /// Identity transform, `image` texture decoding, merge by material.
    pub fn new(source: impl ByteSource + 'static) -> Self {
        Self::from_shared(Arc::new(source))
    }

    pub fn from_shared(source: Arc<dyn ByteSource>) -> Self {
        Self {
            source,
            transform: Arc::new(Transform::identity()),
            decoder: Arc::new(ImageDecoder),
            merge: Arc::new(MergeByMaterial),
            cache: AssetCache::new(),
        }
    }

    pub fn with_transform(mut self, transform: impl CoordinateTransform + 'static) -> Self {
        self.transform = Arc::new(transform);
        self
    }

    pub fn with_texture_decoder(mut self, decoder: impl TextureDecode + 'static) -> Self {
        self.decoder = Arc::new(decoder);
        self
    }

    pub fn with_primitive_merge(mut self, merge: impl PrimitiveMerge + 'static) -> Self {
        self.merge = Arc::new(merge);
        self
    }

    pub fn cache(&self) -> &AssetCache {
        &self.cache
    }

    /// Names of all `o` directives in file order. A document without any
    /// yields a single empty name, the anonymous object.
    pub fn object_names(&self) -> ObjResult<Vec<String>> {
        self.cache.with_entry(self.source.as_ref(), |entry| {
            let names = entry
                .object_names
                .get_or_insert_with(|| collect_object_names(&entry.geometry));
            Ok(names.clone())
        })
    }

    /// Load one object (empty name: from the start of the file).
    ///
    /// Results are memoized per name; a repeat request returns the stored
    /// LOD without touching the source again. Failures are not memoized.
    ///
    /// The document walk and material resolution run under the asset lock.
    /// `materials` is called after the lock is released, so a build may
    /// wait on a thread that is itself loading from this asset.
    pub fn load_object(
        &self,
        name: &str,
        config: &MaterialsConfig,
        materials: &dyn MaterialBuild,
    ) -> ObjResult<MeshLod> {
        let parsed = self.cache.with_entry(self.source.as_ref(), |entry| {
            if let Some(lod) = entry.lods.get(name) {
                log::debug!("Object '{}' served from cache", name);
                return Ok(Lookup::Memoized(lod.clone()));
            }
            let parser = GeometryParser {
                entry: &*entry,
                source: self.source.as_ref(),
                transform: self.transform.as_ref(),
                decoder: self.decoder.as_ref(),
                config,
            };
            parser.parse(name).map(Lookup::Parsed)
        })?;
        let parsed = match parsed {
            Lookup::Parsed(parsed) => parsed,
            Lookup::Memoized(lod) => return Ok(lod),
        };

        let mut lod = parsed.build_materials(materials, config);
        if config.merge_sections_by_material {
            lod.primitives = self.merge.merge(lod.primitives);
        }

        log::info!(
            "Loaded object '{}': {} primitives, {} triangles",
            name,
            lod.primitives.len(),
            lod.triangle_count()
        );
        Ok(self.cache.memoize(name, lod))
    }
}

enum Lookup {
    Memoized(MeshLod),
    Parsed(ParsedObject),
}

fn collect_object_names(geometry: &Document) -> Vec<String> {
    let names: Vec<String> = geometry
        .directives("o")
        .map(|(_, line)| line.remaining(1))
        .collect();
    if names.is_empty() {
        vec![String::new()]
    } else {
        names
    }
}

/// Builds the mesh of one object from a cached document.
pub struct GeometryParser<'a> {
    entry: &'a CacheEntry,
    source: &'a dyn ByteSource,
    transform: &'a dyn CoordinateTransform,
    decoder: &'a dyn TextureDecode,
    config: &'a MaterialsConfig,
}

/// Parsed object whose materials are resolved but not built yet.
#[derive(Debug)]
pub struct ParsedObject {
    /// Each primitive with the index of its entry in `materials`, if any.
    primitives: Vec<(Primitive, Option<usize>)>,
    /// One per `usemtl`, in file order.
    materials: Vec<(String, MaterialDescriptor)>,
}

impl ParsedObject {
    /// Build every material once, in `usemtl` order, and attach the
    /// handles to their primitives.
    pub fn build_materials(self, build: &dyn MaterialBuild, config: &MaterialsConfig) -> MeshLod {
        let handles: Vec<Option<MaterialHandle>> = self
            .materials
            .into_iter()
            .map(|(name, descriptor)| build.build_material(&name, descriptor, config))
            .collect();
        let primitives = self
            .primitives
            .into_iter()
            .map(|(mut primitive, slot)| {
                primitive.material = slot.and_then(|i| handles.get(i).cloned().flatten());
                primitive
            })
            .collect();
        MeshLod { primitives }
    }
}

impl GeometryParser<'_> {
    pub fn parse(&self, name: &str) -> ObjResult<ParsedObject> {
        let geometry = &self.entry.geometry;
        let pools = self.build_pools(geometry)?;
        let start = locate_object(geometry, name)?;
        log::debug!(
            "Object '{}' starts at line {} ({} positions, {} uvs, {} normals)",
            name,
            start,
            pools.positions.len(),
            pools.uvs.len(),
            pools.normals.len()
        );

        let mut assembly = Assembly::new(&pools);
        for (index, line) in geometry.lines().iter().enumerate().skip(start) {
            match line.directive() {
                "o" if assembly.seen_face => break,
                "g" => assembly.group(line.remaining(1)),
                "f" => {
                    if line.len() < 4 {
                        return Err(malformed(line, index));
                    }
                    let refs: Vec<FaceVertexRef> =
                        line.args().iter().map(|t| FaceVertexRef::parse(t)).collect();
                    push_face(&refs, &pools.positions, &mut assembly.faces);
                    assembly.seen_face = true;
                }
                "usemtl" => {
                    let material_name = line.remaining(1);
                    assembly.flush();
                    assembly.slot = Some(assembly.materials.len());
                    assembly
                        .materials
                        .push((material_name.clone(), self.resolve_material(&material_name)));
                    assembly.current.material_name = material_name;
                    assembly.material_assigned = true;
                }
                _ => {}
            }
        }
        assembly.flush();

        Ok(ParsedObject {
            primitives: assembly.primitives,
            materials: assembly.materials,
        })
    }

    /// Gather positions, UVs and normals from the whole file. Indices are
    /// file-global, independent of the requested object.
    fn build_pools(&self, geometry: &Document) -> ObjResult<VertexPools> {
        let mut pools = VertexPools::default();
        for (index, line) in geometry.lines().iter().enumerate() {
            match line.directive() {
                "v" => {
                    if line.len() < 4 {
                        return Err(malformed(line, index));
                    }
                    let position = Vec3::new(line.float(1), line.float(2), line.float(3));
                    pools
                        .positions
                        .push(self.transform.transform_position(position));
                }
                "vt" => {
                    if line.len() < 3 {
                        return Err(malformed(line, index));
                    }
                    pools.uvs.push(Vec2::new(line.float(1), 1.0 - line.float(2)));
                }
                "vn" => {
                    if line.len() < 4 {
                        return Err(malformed(line, index));
                    }
                    let normal = Vec3::new(line.float(1), line.float(2), line.float(3));
                    pools.normals.push(self.transform.transform_vector(normal));
                }
                _ => {}
            }
        }
        Ok(pools)
    }

    fn resolve_material(&self, name: &str) -> MaterialDescriptor {
        let resolver = MaterialResolver::new(&self.entry.materials, self.source, self.decoder);
        let mut descriptor = MaterialDescriptor::default();
        resolver.resolve(name, &mut descriptor, self.config);
        descriptor
    }
}

/// First line after `o <name>`, or 0 for the anonymous object.
fn locate_object(geometry: &Document, name: &str) -> ObjResult<usize> {
    if name.is_empty() {
        return Ok(0);
    }
    geometry
        .directives("o")
        .find(|(_, line)| line.remaining(1) == name)
        .map(|(index, _)| index + 1)
        .ok_or_else(|| ObjError::ObjectNotFound(name.to_string()))
}

fn malformed(line: &Line, index: usize) -> ObjError {
    ObjError::MalformedLine {
        directive: line.directive().to_string(),
        line: index + 1,
    }
}

/// In-progress state while walking one object.
struct Assembly<'p> {
    pools: &'p VertexPools,
    faces: Vec<FaceVertexRef>,
    current: Primitive,
    /// Material of `current`, as an index into `materials`.
    slot: Option<usize>,
    material_assigned: bool,
    seen_face: bool,
    primitives: Vec<(Primitive, Option<usize>)>,
    materials: Vec<(String, MaterialDescriptor)>,
}

impl<'p> Assembly<'p> {
    fn new(pools: &'p VertexPools) -> Self {
        Self {
            pools,
            faces: Vec::new(),
            current: Primitive::default(),
            slot: None,
            material_assigned: false,
            seen_face: false,
            primitives: Vec::new(),
            materials: Vec::new(),
        }
    }

    /// Emit the pending faces as a primitive and start a fresh one.
    /// Nothing happens when no faces are pending.
    fn flush(&mut self) {
        if self.faces.is_empty() {
            return;
        }
        let mut primitive = std::mem::take(&mut self.current);
        primitive.append_faces(&self.faces, self.pools);
        self.faces.clear();
        self.material_assigned = false;
        self.primitives.push((primitive, self.slot.take()));
    }

    fn group(&mut self, name: String) {
        if !self.faces.is_empty() {
            self.flush();
        } else if !self.material_assigned {
            self.current = Primitive::default();
            self.slot = None;
        }
        // A `usemtl` right before the group keeps its material.
        self.current.material_name = name;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;
    use crate::texture::TextureData;
    use corelib::vec3;
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            mpsc,
        },
        thread,
        time::Duration,
    };

    /// Records every material build and hands out fresh handles.
    #[derive(Default)]
    struct RecordingMaterials {
        built: parking_lot::Mutex<Vec<(String, MaterialDescriptor)>>,
    }

    impl MaterialBuild for RecordingMaterials {
        fn build_material(
            &self,
            name: &str,
            descriptor: MaterialDescriptor,
            _config: &MaterialsConfig,
        ) -> Option<MaterialHandle> {
            self.built.lock().push((name.to_string(), descriptor));
            Some(MaterialHandle::new(name.to_string()))
        }
    }

    /// Counts how often the geometry blob is fetched.
    struct CountingSource {
        inner: MemorySource,
        fetches: Arc<AtomicUsize>,
    }

    impl ByteSource for CountingSource {
        fn primary_blob(&self) -> Option<Vec<u8>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            self.inner.primary_blob()
        }
        fn load_path(&self, path: &str) -> Option<Vec<u8>> {
            self.inner.load_path(path)
        }
        fn base_name(&self) -> Option<String> {
            self.inner.base_name()
        }
    }

    const SCENE: &str = "\
mtllib scene.mtl
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
vt 0 0
vt 1 0
vt 1 1
vn 0 0 1
o Cube
usemtl red
f 1/1/1 2/2/1 3/3/1
f 1/1/1 3/3/1 4/1/1
g side
f 1 2 3
usemtl blue
f 2 3 4
f 1 2 4
o Plane
f 1 2 3 4
";

    const MTL: &str = "\
newmtl red
Kd 1 0 0
newmtl blue
Kd 0 0 1
d 0.5
";

    fn scene() -> ObjAsset {
        ObjAsset::new(MemorySource::single("scene.obj", SCENE).with_file("scene.mtl", MTL))
    }

    fn load(asset: &ObjAsset, name: &str) -> ObjResult<MeshLod> {
        asset.load_object(name, &MaterialsConfig::default(), &RecordingMaterials::default())
    }

    #[test]
    fn lists_object_names() {
        assert_eq!(scene().object_names().unwrap(), vec!["Cube", "Plane"]);
    }

    #[test]
    fn anonymous_object_when_no_o_directive() {
        let asset = ObjAsset::new(MemorySource::single("t.obj", "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n"));
        assert_eq!(asset.object_names().unwrap(), vec![String::new()]);
        let lod = load(&asset, "").unwrap();
        assert_eq!(lod.primitives.len(), 1);
        assert_eq!(lod.primitives[0].indices, vec![0, 1, 2]);
    }

    #[test]
    fn one_primitive_per_run() {
        let materials = RecordingMaterials::default();
        let lod = scene()
            .load_object("Cube", &MaterialsConfig::default(), &materials)
            .unwrap();
        let runs: Vec<(&str, usize)> = lod
            .primitives
            .iter()
            .map(|p| (p.material_name.as_str(), p.indices.len()))
            .collect();
        assert_eq!(runs, vec![("red", 6), ("side", 3), ("blue", 6)]);

        // The group flushed the red run, so `side` is back on the default material.
        assert!(lod.primitives[0].material.is_some());
        assert!(lod.primitives[1].material.is_none());
        assert!(lod.primitives[2].material.is_some());

        let built = materials.built.lock();
        assert_eq!(built.len(), 2);
        assert_eq!(built[1].0, "blue");
        assert!(built[1].1.translucent);
        assert_eq!(built[1].1.base_color_factor.z, 1.0);
    }

    #[test]
    fn attributes_track_positions() {
        let lod = load(&scene(), "Cube").unwrap();
        for p in &lod.primitives {
            assert_eq!(p.uvs.len(), 1);
            assert_eq!(p.uvs[0].len(), p.positions.len());
            assert_eq!(p.normals.len(), p.positions.len());
        }
        // vt 1 1 is stored flipped.
        assert_eq!(lod.primitives[0].uvs[0][2], Vec2::new(1.0, 0.0));
        // `f 1 2 3` in the side group has no normal indices.
        assert_eq!(lod.primitives[1].normals[0], crate::mesh::UP_NORMAL);
    }

    #[test]
    fn object_stops_at_next_o_after_faces() {
        let lod = load(&scene(), "Cube").unwrap();
        assert_eq!(lod.triangle_count(), 5);
    }

    #[test]
    fn anonymous_load_skips_leading_o() {
        // Empty name starts at line 0; the first `o` comes before any face.
        let lod = load(&scene(), "").unwrap();
        assert_eq!(lod.triangle_count(), 5);
    }

    #[test]
    fn quad_is_triangulated_with_written_winding() {
        let lod = load(&scene(), "Plane").unwrap();
        assert_eq!(lod.primitives.len(), 1);
        let p = &lod.primitives[0];
        assert_eq!(p.indices.len(), 6);
        assert_eq!(p.positions.len(), 6);
        for tri in p.indices.chunks_exact(3) {
            let [a, b, c] = [0, 1, 2].map(|k| p.positions[tri[k] as usize]);
            assert!((b - a).cross(c - a).z > 0.0);
        }
        let mut corners: Vec<[i32; 3]> = p
            .positions
            .iter()
            .map(|v| [v.x as i32, v.y as i32, v.z as i32])
            .collect();
        corners.sort();
        corners.dedup();
        assert_eq!(corners.len(), 4);
    }

    #[test]
    fn usemtl_before_group_survives() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nusemtl red\ng body\nf 1 2 3\n";
        let asset = ObjAsset::new(MemorySource::single("m.obj", src));
        let lod = load(&asset, "").unwrap();
        assert_eq!(lod.primitives.len(), 1);
        assert_eq!(lod.primitives[0].material_name, "body");
        assert!(lod.primitives[0].material.is_some());
    }

    #[test]
    fn consecutive_groups_reset_without_material() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\ng a\ng b\nf 1 2 3\n";
        let asset = ObjAsset::new(MemorySource::single("m.obj", src));
        let lod = load(&asset, "").unwrap();
        assert_eq!(lod.primitives.len(), 1);
        assert_eq!(lod.primitives[0].material_name, "b");
    }

    #[test]
    fn out_of_range_vertex_is_dropped() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 99\nf 1 2 3\n";
        let asset = ObjAsset::new(MemorySource::single("m.obj", src));
        let lod = load(&asset, "").unwrap();
        let p = &lod.primitives[0];
        assert_eq!(p.indices.len(), 5);
        assert_eq!(p.positions[0], vec3(0.0, 0.0, 0.0));
        assert_eq!(p.positions[1], vec3(1.0, 0.0, 0.0));
    }

    #[test]
    fn unknown_object_is_an_error() {
        assert_eq!(
            load(&scene(), "Sphere").unwrap_err(),
            ObjError::ObjectNotFound("Sphere".into())
        );
    }

    #[test]
    fn malformed_lines_fail_the_load_only() {
        let src = "o A\nv 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\no B\nf 1 2\n";
        let asset = ObjAsset::new(MemorySource::single("m.obj", src));
        assert_eq!(
            load(&asset, "B").unwrap_err(),
            ObjError::MalformedLine {
                directive: "f".into(),
                line: 7
            }
        );
        // The shared entry is still usable for other objects.
        assert_eq!(load(&asset, "A").unwrap().triangle_count(), 1);
        assert!(asset.cache().with_entry(&MemorySource::default(), |e| Ok(!e.lods.contains_key("B"))).unwrap());
    }

    #[test]
    fn short_vertex_line_is_malformed() {
        let asset = ObjAsset::new(MemorySource::single("m.obj", "v 1 2\n"));
        assert!(matches!(
            load(&asset, ""),
            Err(ObjError::MalformedLine { ref directive, line: 1 }) if directive == "v"
        ));
        let asset = ObjAsset::new(MemorySource::single("m.obj", "vt 1\n"));
        assert!(matches!(load(&asset, ""), Err(ObjError::MalformedLine { .. })));
    }

    #[test]
    fn repeat_load_is_memoized() {
        let fetches = Arc::new(AtomicUsize::new(0));
        let asset = ObjAsset::new(CountingSource {
            inner: MemorySource::single("scene.obj", SCENE).with_file("scene.mtl", MTL),
            fetches: fetches.clone(),
        });
        let materials = RecordingMaterials::default();
        let config = MaterialsConfig::default();

        let first = asset.load_object("Cube", &config, &materials).unwrap();
        let second = asset.load_object("Cube", &config, &materials).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.primitives[0].material, second.primitives[0].material);
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
        // Materials were only built by the first load.
        assert_eq!(materials.built.lock().len(), 2);

        asset.object_names().unwrap();
        assert_eq!(fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn merge_is_config_gated() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\ng a\nf 1 2 3\ng b\nf 1 2 3\n";
        let asset = ObjAsset::new(MemorySource::single("m.obj", src));
        let config = MaterialsConfig {
            merge_sections_by_material: true,
            ..MaterialsConfig::default()
        };
        let merged = asset
            .load_object("", &config, &RecordingMaterials::default())
            .unwrap();
        assert_eq!(merged.primitives.len(), 1);
        assert_eq!(merged.primitives[0].indices, vec![0, 1, 2, 3, 4, 5]);

        let plain = ObjAsset::new(MemorySource::single("m.obj", src));
        assert_eq!(load(&plain, "").unwrap().primitives.len(), 2);
    }

    #[test]
    fn transform_applies_to_positions_and_normals() {
        let src = "v 1 2 3\nvn 0 1 0\nv 0 0 0\nv 1 0 0\nf 1//1 2//1 3//1\n";
        let asset = ObjAsset::new(MemorySource::single("m.obj", src))
            .with_transform(Transform::from_scale(100.0));
        let lod = load(&asset, "").unwrap();
        assert_eq!(lod.primitives[0].positions[0], vec3(100.0, 200.0, 300.0));
        assert!((lod.primitives[0].normals[0] - Vec3::Y).length() < 1e-6);
    }

    #[test]
    fn loads_from_disk_with_textures() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(
            dir.path().join("crate.obj"),
            "mtllib crate.mtl\nv 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nusemtl wood\nf 1/1 2/1 3/1\n",
        )
        .expect("write obj");
        std::fs::write(
            dir.path().join("crate.mtl"),
            "newmtl wood\nmap_Kd wood.png\nmap_Bump relative/path.png\n",
        )
        .expect("write mtl");
        std::fs::write(dir.path().join("wood.png"), crate::texture::tests::png_bytes(2))
            .expect("write png");

        let asset = ObjAsset::new(crate::source::FileSource::new(dir.path().join("crate.obj")));
        let materials = RecordingMaterials::default();
        let lod = asset
            .load_object("", &MaterialsConfig::default(), &materials)
            .expect("load");
        assert_eq!(lod.triangle_count(), 1);

        let built = materials.built.lock();
        let (_, descriptor) = &built[0];
        assert_eq!(descriptor.base_color_texture.as_ref().map(Vec::len), Some(2));
        assert!(descriptor.normal_texture.is_none());
    }

    #[test]
    fn missing_source_fails() {
        let asset = ObjAsset::new(MemorySource::default());
        assert_eq!(asset.object_names().unwrap_err(), ObjError::SourceNotFound);
        assert_eq!(load(&asset, "").unwrap_err(), ObjError::SourceNotFound);
    }

    /// Loads another object of the same asset from inside every build.
    struct NestedLoadMaterials {
        asset: Arc<ObjAsset>,
        nested: parking_lot::Mutex<Vec<usize>>,
    }

    impl MaterialBuild for NestedLoadMaterials {
        fn build_material(
            &self,
            name: &str,
            _descriptor: MaterialDescriptor,
            config: &MaterialsConfig,
        ) -> Option<MaterialHandle> {
            let plane = self
                .asset
                .load_object("Plane", config, &RecordingMaterials::default())
                .expect("nested load");
            self.nested.lock().push(plane.triangle_count());
            Some(MaterialHandle::new(name.to_string()))
        }
    }

    #[test]
    fn material_build_may_load_from_the_same_asset() {
        let asset = Arc::new(scene());
        let materials = NestedLoadMaterials {
            asset: asset.clone(),
            nested: parking_lot::Mutex::new(Vec::new()),
        };
        let lod = asset
            .load_object("Cube", &MaterialsConfig::default(), &materials)
            .expect("load");
        assert_eq!(lod.triangle_count(), 5);
        assert_eq!(*materials.nested.lock(), vec![2, 2]);
    }

    /// Counts concurrent decodes and optionally parks until released.
    #[derive(Clone)]
    struct ParkingDecoder {
        in_flight: Arc<AtomicUsize>,
        peak: Arc<AtomicUsize>,
        entered: Option<mpsc::SyncSender<()>>,
        release: Option<Arc<parking_lot::Mutex<mpsc::Receiver<()>>>>,
    }

    impl ParkingDecoder {
        fn new() -> Self {
            Self {
                in_flight: Arc::new(AtomicUsize::new(0)),
                peak: Arc::new(AtomicUsize::new(0)),
                entered: None,
                release: None,
            }
        }
    }

    impl TextureDecode for ParkingDecoder {
        fn decode_mips(
            &self,
            _bytes: &[u8],
            _srgb: bool,
            _config: &MaterialsConfig,
        ) -> Option<Vec<TextureData>> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            if let Some(entered) = &self.entered {
                let _ = entered.send(());
            }
            match &self.release {
                Some(release) => {
                    let _ = release.lock().recv_timeout(Duration::from_secs(10));
                }
                None => thread::sleep(Duration::from_millis(50)),
            }
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            None
        }
    }

    const TEXTURED: &str = "\
mtllib t.mtl
v 0 0 0
v 1 0 0
v 0 1 0
o A
usemtl wood
f 1 2 3
o B
usemtl wood
f 1 2 3
";

    fn textured(decoder: ParkingDecoder) -> ObjAsset {
        ObjAsset::new(
            MemorySource::single("t.obj", TEXTURED)
                .with_file("t.mtl", "newmtl wood\nmap_Kd wood.png\n")
                .with_file("wood.png", "not decoded"),
        )
        .with_texture_decoder(decoder)
    }

    #[test]
    fn loads_on_one_asset_parse_one_at_a_time() {
        let decoder = ParkingDecoder::new();
        let asset = textured(decoder.clone());
        thread::scope(|scope| {
            for name in ["A", "B"] {
                let asset = &asset;
                scope.spawn(move || load(asset, name).expect("load"));
            }
        });
        assert_eq!(decoder.peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn loads_on_different_assets_run_concurrently() {
        let (entered_tx, entered_rx) = mpsc::sync_channel(1);
        let (release_tx, release_rx) = mpsc::channel();
        let blocked = textured(ParkingDecoder {
            entered: Some(entered_tx),
            release: Some(Arc::new(parking_lot::Mutex::new(release_rx))),
            ..ParkingDecoder::new()
        });
        let other = textured(ParkingDecoder::new());

        thread::scope(|scope| {
            let worker = scope.spawn(|| load(&blocked, "A"));
            entered_rx
                .recv_timeout(Duration::from_secs(10))
                .expect("first load reached the decoder");
            // `blocked` holds its lock inside the decoder; `other` is unaffected.
            assert_eq!(load(&other, "A").expect("other asset").triangle_count(), 1);
            assert!(!worker.is_finished());
            release_tx.send(()).expect("release");
            assert_eq!(worker.join().expect("join").expect("load").triangle_count(), 1);
        });
    }
}
