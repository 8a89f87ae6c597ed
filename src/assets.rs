//! Mesh and texture storage with background loading.
//!
//! Every mesh and texture lives in a slot addressed by a typed handle
//! ([`MeshId`], [`TextureId`]). A slot is a [`Resource`]: `Loading` until its
//! data arrives, then `Ready` or `Failed`. Handles are handed out immediately,
//! so a scene can be assembled before its files have been read.
//!
//! File loads run on short-lived worker threads that only do CPU work (image
//! decoding, OBJ parsing) and send the result back over a channel.
//! [`Assets::poll`] drains that channel once per frame on the render thread and
//! uploads whatever finished. The scene skips objects whose mesh or texture is
//! not `Ready` yet.

use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use crate::geometry::RawGeometry;
use crate::gpu::GpuContext;
use crate::mesh::Mesh;
use crate::texture::{Texture, TextureOptions, decode_image};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MeshId(pub(crate) usize);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub(crate) usize);

/// Lifecycle of an asynchronously provided value.
#[derive(Debug)]
pub enum Resource<T> {
    Loading,
    Ready(T),
    Failed(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResourceStatus {
    Loading,
    Ready,
    Failed,
}

impl<T> Resource<T> {
    pub fn status(&self) -> ResourceStatus {
        match self {
            Resource::Loading => ResourceStatus::Loading,
            Resource::Ready(_) => ResourceStatus::Ready,
            Resource::Failed(_) => ResourceStatus::Failed,
        }
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            Resource::Ready(value) => Some(value),
            _ => None,
        }
    }
}

/// Append-only list of resources. Indices are stable for the lifetime of the
/// store.
#[derive(Debug)]
pub(crate) struct Slots<T> {
    items: Vec<Resource<T>>,
}

impl<T> Default for Slots<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> Slots<T> {
    pub(crate) fn insert(&mut self, resource: Resource<T>) -> usize {
        self.items.push(resource);
        self.items.len() - 1
    }

    /// Settles a `Loading` slot. Returns `false` if the slot does not exist or
    /// was already settled.
    pub(crate) fn resolve(&mut self, index: usize, resource: Resource<T>) -> bool {
        match self.items.get_mut(index) {
            Some(slot) if matches!(slot, Resource::Loading) => {
                *slot = resource;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Resource<T>> {
        self.items.get(index)
    }

    pub(crate) fn ready(&self, index: usize) -> Option<&T> {
        self.get(index).and_then(Resource::ready)
    }

    pub(crate) fn count(&self, status: ResourceStatus) -> usize {
        self.items.iter().filter(|r| r.status() == status).count()
    }

    /// Empties the store, yielding every ready value.
    pub(crate) fn drain_ready(&mut self) -> impl Iterator<Item = T> + '_ {
        self.items.drain(..).filter_map(|r| match r {
            Resource::Ready(value) => Some(value),
            _ => None,
        })
    }
}

/// Output of a worker thread, uploaded by [`Assets::poll`].
enum Completed {
    Texture {
        id: TextureId,
        label: String,
        options: TextureOptions,
        result: Result<image::RgbaImage, String>,
    },
    Geometry {
        id: MeshId,
        texture: TextureId,
        label: String,
        result: Result<RawGeometry, String>,
    },
}

struct Loader {
    sender: Sender<Completed>,
    receiver: Receiver<Completed>,
}

impl Loader {
    fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    fn spawn(&self, job: impl FnOnce() -> Completed + Send + 'static) -> Result<(), String> {
        let sender = self.sender.clone();
        thread::Builder::new()
            .name("glint-loader".into())
            .spawn(move || {
                // The receiver only disappears during shutdown.
                let _ = sender.send(job());
            })
            .map(|_| ())
            .map_err(|e| format!("could not start loader thread: {e}"))
    }
}

pub struct Assets {
    meshes: Slots<Mesh>,
    textures: Slots<Texture>,
    loader: Loader,
}

impl Default for Assets {
    fn default() -> Self {
        Self::new()
    }
}

impl Assets {
    pub fn new() -> Self {
        Self {
            meshes: Slots::default(),
            textures: Slots::default(),
            loader: Loader::new(),
        }
    }

    pub fn add_mesh(&mut self, mesh: Mesh) -> MeshId {
        MeshId(self.meshes.insert(Resource::Ready(mesh)))
    }

    pub fn add_texture(&mut self, texture: Texture) -> TextureId {
        TextureId(self.textures.insert(Resource::Ready(texture)))
    }

    /// Starts decoding an image file in the background.
    pub fn load_texture(&mut self, path: impl AsRef<Path>, options: TextureOptions) -> TextureId {
        let path = path.as_ref().to_path_buf();
        let id = TextureId(self.textures.insert(Resource::Loading));
        let label = path.display().to_string();
        log::debug!("loading texture {label}");

        let spawned = self.loader.spawn(move || {
            let result = image::open(&path)
                .map(|img| decode_image(img, options.alpha))
                .map_err(|e| e.to_string());
            Completed::Texture {
                id,
                label,
                options,
                result,
            }
        });
        if let Err(reason) = spawned {
            log::warn!("{reason}");
            self.textures.resolve(id.0, Resource::Failed(reason));
        }
        id
    }

    /// Starts parsing an OBJ file in the background. The mesh is drawn with
    /// `texture` once both are ready.
    pub fn load_obj(&mut self, path: impl AsRef<Path>, texture: TextureId) -> MeshId {
        self.load_obj_with(path, texture, |_| {})
    }

    /// Like [`load_obj`](Self::load_obj), running `prepare` on the parsed
    /// geometry (on the loader thread) before it is uploaded.
    ///
    /// ```ignore
    /// let model = assets.load_obj_with("assets/pyramid.obj", tex, |g| {
    ///     g.recenter();
    ///     g.normalize();
    /// });
    /// ```
    pub fn load_obj_with(
        &mut self,
        path: impl AsRef<Path>,
        texture: TextureId,
        prepare: impl FnOnce(&mut RawGeometry) + Send + 'static,
    ) -> MeshId {
        let path = path.as_ref().to_path_buf();
        let id = MeshId(self.meshes.insert(Resource::Loading));
        let label = path.display().to_string();
        log::debug!("loading model {label}");

        let spawned = self.loader.spawn(move || {
            let result = RawGeometry::from_file(&path)
                .map(|mut geometry| {
                    prepare(&mut geometry);
                    geometry
                })
                .map_err(|e| e.to_string());
            Completed::Geometry {
                id,
                texture,
                label,
                result,
            }
        });
        if let Err(reason) = spawned {
            log::warn!("{reason}");
            self.meshes.resolve(id.0, Resource::Failed(reason));
        }
        id
    }

    /// Uploads every load that finished since the last call. Never blocks.
    /// Returns how many slots were settled.
    pub fn poll(&mut self, gpu: &GpuContext) -> usize {
        let completed: Vec<Completed> = self.loader.receiver.try_iter().collect();
        let settled = completed.len();

        for done in completed {
            match done {
                Completed::Texture {
                    id,
                    label,
                    options,
                    result,
                } => {
                    let resource = result
                        .and_then(|image| {
                            Texture::from_image(gpu, &image, &label, options)
                                .map_err(|e| e.to_string())
                        })
                        .map_or_else(Resource::Failed, Resource::Ready);
                    Self::report("texture", &label, &resource);
                    self.textures.resolve(id.0, resource);
                }
                Completed::Geometry {
                    id,
                    texture,
                    label,
                    result,
                } => {
                    let resource = result
                        .and_then(|geometry| {
                            Mesh::create(gpu, &geometry, texture).map_err(|e| e.to_string())
                        })
                        .map_or_else(Resource::Failed, Resource::Ready);
                    Self::report("model", &label, &resource);
                    self.meshes.resolve(id.0, resource);
                }
            }
        }
        settled
    }

    fn report<T>(kind: &str, label: &str, resource: &Resource<T>) {
        match resource {
            Resource::Failed(reason) => log::warn!("failed to load {kind} {label}: {reason}"),
            _ => log::info!("loaded {kind} {label}"),
        }
    }

    pub fn mesh(&self, id: MeshId) -> Option<&Mesh> {
        self.meshes.ready(id.0)
    }

    pub fn texture(&self, id: TextureId) -> Option<&Texture> {
        self.textures.ready(id.0)
    }

    pub fn mesh_status(&self, id: MeshId) -> Option<ResourceStatus> {
        self.meshes.get(id.0).map(Resource::status)
    }

    pub fn texture_status(&self, id: TextureId) -> Option<ResourceStatus> {
        self.textures.get(id.0).map(Resource::status)
    }

    /// Number of loads still in flight.
    pub fn pending(&self) -> usize {
        self.meshes.count(ResourceStatus::Loading) + self.textures.count(ResourceStatus::Loading)
    }

    /// Destroys every GPU buffer and texture. Handles are invalid afterwards.
    pub fn release(&mut self) {
        let mut meshes = 0;
        for mesh in self.meshes.drain_ready() {
            mesh.destroy();
            meshes += 1;
        }
        let mut textures = 0;
        for texture in self.textures.drain_ready() {
            texture.destroy();
            textures += 1;
        }
        log::info!("released {meshes} meshes and {textures} textures");
    }
}

/// Readiness queries made while staging a frame.
pub(crate) trait Residency {
    /// The texture a mesh draws with, once the mesh is uploaded.
    fn mesh_texture(&self, id: MeshId) -> Option<TextureId>;

    fn texture_ready(&self, id: TextureId) -> bool;
}

impl Residency for Assets {
    fn mesh_texture(&self, id: MeshId) -> Option<TextureId> {
        self.mesh(id).map(Mesh::texture)
    }

    fn texture_ready(&self, id: TextureId) -> bool {
        self.texture(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn slots_settle_once() {
        let mut slots: Slots<u32> = Slots::default();
        let ready = slots.insert(Resource::Ready(7));
        let loading = slots.insert(Resource::Loading);

        assert_eq!(slots.ready(ready), Some(&7));
        assert_eq!(slots.ready(loading), None);
        assert_eq!(slots.count(ResourceStatus::Loading), 1);

        assert!(slots.resolve(loading, Resource::Failed("missing".into())));
        assert!(!slots.resolve(loading, Resource::Ready(1)));
        assert!(!slots.resolve(ready, Resource::Ready(1)));
        assert!(!slots.resolve(9, Resource::Ready(1)));

        assert_eq!(slots.get(loading).map(Resource::status), Some(ResourceStatus::Failed));
        assert_eq!(slots.drain_ready().collect::<Vec<_>>(), vec![7]);
        assert!(slots.get(ready).is_none());
    }

    fn wait(assets: &Assets) -> Completed {
        assets
            .loader
            .receiver
            .recv_timeout(Duration::from_secs(10))
            .expect("loader thread did not finish")
    }

    #[test]
    fn obj_loads_in_background() {
        let path = std::env::temp_dir().join(format!("glint-assets-{}.obj", std::process::id()));
        std::fs::write(&path, "v 0 0 0\nv 2 0 0\nv 0 2 0\nf 1 2 3\n").unwrap();

        let mut assets = Assets::new();
        let texture = TextureId(0);
        let id = assets.load_obj_with(&path, texture, |g| g.normalize());
        assert_eq!(assets.mesh_status(id), Some(ResourceStatus::Loading));
        assert_eq!(assets.pending(), 1);
        assert!(assets.mesh(id).is_none());
        assert_eq!(assets.mesh_texture(id), None);

        match wait(&assets) {
            Completed::Geometry {
                id: done,
                texture: t,
                result,
                ..
            } => {
                assert_eq!(done, id);
                assert_eq!(t, texture);
                let geometry = result.unwrap();
                assert_eq!(geometry.indices, vec![0, 1, 2]);
                assert_eq!(geometry.size().x, 1.0);
            }
            Completed::Texture { .. } => panic!("expected geometry"),
        }
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn missing_texture_reports_failure() {
        let mut assets = Assets::new();
        let id = assets.load_texture("/definitely/not/here.png", TextureOptions::new());
        assert_eq!(assets.texture_status(id), Some(ResourceStatus::Loading));

        match wait(&assets) {
            Completed::Texture { id: done, result, .. } => {
                assert_eq!(done, id);
                assert!(result.is_err());
            }
            Completed::Geometry { .. } => panic!("expected texture"),
        }
    }

    #[test]
    fn unknown_handles_have_no_status() {
        let assets = Assets::new();
        assert_eq!(assets.mesh_status(MeshId(3)), None);
        assert_eq!(assets.texture_status(TextureId(0)), None);
    }
}
