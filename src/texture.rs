//! 2D textures and their sampling options.
//!
//! Textures are always uploaded as `Rgba8UnormSrgb`. How an image's alpha
//! channel is treated depends on [`AlphaMode`]: opaque images have alpha
//! forced to 255, transparent ones keep it and are blended by the pipeline.
//!
//! Decoding is split from uploading ([`decode_image`] vs
//! [`Texture::from_image`]) so [`Assets`](crate::Assets) can decode on a
//! loader thread and upload on the render thread.

use std::path::Path;

use crate::color::Color;
use crate::error::RenderError;
use crate::gpu::GpuContext;

/// What happens to UVs outside `0..1`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WrapMode {
    #[default]
    Repeat,
    ClampToEdge,
}

impl From<WrapMode> for wgpu::AddressMode {
    fn from(mode: WrapMode) -> Self {
        match mode {
            WrapMode::Repeat => wgpu::AddressMode::Repeat,
            WrapMode::ClampToEdge => wgpu::AddressMode::ClampToEdge,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FilterMode {
    #[default]
    Linear,
    /// Crisp texels, for pixel art and debug patterns.
    Nearest,
}

impl From<FilterMode> for wgpu::FilterMode {
    fn from(mode: FilterMode) -> Self {
        match mode {
            FilterMode::Linear => wgpu::FilterMode::Linear,
            FilterMode::Nearest => wgpu::FilterMode::Nearest,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlphaMode {
    /// Alpha is discarded and every texel is fully opaque.
    #[default]
    Opaque,
    Transparent,
}

/// Sampler and alpha settings for a texture.
///
/// ```
/// use glint::{FilterMode, TextureOptions, WrapMode};
///
/// let options = TextureOptions::new()
///     .wrap(WrapMode::ClampToEdge)
///     .filter(FilterMode::Nearest)
///     .transparent();
/// assert_eq!(options.filter, FilterMode::Nearest);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TextureOptions {
    pub wrap: WrapMode,
    pub filter: FilterMode,
    pub alpha: AlphaMode,
}

impl TextureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn wrap(mut self, wrap: WrapMode) -> Self {
        self.wrap = wrap;
        self
    }

    pub fn filter(mut self, filter: FilterMode) -> Self {
        self.filter = filter;
        self
    }

    pub fn transparent(mut self) -> Self {
        self.alpha = AlphaMode::Transparent;
        self
    }
}

#[derive(Debug)]
pub struct Texture {
    pub(crate) texture: wgpu::Texture,
    pub(crate) view: wgpu::TextureView,
    pub(crate) sampler: wgpu::Sampler,
    pub width: u32,
    pub height: u32,
}

impl Texture {
    /// Uploads tightly packed RGBA8 pixels.
    pub fn from_rgba(
        gpu: &GpuContext,
        data: &[u8],
        width: u32,
        height: u32,
        label: &str,
        options: TextureOptions,
    ) -> Result<Self, RenderError> {
        use wgpu::util::DeviceExt;

        let resource = || format!("texture `{label}`");
        if width == 0 || height == 0 {
            return Err(RenderError::resource(resource(), "image has no pixels"));
        }
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(RenderError::resource(
                resource(),
                format!("{width}x{height} needs {expected} bytes, got {}", data.len()),
            ));
        }
        let max = gpu.device.limits().max_texture_dimension_2d;
        if width > max || height > max {
            return Err(RenderError::resource(
                resource(),
                format!("{width}x{height} exceeds the device limit of {max}"),
            ));
        }

        let (texture, error) = gpu.scoped(wgpu::ErrorFilter::OutOfMemory, |device| {
            device.create_texture_with_data(
                &gpu.queue,
                &wgpu::TextureDescriptor {
                    label: Some(label),
                    size: wgpu::Extent3d {
                        width,
                        height,
                        depth_or_array_layers: 1,
                    },
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: wgpu::TextureFormat::Rgba8UnormSrgb,
                    usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                    view_formats: &[],
                },
                wgpu::util::TextureDataOrder::LayerMajor,
                data,
            )
        });
        if let Some(error) = error {
            return Err(RenderError::resource(resource(), error));
        }

        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let address_mode = options.wrap.into();
        let filter = options.filter.into();
        let sampler = gpu.device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(&format!("{label} Sampler")),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: filter,
            min_filter: filter,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        Ok(Self {
            texture,
            view,
            sampler,
            width,
            height,
        })
    }

    /// Uploads a decoded image. The alpha policy has already been applied by
    /// [`decode_image`].
    pub fn from_image(
        gpu: &GpuContext,
        image: &image::RgbaImage,
        label: &str,
        options: TextureOptions,
    ) -> Result<Self, RenderError> {
        let (width, height) = image.dimensions();
        Self::from_rgba(gpu, image.as_raw(), width, height, label, options)
    }

    /// Decodes and uploads an image file, blocking the caller.
    /// [`Assets::load_texture`](crate::Assets::load_texture) does the same off
    /// the render thread.
    pub fn from_file(
        gpu: &GpuContext,
        path: impl AsRef<Path>,
        options: TextureOptions,
    ) -> Result<Self, RenderError> {
        let path = path.as_ref();
        let label = path.display().to_string();
        let image = image::open(path)
            .map(|img| decode_image(img, options.alpha))
            .map_err(|e| RenderError::resource(format!("texture `{label}`"), e))?;
        Self::from_image(gpu, &image, &label, options)
    }

    pub fn from_bytes(
        gpu: &GpuContext,
        bytes: &[u8],
        label: &str,
        options: TextureOptions,
    ) -> Result<Self, RenderError> {
        let image = image::load_from_memory(bytes)
            .map(|img| decode_image(img, options.alpha))
            .map_err(|e| RenderError::resource(format!("texture `{label}`"), e))?;
        Self::from_image(gpu, &image, label, options)
    }

    /// A `size` × `size` checkerboard with `cells` squares per side.
    pub fn checkerboard(
        gpu: &GpuContext,
        size: u32,
        cells: u32,
        a: Color,
        b: Color,
        options: TextureOptions,
    ) -> Result<Self, RenderError> {
        let data = checkerboard_pixels(size, cells, a, b);
        Self::from_rgba(gpu, &data, size, size, "Checkerboard Texture", options)
    }

    /// A single-texel texture, handy as a flat material.
    pub fn solid(gpu: &GpuContext, color: Color) -> Result<Self, RenderError> {
        let options = TextureOptions::new().filter(FilterMode::Nearest);
        Self::from_rgba(gpu, &color.to_rgba8(), 1, 1, "Solid Texture", options)
    }

    /// A vertical gradient from `top` (v = 0) to `bottom` (v = 1).
    pub fn gradient(
        gpu: &GpuContext,
        height: u32,
        top: Color,
        bottom: Color,
    ) -> Result<Self, RenderError> {
        let data = gradient_pixels(height, top, bottom);
        let options = TextureOptions::new().wrap(WrapMode::ClampToEdge);
        Self::from_rgba(gpu, &data, 1, height, "Gradient Texture", options)
    }

    pub(crate) fn destroy(&self) {
        self.texture.destroy();
    }
}

/// Converts a decoded image to RGBA8, forcing alpha to 255 for
/// [`AlphaMode::Opaque`].
pub fn decode_image(image: image::DynamicImage, alpha: AlphaMode) -> image::RgbaImage {
    let mut rgba = image.to_rgba8();
    if alpha == AlphaMode::Opaque {
        for pixel in rgba.pixels_mut() {
            pixel.0[3] = 255;
        }
    }
    rgba
}

pub(crate) fn checkerboard_pixels(size: u32, cells: u32, a: Color, b: Color) -> Vec<u8> {
    let cell = (size / cells.max(1)).max(1);
    let (a, b) = (a.to_rgba8(), b.to_rgba8());

    let mut data = Vec::with_capacity((size * size * 4) as usize);
    for y in 0..size {
        for x in 0..size {
            let even = (x / cell + y / cell) % 2 == 0;
            data.extend_from_slice(if even { &a } else { &b });
        }
    }
    data
}

pub(crate) fn gradient_pixels(height: u32, top: Color, bottom: Color) -> Vec<u8> {
    let span = height.saturating_sub(1).max(1) as f32;
    (0..height)
        .flat_map(|y| {
            let t = y as f32 / span;
            Color::rgba(
                top.r + (bottom.r - top.r) * t,
                top.g + (bottom.g - top.g) * t,
                top.b + (bottom.b - top.b) * t,
                top.a + (bottom.a - top.a) * t,
            )
            .to_rgba8()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkerboard_alternates_cells() {
        let data = checkerboard_pixels(4, 2, Color::WHITE, Color::BLACK);
        assert_eq!(data.len(), 4 * 4 * 4);

        let texel = |x: usize, y: usize| &data[(y * 4 + x) * 4..(y * 4 + x) * 4 + 4];
        assert_eq!(texel(0, 0), &[255, 255, 255, 255]);
        assert_eq!(texel(1, 1), &[255, 255, 255, 255]);
        assert_eq!(texel(2, 0), &[0, 0, 0, 255]);
        assert_eq!(texel(0, 3), &[0, 0, 0, 255]);
        assert_eq!(texel(3, 3), &[255, 255, 255, 255]);
    }

    #[test]
    fn gradient_runs_top_to_bottom() {
        let data = gradient_pixels(3, Color::BLACK, Color::WHITE);
        assert_eq!(data.len(), 12);
        assert_eq!(&data[0..4], &[0, 0, 0, 255]);
        assert_eq!(&data[4..8], &[128, 128, 128, 255]);
        assert_eq!(&data[8..12], &[255, 255, 255, 255]);
    }

    #[test]
    fn opaque_decode_discards_alpha() {
        let mut img = image::RgbaImage::new(2, 1);
        img.put_pixel(0, 0, image::Rgba([10, 20, 30, 0]));
        img.put_pixel(1, 0, image::Rgba([40, 50, 60, 128]));
        let dynamic = image::DynamicImage::ImageRgba8(img);

        let opaque = decode_image(dynamic.clone(), AlphaMode::Opaque);
        assert_eq!(opaque.get_pixel(0, 0).0, [10, 20, 30, 255]);
        assert_eq!(opaque.get_pixel(1, 0).0, [40, 50, 60, 255]);

        let transparent = decode_image(dynamic, AlphaMode::Transparent);
        assert_eq!(transparent.get_pixel(0, 0).0, [10, 20, 30, 0]);
    }

    #[test]
    fn ppm_decodes_through_image() {
        let ppm = b"P3\n2 1\n255\n255 0 0  0 0 255\n";
        let img = image::load_from_memory(ppm).unwrap();
        let rgba = decode_image(img, AlphaMode::Opaque);
        assert_eq!(rgba.dimensions(), (2, 1));
        assert_eq!(rgba.get_pixel(1, 0).0, [0, 0, 255, 255]);
    }
}
