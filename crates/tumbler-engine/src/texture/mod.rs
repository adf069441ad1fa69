//! Texture loading with a synchronous placeholder and background decode.
//!
//! `CubeTexture::load` returns a usable handle immediately, backed by a
//! 1x1 opaque mid-gray pixel, and decodes the image file on a spawned
//! thread. The render loop calls `poll` once per frame; when the decoded
//! image arrives, the backing texture is swapped in a single step, so any
//! given frame samples either the placeholder or the full image, never a
//! torn intermediate. Dropping the handle disconnects the channel and a
//! late decode result is discarded by the sender.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use image::RgbaImage;
use image::imageops::FilterType;

use crate::error::RenderError;

const PLACEHOLDER_PIXEL: [u8; 4] = [119, 119, 119, 255];

/// Decoded RGBA8 image data.
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// Decodes an image file into tightly packed RGBA8.
pub fn decode_image(path: &Path) -> Result<DecodedImage, String> {
    let img = image::open(path).map_err(|e| e.to_string())?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        width,
        height,
        rgba: rgba.into_raw(),
    })
}

struct PendingDecode {
    path: PathBuf,
    rx: Receiver<Result<DecodedImage, String>>,
}

/// GPU texture for the cube, created at startup and alive until teardown.
pub struct CubeTexture {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    sampler: wgpu::Sampler,
    generation: u64,
    pending: Option<PendingDecode>,
}

impl CubeTexture {
    /// Creates the 1x1 opaque placeholder texture.
    pub fn placeholder(device: &wgpu::Device, queue: &wgpu::Queue) -> Self {
        let (texture, view, sampler) = upload(
            device,
            queue,
            &DecodedImage {
                width: 1,
                height: 1,
                rgba: PLACEHOLDER_PIXEL.to_vec(),
            },
        );
        Self {
            texture,
            view,
            sampler,
            generation: 0,
            pending: None,
        }
    }

    /// Returns a placeholder-backed handle immediately and starts decoding
    /// `path` in the background.
    pub fn load(device: &wgpu::Device, queue: &wgpu::Queue, path: PathBuf) -> Self {
        let mut this = Self::placeholder(device, queue);

        let (tx, rx) = mpsc::channel();
        let decode_path = path.clone();
        thread::spawn(move || {
            // A failed send means the texture handle is already gone.
            let _ = tx.send(decode_image(&decode_path));
        });

        this.pending = Some(PendingDecode { path, rx });
        this
    }

    /// Creates a handle directly from decoded image data.
    pub fn from_image(device: &wgpu::Device, queue: &wgpu::Queue, image: &DecodedImage) -> Self {
        let (texture, view, sampler) = upload(device, queue, image);
        Self {
            texture,
            view,
            sampler,
            generation: 0,
            pending: None,
        }
    }

    /// Observes decode completion without blocking. Call once per frame.
    ///
    /// On success the backing texture is replaced and the generation
    /// advances; on decode failure the diagnostic is logged once and the
    /// placeholder stays bound indefinitely.
    pub fn poll(&mut self, device: &wgpu::Device, queue: &wgpu::Queue) {
        let Some(pending) = &self.pending else {
            return;
        };

        match pending.rx.try_recv() {
            Ok(Ok(image)) => {
                let (texture, view, sampler) = upload(device, queue, &image);
                self.texture = texture;
                self.view = view;
                self.sampler = sampler;
                self.generation += 1;
                self.pending = None;
            }
            Ok(Err(log)) => {
                let err = RenderError::TextureDecodeFailed {
                    path: pending.path.clone(),
                    log,
                };
                log::warn!("{err}; continuing with the placeholder texture");
                self.pending = None;
            }
            Err(TryRecvError::Empty) => {}
            Err(TryRecvError::Disconnected) => {
                self.pending = None;
            }
        }
    }

    /// True while a background decode has neither landed nor failed.
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Monotonic counter advanced on every backing-store swap. Callers
    /// caching bind groups key them on this.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    pub fn sampler(&self) -> &wgpu::Sampler {
        &self.sampler
    }

    pub fn size(&self) -> (u32, u32) {
        (self.texture.width(), self.texture.height())
    }
}

/// Uploads RGBA8 data as a 2D texture.
///
/// Power-of-two images get a full CPU-built mip chain and repeat sampling;
/// anything else gets a single level with clamp-to-edge sampling, since
/// NPOT sizes support neither mipmaps nor wrapping in the baseline profile
/// this renderer targets.
fn upload(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    image: &DecodedImage,
) -> (wgpu::Texture, wgpu::TextureView, wgpu::Sampler) {
    let pot = image.width.is_power_of_two() && image.height.is_power_of_two();
    let mip_level_count = if pot {
        32 - image.width.max(image.height).leading_zeros()
    } else {
        1
    };

    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("tumbler cube texture"),
        size: wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        },
        mip_level_count,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: wgpu::TextureFormat::Rgba8UnormSrgb,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });

    write_level(queue, &texture, 0, image.width, image.height, &image.rgba);

    if mip_level_count > 1 {
        for (level, mip) in mip_chain(image).iter().enumerate() {
            write_level(
                queue,
                &texture,
                level as u32 + 1,
                mip.width(),
                mip.height(),
                mip.as_raw(),
            );
        }
    }

    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

    let address_mode = if pot {
        wgpu::AddressMode::Repeat
    } else {
        wgpu::AddressMode::ClampToEdge
    };
    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("tumbler cube sampler"),
        address_mode_u: address_mode,
        address_mode_v: address_mode,
        address_mode_w: address_mode,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: if pot {
            wgpu::MipmapFilterMode::Linear
        } else {
            wgpu::MipmapFilterMode::Nearest
        },
        ..Default::default()
    });

    (texture, view, sampler)
}

fn write_level(
    queue: &wgpu::Queue,
    texture: &wgpu::Texture,
    mip_level: u32,
    width: u32,
    height: u32,
    rgba: &[u8],
) {
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture,
            mip_level,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        rgba,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(4 * width),
            rows_per_image: Some(height),
        },
        wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
    );
}

/// Builds the reduced mip levels (base level excluded) by successive
/// halving down to 1x1.
fn mip_chain(image: &DecodedImage) -> Vec<RgbaImage> {
    let base = RgbaImage::from_raw(image.width, image.height, image.rgba.clone())
        .expect("decoded image dimensions match its byte length");

    let mut levels = Vec::new();
    let (mut w, mut h) = (image.width, image.height);
    let mut prev = base;
    while w > 1 || h > 1 {
        w = (w / 2).max(1);
        h = (h / 2).max(1);
        let next = image::imageops::resize(&prev, w, h, FilterType::Triangle);
        levels.push(next.clone());
        prev = next;
    }
    levels
}
