//! Texture decoding for material maps.
//! Images are decoded to RGBA8, optionally with a full mip chain.

use image::{RgbaImage, imageops::FilterType};

use crate::material::MaterialsConfig;

/// One decoded mip level.
#[derive(Clone, Debug, PartialEq)]
pub struct TextureData {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
}

/// Supported texture formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    /// Linear data (normal maps).
    Rgba8,
    /// Color data, sRGB encoded.
    Rgba8Srgb,
}

impl TextureFormat {
    pub fn from_srgb(srgb: bool) -> Self {
        if srgb { Self::Rgba8Srgb } else { Self::Rgba8 }
    }
}

/// Turns encoded image bytes into a mip chain (level 0 first).
pub trait TextureDecode: Send + Sync {
    fn decode_mips(
        &self,
        bytes: &[u8],
        srgb: bool,
        config: &MaterialsConfig,
    ) -> Option<Vec<TextureData>>;
}

/// [`TextureDecode`] backed by the `image` crate (PNG and JPEG).
#[derive(Clone, Copy, Debug, Default)]
pub struct ImageDecoder;

impl ImageDecoder {
    /// Decode bytes into a single RGBA8 image.
    pub fn decode_rgba8(bytes: &[u8]) -> anyhow::Result<RgbaImage> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| anyhow::anyhow!("Failed to decode image: {}", e))?;
        Ok(img.to_rgba8())
    }

    /// Halve the image until 1x1, level 0 first.
    fn mip_chain(base: RgbaImage, srgb: bool, generate: bool) -> Vec<TextureData> {
        let mut levels = Vec::new();
        let mut current = base;
        loop {
            let (width, height) = current.dimensions();
            let next = (generate && (width > 1 || height > 1)).then(|| {
                image::imageops::resize(
                    &current,
                    (width / 2).max(1),
                    (height / 2).max(1),
                    FilterType::Triangle,
                )
            });
            levels.push(TextureData {
                data: current.into_raw(),
                width,
                height,
                format: TextureFormat::from_srgb(srgb),
            });
            match next {
                Some(smaller) => current = smaller,
                None => break,
            }
        }
        levels
    }
}

impl TextureDecode for ImageDecoder {
    fn decode_mips(
        &self,
        bytes: &[u8],
        srgb: bool,
        config: &MaterialsConfig,
    ) -> Option<Vec<TextureData>> {
        let rgba = match Self::decode_rgba8(bytes) {
            Ok(rgba) => rgba,
            Err(err) => {
                log::warn!("{err}");
                return None;
            }
        };
        let (width, height) = rgba.dimensions();
        if width == 0 || height == 0 {
            return None;
        }
        log::info!("Decoded texture {}x{} (srgb={})", width, height, srgb);
        Some(Self::mip_chain(rgba, srgb, config.generate_mips))
    }
}
