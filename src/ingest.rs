//! Image ingestion: uploaded bytes to model input tensor
//!
//! The classifier expects a `(1, size, size, 3)` NHWC tensor of raw 0-255
//! channel values. Uploads of any other size are resized explicitly (or
//! rejected under [`ResizePolicy::Strict`]); nothing is ever reinterpreted in
//! place.

use image::{imageops::FilterType, DynamicImage, ImageError, ImageFormat};
use serde::{Deserialize, Serialize};

use crate::utils::error::{DiagnosisError, InvalidImageError};

/// Default model input edge length
pub const DEFAULT_IMAGE_SIZE: u32 = 256;

/// Channels per pixel in the model input
pub const CHANNELS: usize = 3;

/// How an upload whose dimensions differ from the model input is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizePolicy {
    /// Nearest-neighbour resize
    Nearest,
    /// Bilinear (triangle filter) resize
    #[default]
    Bilinear,
    /// Catmull-Rom cubic resize
    CatmullRom,
    /// Lanczos resize with a window of 3
    Lanczos3,
    /// Reject uploads that are not already the model input size
    Strict,
}

impl ResizePolicy {
    /// Interpolation filter, or `None` when resizing is not allowed
    pub fn filter(self) -> Option<FilterType> {
        match self {
            ResizePolicy::Nearest => Some(FilterType::Nearest),
            ResizePolicy::Bilinear => Some(FilterType::Triangle),
            ResizePolicy::CatmullRom => Some(FilterType::CatmullRom),
            ResizePolicy::Lanczos3 => Some(FilterType::Lanczos3),
            ResizePolicy::Strict => None,
        }
    }
}

/// Channel layout inside each pixel of the tensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    /// Blue, green, red: the layout the classifier was trained on
    #[default]
    Bgr,
    Rgb,
}

/// Image preprocessing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Edge length of the square model input
    pub image_size: u32,
    pub resize: ResizePolicy,
    pub channel_order: ChannelOrder,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            image_size: DEFAULT_IMAGE_SIZE,
            resize: ResizePolicy::default(),
            channel_order: ChannelOrder::default(),
        }
    }
}

/// Bytes of one uploaded file, alive for a single request
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub bytes: Vec<u8>,
    pub file_name: Option<String>,
}

impl UploadedImage {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            file_name: None,
        }
    }

    pub fn with_file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    /// MIME type sniffed from the content, if the format is recognized
    pub fn mime_type(&self) -> Option<&'static str> {
        image::guess_format(&self.bytes)
            .ok()
            .map(|format| format.to_mime_type())
    }
}

/// Model input tensor: NHWC with a batch of one
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    data: Vec<f32>,
    size: u32,
}

impl ImageTensor {
    /// Build from raw NHWC values; the length must be `size * size * 3`
    pub fn from_raw(data: Vec<f32>, size: u32) -> Result<Self, DiagnosisError> {
        let expected = size as usize * size as usize * CHANNELS;
        if data.len() != expected {
            return Err(DiagnosisError::Inference(format!(
                "tensor holds {} values, expected {}",
                data.len(),
                expected
            )));
        }
        Ok(Self { data, size })
    }

    /// A tensor of zeros, used for model warm-up
    pub fn zeros(size: u32) -> Self {
        Self {
            data: vec![0.0; size as usize * size as usize * CHANNELS],
            size,
        }
    }

    pub fn shape(&self) -> [usize; 4] {
        [1, self.size as usize, self.size as usize, CHANNELS]
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }
}

/// Result of ingesting one upload
#[derive(Debug, Clone)]
pub struct PreparedImage {
    pub tensor: ImageTensor,
    pub original_width: u32,
    pub original_height: u32,
    pub resized: bool,
}

/// Decode uploaded bytes into an image
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, InvalidImageError> {
    if bytes.is_empty() {
        return Err(InvalidImageError::Empty);
    }

    let format = image::guess_format(bytes).map_err(|_| InvalidImageError::UnsupportedFormat)?;

    image::load_from_memory_with_format(bytes, format).map_err(|e| match e {
        ImageError::Unsupported(_) => InvalidImageError::UnsupportedFormat,
        other => InvalidImageError::Decode(other.to_string()),
    })
}

/// Resize (or validate) and lay out an image as the model input tensor
pub fn prepare_tensor(
    image: &DynamicImage,
    config: &IngestConfig,
) -> Result<ImageTensor, InvalidImageError> {
    let (width, height) = (image.width(), image.height());
    if width == 0 || height == 0 {
        return Err(InvalidImageError::ZeroSized { width, height });
    }

    let size = config.image_size;
    let rgb = if width == size && height == size {
        image.to_rgb8()
    } else {
        match config.resize.filter() {
            Some(filter) => image.resize_exact(size, size, filter).to_rgb8(),
            None => {
                return Err(InvalidImageError::DimensionMismatch {
                    expected: size,
                    width,
                    height,
                })
            }
        }
    };

    let mut data = Vec::with_capacity(size as usize * size as usize * CHANNELS);
    for pixel in rgb.pixels() {
        let [r, g, b] = pixel.0;
        let ordered = match config.channel_order {
            ChannelOrder::Bgr => [b, g, r],
            ChannelOrder::Rgb => [r, g, b],
        };
        data.extend(ordered.iter().map(|&v| v as f32));
    }

    // resize_exact guarantees size * size pixels
    Ok(ImageTensor { data, size })
}

/// Decode and prepare in one step
pub fn ingest(bytes: &[u8], config: &IngestConfig) -> Result<PreparedImage, InvalidImageError> {
    let image = decode_image(bytes)?;
    let tensor = prepare_tensor(&image, config)?;
    let resized = image.width() != config.image_size || image.height() != config.image_size;

    Ok(PreparedImage {
        tensor,
        original_width: image.width(),
        original_height: image.height(),
        resized,
    })
}

/// Encode an image in memory; used for fixtures and previews
pub fn encode_image(image: &DynamicImage, format: ImageFormat) -> Result<Vec<u8>, InvalidImageError> {
    let mut buffer = std::io::Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, format)
        .map_err(|e| InvalidImageError::Decode(e.to_string()))?;
    Ok(buffer.into_inner())
}
