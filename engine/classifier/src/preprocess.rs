//! Image → tensor conversion.
//!
//! Images are converted to 3-channel RGB, resized to the model's fixed input
//! resolution with nearest-neighbour sampling, and laid out as a
//! batch-of-one `f32` tensor. Pixel values stay in `[0, 255]`; any rescaling
//! is part of the model graph.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use image::{imageops::FilterType, DynamicImage, ImageReader};
use ndarray::{Array4, ArrayView4};

use crate::classifier::ClassifierError;

/// Memory layout of the input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputLayout {
    /// (batch, height, width, channels), the Keras/TensorFlow convention
    #[default]
    Nhwc,
    /// (batch, channels, height, width), the PyTorch convention
    Nchw,
}

impl FromStr for InputLayout {
    type Err = ClassifierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "nhwc" => Ok(Self::Nhwc),
            "nchw" => Ok(Self::Nchw),
            other => Err(ClassifierError::InvalidInput(format!(
                "Unknown tensor layout '{}', expected 'nhwc' or 'nchw'",
                other
            ))),
        }
    }
}

impl fmt::Display for InputLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nhwc => f.write_str("nhwc"),
            Self::Nchw => f.write_str("nchw"),
        }
    }
}

/// Target resolution and layout of the model input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSpec {
    pub width: u32,
    pub height: u32,
    pub layout: InputLayout,
}

impl InputSpec {
    pub fn new(width: u32, height: u32, layout: InputLayout) -> Self {
        Self {
            width,
            height,
            layout,
        }
    }
}

impl Default for InputSpec {
    fn default() -> Self {
        Self::new(224, 224, InputLayout::Nhwc)
    }
}

/// A preprocessed image with a leading batch dimension of 1.
#[derive(Debug, Clone)]
pub struct ImageTensor {
    data: Array4<f32>,
    layout: InputLayout,
}

impl ImageTensor {
    /// Resize `image` to `spec` and lay it out as a batch-of-one tensor.
    pub fn from_image(image: &DynamicImage, spec: &InputSpec) -> Self {
        let rgb = image
            .resize_exact(spec.width, spec.height, FilterType::Nearest)
            .to_rgb8();
        let (width, height) = (spec.width as usize, spec.height as usize);

        let nhwc = Array4::from_shape_fn((1, height, width, 3), |(_, y, x, c)| {
            rgb.get_pixel(x as u32, y as u32)[c] as f32
        });

        let data = match spec.layout {
            InputLayout::Nhwc => nhwc,
            InputLayout::Nchw => nhwc
                .permuted_axes([0, 3, 1, 2])
                .as_standard_layout()
                .into_owned(),
        };

        Self {
            data,
            layout: spec.layout,
        }
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn batch_size(&self) -> usize {
        self.data.shape()[0]
    }

    pub fn layout(&self) -> InputLayout {
        self.layout
    }

    pub fn view(&self) -> ArrayView4<'_, f32> {
        self.data.view()
    }

    /// Flatten to a row-major buffer in the tensor's logical order.
    pub fn to_vec(&self) -> Vec<f32> {
        self.data.iter().copied().collect()
    }
}

/// Decode the image at `path` and convert it to a model input tensor.
///
/// The format is sniffed from the file contents rather than trusted from the
/// extension.
pub fn load_image_tensor<P: AsRef<Path>>(
    path: P,
    spec: &InputSpec,
) -> Result<ImageTensor, ClassifierError> {
    let image = ImageReader::open(path.as_ref())?
        .with_guessed_format()?
        .decode()?;
    Ok(ImageTensor::from_image(&image, spec))
}
