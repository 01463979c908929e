//! Image scoring for a single-output convolutional classifier.
//!
//! This crate turns an image on disk into a batched input tensor and runs it
//! through a pre-built model. The numeric work belongs to ONNX Runtime; this
//! crate only adapts images to the tensor the model expects and reads back
//! the one score it produces.
//!
//! # Usage
//!
//! ```rust,ignore
//! use classifier::{load_image_tensor, Classifier, InputSpec, OnnxClassifier};
//!
//! let model = OnnxClassifier::load("./models/model.onnx", None, 1)?;
//! let spec = InputSpec::default(); // 224x224, NHWC
//! let tensor = load_image_tensor("./data/cat.png", &spec)?;
//! let score = model.classify(&tensor)?;
//! println!("score: {score}");
//! ```
//!
//! # Classifiers
//!
//! - [`OnnxClassifier`]: ONNX Runtime session (requires the `onnx` feature)
//! - [`ConstantClassifier`]: returns a fixed score (for testing)

pub mod classifier;
pub mod preprocess;

#[cfg(feature = "onnx")]
pub mod onnx;

pub use classifier::{Classifier, ClassifierError, ConstantClassifier};
pub use preprocess::{load_image_tensor, ImageTensor, InputLayout, InputSpec};

#[cfg(feature = "onnx")]
pub use onnx::OnnxClassifier;
