// Transform module for AI image editing providers

pub mod openai;
pub mod prepare;

use crate::errors::TransformError;
use async_trait::async_trait;

pub use openai::OpenAiImageEditor;
pub use prepare::{prepare_edit_inputs, EditInputs};

/// ImageTransformer turns source image bytes plus an instruction into edited bytes
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageTransformer: Send + Sync {
    /// Apply `prompt` to `image` and return the edited image as PNG
    async fn transform(&self, image: &[u8], prompt: &str) -> Result<Vec<u8>, TransformError>;
}
