pub mod assembler;
pub mod pipeline;
pub mod reference;
pub mod types;
pub mod validator;

pub use assembler::ResponseAssembler;
pub use pipeline::ImagePipeline;
pub use types::{
    DownloadedArtifact, GeneratedImage, GenerationRequest, GenerationResult, ImageDescriptor,
    ImageSize, SequentialMode, SizePreset,
};
pub use validator::ParameterValidator;
