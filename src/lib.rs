pub mod compress;
pub mod config;
pub mod download;
pub mod error;
pub mod generation;
pub mod provider;
pub mod server;
pub mod tools;
pub mod utils;

pub use config::{EnvConfig, ProviderConfig};
pub use download::{
    ArtifactDownloader, DownloadPolicy, DownloadReport, DynImageFetcher, FetchedImage,
    HttpFetcher, ImageFetcher,
};
pub use error::{ArkImageError, DownloadFailure, Result};
pub use generation::{
    DownloadedArtifact, GeneratedImage, GenerationRequest, GenerationResult, ImageDescriptor,
    ImagePipeline, ImageSize, ParameterValidator, ResponseAssembler, SequentialMode,
};
pub use provider::{ArkClient, DynImageProvider, ImageProvider};
pub use server::ToolServer;
pub use tools::{
    default_registry, CompressImagesTool, GenerateImagesTool, Tool, ToolInvocation, ToolManifest,
    ToolManifestBuilder, ToolOutput, ToolRegistry,
};
pub use utils::{logging, validation};
