use std::path::PathBuf;
use std::sync::Arc;

use arkimage::compress::compress_path;
use arkimage::tools::{builtin_manifests, CompressRequest};
use arkimage::utils::LoggingConfig;
use arkimage::{
    default_registry, CompressImagesTool, DownloadPolicy, ImagePipeline, ProviderConfig,
    ToolServer,
};
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(
    name = "arkimage",
    version,
    about = "Doubao Seedream image generation tool server",
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve `generate_images` and `compress_images` over stdio (JSON-RPC)
    Serve {
        #[command(flatten)]
        provider: ProviderArgs,
    },
    /// Generate images once and print the result as JSON
    Generate {
        #[command(flatten)]
        provider: ProviderArgs,
        #[arg(long)]
        prompt: String,
        #[arg(long)]
        num_images: Option<u32>,
        #[arg(long)]
        size: Option<String>,
        #[arg(long)]
        watermark: bool,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Reference image, repeat for several
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        /// `auto` or `disabled`
        #[arg(long)]
        sequential: Option<String>,
        #[arg(long)]
        max_images: Option<u32>,
    },
    /// Compress and resize a file or a directory of images
    Compress {
        input: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 1920)]
        max_width: i64,
        #[arg(long, default_value_t = 1080)]
        max_height: i64,
        #[arg(long, default_value_t = 85)]
        quality: i64,
        #[arg(long, default_value = "JPEG")]
        format: String,
    },
    /// Print the tool manifests
    Tools {
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },
}

#[derive(Args)]
struct ProviderArgs {
    /// Falls back to ARK_API_KEY
    #[arg(long)]
    api_key: Option<String>,
    /// Falls back to ARK_BASE_URL
    #[arg(long)]
    base_url: Option<String>,
    /// Falls back to ARK_MODEL_ID
    #[arg(long)]
    model: Option<String>,
    /// Fail the whole call when any image cannot be saved
    #[arg(long)]
    all_or_nothing: bool,
}

impl ProviderArgs {
    fn pipeline(self) -> anyhow::Result<ImagePipeline> {
        let mut config = match self.api_key {
            Some(key) => ProviderConfig::new(key),
            None => ProviderConfig::from_env()?,
        };
        if let Some(base_url) = self.base_url {
            config = config.with_base_url(base_url);
        }
        if let Some(model) = self.model {
            config = config.with_model(model);
        }
        let policy = if self.all_or_nothing {
            DownloadPolicy::AllOrNothing
        } else {
            DownloadPolicy::BestEffort
        };
        Ok(ImagePipeline::from_config(config, policy)?)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    LoggingConfig::init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { provider } => {
            let pipeline = Arc::new(provider.pipeline()?);
            let server = ToolServer::new(default_registry(pipeline)?);
            server.serve_stdio().await?;
        }
        Command::Generate {
            provider,
            prompt,
            num_images,
            size,
            watermark,
            output_dir,
            images,
            sequential,
            max_images,
        } => {
            let mut args = Map::new();
            args.insert("prompt".into(), json!(prompt));
            args.insert("watermark".into(), json!(watermark));
            if let Some(n) = num_images {
                args.insert("num_images".into(), json!(n));
            }
            if let Some(size) = size {
                args.insert("size".into(), json!(size));
            }
            if let Some(dir) = output_dir {
                args.insert("output_dir".into(), json!(dir.to_string_lossy()));
            }
            if !images.is_empty() {
                let paths: Vec<String> = images
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect();
                args.insert("reference_image_paths".into(), json!(paths));
            }
            if let Some(mode) = sequential {
                args.insert("sequential_mode".into(), json!(mode));
            }
            if let Some(max) = max_images {
                args.insert("max_images".into(), json!(max));
            }

            let pipeline = provider.pipeline()?;
            let result = pipeline.generate_images(&Value::Object(args)).await?;
            eprintln!("{}", result.summary());
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Compress {
            input,
            output,
            max_width,
            max_height,
            quality,
            format,
        } => {
            let mut args = json!({
                "input_path": input.to_string_lossy(),
                "max_width": max_width,
                "max_height": max_height,
                "quality": quality,
                "format": format
            });
            if let Some(output) = output {
                args["output_path"] = json!(output.to_string_lossy());
            }
            let CompressRequest {
                input,
                output,
                options,
            } = CompressImagesTool::parse(args)?;
            let report = compress_path(&input, output.as_deref(), &options)?;
            println!("{}", report.summary());
        }
        Command::Tools { compact } => {
            let manifests = json!(builtin_manifests());
            let content = if compact {
                serde_json::to_string(&manifests)?
            } else {
                serde_json::to_string_pretty(&manifests)?
            };
            println!("{content}");
        }
    }
    Ok(())
}
