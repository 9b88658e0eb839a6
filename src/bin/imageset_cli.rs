//! Image Set Tools CLI
//!
//! Commands: build-manifest, publish-s3, purge, verify
//! Logs to stderr
//! Returns non-zero on any failure

use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use imageset_tools::{ImageSetTools, ToolConfig, ToolOptions, TracingReporter, TOOL_VERSION};

#[derive(Parser)]
#[command(name = "imageset-tools", version = TOOL_VERSION)]
#[command(about = "Build, publish, purge and verify image sets")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Args, Default)]
struct SetArgs {
    /// The directory to look for source images in
    #[arg(short, long, env = "IMAGESET_SOURCE_DIRECTORY")]
    source_directory: Option<String>,

    /// The image set scheme
    #[arg(long, env = "IMAGESET_SCHEME")]
    scheme: Option<String>,
}

#[derive(Args, Default)]
struct VersionArgs {
    /// The image set version, e.g. v1.2.0
    #[arg(long, env = "IMAGESET_VERSION")]
    scheme_version: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build an image set manifest file and save to "imageset.json"
    BuildManifest {
        #[command(flatten)]
        set: SetArgs,

        #[command(flatten)]
        version: VersionArgs,

        /// Base URL used to build image URLs
        #[arg(long, env = "HOST")]
        host: Option<String>,

        /// Write the name-only "imageList.json" instead
        #[arg(long)]
        legacy: bool,
    },

    /// Publish the images to an S3 bucket
    PublishS3 {
        #[command(flatten)]
        set: SetArgs,

        #[command(flatten)]
        version: VersionArgs,

        #[arg(long, env = "AWS_ACCESS_KEY", hide_env_values = true)]
        aws_access_key: Option<String>,

        #[arg(long, env = "AWS_SECRET_KEY", hide_env_values = true)]
        aws_secret_key: Option<String>,

        #[arg(long, env = "AWS_REGION")]
        aws_region: Option<String>,

        /// The S3 bucket to publish to
        #[arg(long, env = "AWS_BUCKET")]
        bucket: Option<String>,
    },

    /// Purge updated images from the image service
    Purge {
        #[command(flatten)]
        set: SetArgs,

        #[command(flatten)]
        version: VersionArgs,

        #[arg(long, env = "IMAGE_SERVICE_API_KEY", hide_env_values = true)]
        image_service_api_key: Option<String>,

        #[arg(long, env = "IMAGE_SERVICE_URL")]
        image_service_url: Option<String>,
    },

    /// Verify the images in the image set
    Verify {
        #[command(flatten)]
        set: SetArgs,
    },
}

fn init_tracing(cli: &Cli) {
    let filter = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn,imageset_tools=info",
            1 => "info,imageset_tools=debug",
            _ => "debug",
        }
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_ansi(std::io::stderr().is_terminal())
                .with_writer(std::io::stderr),
        )
        .init();
}

fn options(set: SetArgs, version: VersionArgs) -> ToolOptions {
    ToolOptions {
        base_directory: std::env::current_dir().ok().or_else(|| Some(PathBuf::from("."))),
        source_directory: set.source_directory,
        scheme: set.scheme,
        version: version.scheme_version,
        ..Default::default()
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli);

    match run(cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands) -> imageset_tools::Result<()> {
    let tools = |options: ToolOptions| {
        ImageSetTools::new(ToolConfig::from_options(options), Arc::new(TracingReporter))
    };

    match command {
        Commands::BuildManifest {
            set,
            version,
            host,
            legacy,
        } => {
            let tools = tools(ToolOptions {
                host,
                ..options(set, version)
            });
            if legacy {
                tools.build_legacy_manifest_file().await
            } else {
                tools.build_manifest_file().await
            }
        }

        Commands::PublishS3 {
            set,
            version,
            aws_access_key,
            aws_secret_key,
            aws_region,
            bucket,
        } => {
            tools(ToolOptions {
                aws_access_key,
                aws_secret_key,
                aws_region,
                aws_bucket: bucket,
                ..options(set, version)
            })
            .publish_to_s3()
            .await
        }

        Commands::Purge {
            set,
            version,
            image_service_api_key,
            image_service_url,
        } => {
            tools(ToolOptions {
                image_service_api_key,
                image_service_url,
                ..options(set, version)
            })
            .purge()
            .await
        }

        Commands::Verify { set } => {
            tools(options(set, VersionArgs::default()))
                .verify_images()
                .await
        }
    }
}
