mod cli;

use bilirelay::{config, fetch::HeaderBundle, logging, pipeline::MediaPipeline, server};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::path::Path;

async fn start_server(config: config::Config) -> Result<()> {
    tracing::info!("Starting bilirelay server");
    tracing::info!("Cache directory: {}", config.cache.directory.display());

    server::start_server(config).await
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Start { host, port } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;

            // Override host/port from CLI if specified
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config::validate_config(&config)?;

            let _guard = logging::init(cli.verbose, Some(&config.logging))?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(config))
        }
        Commands::Audio {
            aurl,
            filename,
            cookie,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let _guard = logging::init(cli.verbose, Some(&config.logging))?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_pipeline(&config, &aurl, None, &filename, cookie.as_deref()))
        }
        Commands::Video {
            aurl,
            vurl,
            filename,
            cookie,
        } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let _guard = logging::init(cli.verbose, Some(&config.logging))?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(run_pipeline(
                &config,
                &aurl,
                Some(&vurl),
                &filename,
                cookie.as_deref(),
            ))
        }
        Commands::CheckTools => {
            logging::init(cli.verbose, None)?;
            check_tools(cli.config.as_deref())
        }
        Commands::Validate {
            config: config_path,
        } => {
            logging::init(cli.verbose, None)?;
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("bilirelay {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Run the audio-only pipeline, or the combined one when `vurl` is given.
async fn run_pipeline(
    config: &config::Config,
    aurl: &str,
    vurl: Option<&str>,
    filename: &str,
    cookie: Option<&str>,
) -> Result<()> {
    let pipeline = MediaPipeline::from_config(config)?;
    let headers = HeaderBundle::new(cookie, None, &config.upstream);

    let output = match vurl {
        Some(vurl) => pipeline.audio_video(aurl, vurl, filename, &headers).await?,
        None => pipeline.audio_only(aurl, filename, &headers).await?,
    };

    println!("Output: {}", output.display());
    Ok(())
}

fn check_tools(config_path: Option<&Path>) -> Result<()> {
    println!("Checking external tools...\n");

    let config = config::load_config_or_default(config_path)?;
    let tools = bilirelay_av::check_tools(config.tools.ffmpeg_path.as_deref());
    let mut all_ok = true;

    for tool in &tools {
        let status = if tool.available {
            "✓"
        } else {
            all_ok = false;
            "✗"
        };

        print!("{} {}", status, tool.name);

        if let Some(ref version) = tool.version {
            print!(" ({})", version.lines().next().unwrap_or(""));
        }

        if let Some(ref path) = tool.path {
            print!(" - {}", path.display());
        }

        println!();
    }

    println!();
    if all_ok {
        println!("All required tools are available!");
    } else {
        println!("Some tools are missing. /api/audio and /api/video need ffmpeg.");
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Cache: {}", config.cache.directory.display());
            println!("  Download chunk size: {} bytes", config.download.chunk_size);
            println!("  Download timeout: {}s", config.download.timeout_secs);
            if config.logging.file {
                println!("  Log directory: {}", config.logging.directory.display());
            }
            match config.tools.ffmpeg_path {
                Some(ref ffmpeg) => println!("  FFmpeg: {}", ffmpeg.display()),
                None => println!("  FFmpeg: from PATH"),
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            println!("  Server: {}:{}", config.server.host, config.server.port);
            println!("  Cache: {}", config.cache.directory.display());
        }
    }

    Ok(())
}
