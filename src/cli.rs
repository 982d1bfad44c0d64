use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bilirelay")]
#[command(author, version, about = "bilibili API relay and audio/video download-and-remux server")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the relay server
    Start {
        /// Host to bind to (overrides config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides config)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Download an audio stream and remux it into {filename}.flac
    Audio {
        /// Audio stream URL
        #[arg(long)]
        aurl: String,

        /// Logical output name, without extension
        #[arg(long)]
        filename: String,

        /// Session cookie sent with the download
        #[arg(long)]
        cookie: Option<String>,
    },

    /// Download audio and video streams and remux them into {filename}.mkv
    Video {
        /// Audio stream URL
        #[arg(long)]
        aurl: String,

        /// Video stream URL
        #[arg(long)]
        vurl: String,

        /// Logical output name, without extension
        #[arg(long)]
        filename: String,

        /// Session cookie sent with the downloads
        #[arg(long)]
        cookie: Option<String>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_video_command() {
        let cli = Cli::parse_from([
            "bilirelay",
            "--verbose",
            "video",
            "--aurl",
            "https://cdn.example/a123.m4s",
            "--vurl",
            "https://cdn.example/v456.m4s",
            "--filename",
            "clip",
        ]);
        assert!(cli.verbose);
        match cli.command {
            Commands::Video {
                aurl,
                vurl,
                filename,
                cookie,
            } => {
                assert!(aurl.ends_with("a123.m4s"));
                assert!(vurl.ends_with("v456.m4s"));
                assert_eq!(filename, "clip");
                assert!(cookie.is_none());
            }
            _ => panic!("expected video command"),
        }
    }

    #[test]
    fn test_start_overrides_are_optional() {
        let cli = Cli::parse_from(["bilirelay", "start"]);
        assert!(matches!(cli.command, Commands::Start { host: None, port: None }));

        let cli = Cli::parse_from(["bilirelay", "-c", "relay.toml", "start", "-p", "5001"]);
        assert_eq!(cli.config, Some(PathBuf::from("relay.toml")));
        assert!(matches!(cli.command, Commands::Start { port: Some(5001), .. }));
    }
}
