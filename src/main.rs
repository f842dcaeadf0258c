use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use shotspot::{RawUpload, ShotspotConfig, load_scorer, process_upload};

/// Scores photos with the CLIP aesthetic model and prints one JSON result per file.
#[derive(Parser, Debug)]
#[command(name = "shotspot", version, about, long_about = None)]
struct Cli {
    /// YAML config file (defaults apply when omitted)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Photo category used to pick category prompts
    #[arg(long, default_value = "other")]
    category: String,

    /// Image files to score
    #[arg(required = true, value_name = "IMAGE")]
    paths: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => ShotspotConfig::from_file(path)?,
        None => ShotspotConfig::default(),
    };

    let scorer = load_scorer(&config.scorer_config()).await?;
    let upload_cfg = config.upload_config();

    for path in &cli.paths {
        let raw = RawUpload {
            id: path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            category: cli.category.clone(),
            content_type: None,
            bytes: std::fs::read(path)?,
        };

        match process_upload(raw, &scorer, &upload_cfg) {
            Ok(scored) => println!("{}", serde_json::to_string_pretty(&scored)?),
            Err(err) => eprintln!("{}: {err}", path.display()),
        }
    }

    Ok(())
}
