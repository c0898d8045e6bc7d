use anyhow::Result;
use clap::{Parser, Subcommand};
use facepipe_core::{embed, extract, ExtractOptions};
use facepipe_onnx::{ArcFaceEmbedder, ScrfdDetector};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "facepipe", about = "Face crop extraction and embedding pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract aligned face crops from images into an output directory
    Extract {
        /// Image files or directories containing images
        #[arg(required = true)]
        image_paths: Vec<PathBuf>,
        /// Directory to save extracted face crops
        #[arg(long, default_value = "face_crops")]
        output_dir: PathBuf,
        /// Abort when an image contains no detectable face
        #[arg(long)]
        enforce_detection: bool,
        /// Expand each detected face box by a percentage
        #[arg(long, default_value_t = 0)]
        expand_percentage: u32,
        /// Directory containing the ONNX model files
        #[arg(long, default_value = "models")]
        model_dir: PathBuf,
    },
    /// Embed a directory of face crops into one JSON artifact
    Embed {
        /// Directory containing face crop images
        faces_dir: PathBuf,
        /// Output JSON file path
        #[arg(long, default_value = "arcface_embeddings.json")]
        output: PathBuf,
        /// Abort when a crop cannot be processed
        #[arg(long)]
        enforce_detection: bool,
        /// Directory containing the ONNX model files
        #[arg(long, default_value = "models")]
        model_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Extract {
            image_paths,
            output_dir,
            enforce_detection,
            expand_percentage,
            model_dir,
        } => {
            let mut detector = ScrfdDetector::load(&facepipe_onnx::scrfd_model_path(&model_dir))?;
            extract(
                &mut detector,
                &image_paths,
                &output_dir,
                &ExtractOptions { enforce_detection, expand_percentage },
            )?;
        }
        Commands::Embed { faces_dir, output, enforce_detection, model_dir } => {
            let mut embedder =
                ArcFaceEmbedder::load(&facepipe_onnx::arcface_model_path(&model_dir))?;
            let records = embed(&mut embedder, &faces_dir, &output, enforce_detection)?;
            println!("wrote {} embeddings to {}", records.len(), output.display());
        }
    }

    Ok(())
}
