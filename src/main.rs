use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use clap::Parser;
use image_blur::{BlurController, BoxBlurFilter, DirImageStore, Image, Sink};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Downscale and blur an image:
/// - one-shot: blur once and report the output size
/// - sweep: replay a slider drag and report which requests were actually delivered
#[derive(Parser, Debug)]
#[command(name = "blur")]
#[command(about = "Downscale and blur an image with single-flight job control")]
#[command(long_about = "Downscale and blur an image with single-flight job control.
Use --sweep to replay a slider drag: N requests with rising intensity are submitted back to back,
and by default each one supersedes the one before it.")]
struct Args {
    /// Input image path
    #[arg(help = "Input image (any format the image crate decodes)")]
    input: String,

    /// Blur radius
    #[arg(short, long, default_value_t = 8.0,
          help = "Blur radius from 0 to 25; values outside [0, 25) become 25")]
    intensity: f32,

    /// Downscale factor
    #[arg(short, long, default_value_t = 0.3,
          help = "Downscale factor, clamped to 0.2-0.9")]
    scale: f32,

    /// Keep earlier requests running
    #[arg(long, help = "Let each request run alongside earlier ones instead of replacing them")]
    allow_multiple: bool,

    /// Number of requests to replay
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..),
          help = "Submit N requests ramping intensity up to --intensity")]
    sweep: u32,

    /// Delay between replayed requests
    #[arg(long, default_value_t = 5, help = "Milliseconds between replayed requests")]
    interval_ms: u64,

    /// Blur on the calling thread
    #[arg(long, help = "Run a single synchronous blur instead of submitting jobs")]
    sync: bool,
}

/// Forwards delivered images together with the sweep step that produced them.
struct StepSink {
    step: u32,
    tx: mpsc::UnboundedSender<(u32, Image)>,
}

#[async_trait]
impl Sink for StepSink {
    async fn deliver(&self, image: Image) {
        if self.tx.send((self.step, image)).is_err() {
            debug!(step = self.step, "sweep receiver dropped, discarding blurred image");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let (root, resource) = split_input(&args.input)?;
    let store = DirImageStore::new(root);
    let controller = BlurController::with_current_runtime(Arc::new(BoxBlurFilter::default()))?;

    let image = controller
        .load_resource(&store, &resource)
        .await
        .with_context(|| format!("loading {}", args.input))?
        .image()
        .clone();
    info!(width = image.width(), height = image.height(), "loaded {}", args.input);

    if args.sync {
        let started = Instant::now();
        let blurred = controller
            .load(image)
            .intensity(args.intensity)
            .scale(args.scale)
            .on_out_of_memory(|| warn!("out of memory, kept original image"))
            .get_blurred();
        info!(
            width = blurred.width(),
            height = blurred.height(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "blurred synchronously"
        );
        return Ok(());
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let started = Instant::now();
    for step in 1..=args.sweep {
        let intensity = args.intensity * step as f32 / args.sweep as f32;
        controller
            .load(image.clone())
            .intensity(intensity)
            .scale(args.scale)
            .allow_multiple_task(args.allow_multiple)
            .on_out_of_memory(|| warn!("out of memory, kept original image"))
            .into(StepSink {
                step,
                tx: tx.clone(),
            })?;
        if step < args.sweep && args.interval_ms > 0 {
            tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
        }
    }
    drop(tx);

    // Senders live inside the job sinks, so the channel closes once every job is done.
    let mut delivered = Vec::new();
    while let Some((step, blurred)) = rx.recv().await {
        info!(
            step,
            width = blurred.width(),
            height = blurred.height(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "delivered"
        );
        delivered.push(step);
    }

    info!(
        submitted = args.sweep,
        delivered = delivered.len(),
        steps = ?delivered,
        "sweep finished"
    );
    controller.shutdown().await;
    Ok(())
}

/// Split an input path into the store root and the resource id inside it.
fn split_input(input: &str) -> Result<(String, String)> {
    let path = Path::new(input);
    let file = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("Invalid input path: {}", input))?;
    let root = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_string_lossy().into_owned(),
        _ => ".".to_string(),
    };
    Ok((root, file.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_step_sink_survives_closed_receiver() {
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let sink = StepSink { step: 3, tx };
        sink.deliver(Image::filled(1, 1, [0, 0, 0, 255])).await;
    }

    #[test]
    fn test_split_input() {
        assert_eq!(
            split_input("photos/cat.png").unwrap(),
            ("photos".to_string(), "cat.png".to_string())
        );
        assert_eq!(
            split_input("cat.png").unwrap(),
            (".".to_string(), "cat.png".to_string())
        );
    }
}
