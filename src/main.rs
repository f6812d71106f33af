use std::io::BufRead;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::warn;

use overlayshot::{FrameSource, Overlay, OverlayConfig, SolidColor, TestPattern, Viewport};

/// Stand-alone overlay host: reads `{"request": {...}}` messages as JSON
/// lines on stdin and feeds them to a running overlay. EOF shuts the loop
/// down after outstanding uploads finish.
#[derive(Parser)]
#[command(name = "overlayshot", version, about)]
struct Args {
    /// Viewport width in pixels
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Viewport height in pixels
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Frame loop refresh rate in Hz
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Built-in frame source to render (no game host in stand-alone mode)
    #[arg(long, value_enum, default_value = "gradient")]
    pattern: Pattern,
}

#[derive(Clone, Copy, ValueEnum)]
enum Pattern {
    /// Solid red frames
    Solid,
    /// Deterministic color gradient
    Gradient,
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let source: Arc<dyn FrameSource> = match args.pattern {
        Pattern::Solid => Arc::new(SolidColor::new(args.width, args.height, [255, 0, 0, 255])),
        Pattern::Gradient => Arc::new(TestPattern::new(args.width, args.height)),
    };

    let config = OverlayConfig {
        viewport: Viewport {
            width: args.width,
            height: args.height,
        },
        refresh_rate_hz: args.fps,
        ..Default::default()
    };

    let mut overlay = Overlay::new(config, source)?;
    let handle = overlay.handle();

    // stdin bridge on a blocking thread; each line is one host message
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            if let Err(e) = handle.post_message(&line) {
                warn!("ignoring message: {}", e);
            }
        }
        handle.shutdown();
    });

    overlay.run().await;
    Ok(())
}
