//! xdnd-drag - drag a file from the terminal into another X11 application
//!
//! Acts as a minimal host for the drag engine: it polls the pointer and the
//! engine's event queue on a fixed frame clock, the way a GUI toolkit would.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use xdnd_source::{DragSource, DragSourceConfig, DragState};

#[derive(Parser, Debug)]
#[command(name = "xdnd-drag")]
#[command(about = "Drag a file into another X11 application")]
#[command(version)]
struct Cli {
    /// File to drag
    #[arg(short, long)]
    file: PathBuf,

    /// MIME type to offer besides text/uri-list (repeatable)
    #[arg(short, long = "mime", default_value = "application/octet-stream")]
    mime: Vec<String>,

    /// File name the target sees (defaults to the dragged file's name)
    #[arg(short, long)]
    name: Option<String>,

    /// Title of the host window to locate at startup
    #[arg(long)]
    title: Option<String>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Polling frame rate
    #[arg(long, default_value_t = 60)]
    fps: u32,

    /// Trace every XDND message
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing (stderr, so stdout stays free for scripting)
    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.to_string().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = match &cli.config {
        Some(path) => DragSourceConfig::from_json_file(path)?,
        None => DragSourceConfig::default(),
    };
    if let Some(title) = &cli.title {
        config = config.with_window_title(title.clone());
    }
    if cli.verbose {
        config = config.with_verbose(true);
    }

    let name = match &cli.name {
        Some(name) => name.clone(),
        None => cli
            .file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| anyhow::anyhow!("{} has no file name", cli.file.display()))?,
    };

    let source = DragSource::new(config)?;

    let data = tokio::fs::read(&cli.file).await?;
    source.start_drag_with_filename(cli.mime.as_slice(), data, &name)?;
    tracing::info!("Dragging {} - release the left button over a drop target", name);

    let frame = Duration::from_secs(1) / cli.fps.max(1);
    let mut frames = tokio::time::interval(frame);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    // A drag started with the button already held ends on its release
    let start = source.pointer()?;
    tracing::debug!(x = start.x, y = start.y, "Drag starts here");
    let mut pressed = start.primary_down();
    let mut drop_target = None;

    loop {
        tokio::select! {
            _ = frames.tick() => {}
            _ = &mut ctrl_c => {
                source.cancel_drag();
                tracing::info!("Drag cancelled");
                break;
            }
        }

        if source.state() == DragState::Dragging {
            if let Some(pointer) = source.update_pointer() {
                if pointer.primary_down() {
                    pressed = true;
                } else if pressed {
                    let target = source.current_target();
                    if source.finish_drag() == DragState::Dropped {
                        tracing::info!("Dropped, waiting for the target to finish");
                        drop_target = target;
                    }
                }
            }
        }

        source.pump_events()?;

        if source.state() == DragState::Idle {
            match drop_target {
                Some(window) => tracing::info!("Transfer to window {:#x} complete", window),
                None => tracing::info!("Drag ended without a drop"),
            }
            break;
        }
    }

    source.close()?;
    Ok(())
}
