//! Terminal participant for a blockboard hub.
//!
//! Runs the same engine and sync client as the browser, driven by scripted
//! pointer gestures instead of a mouse. Useful for watching a board from a
//! shell and for poking at a live hub while someone else has it open.

mod runtime;

use std::time::Duration;

use canvas::consts::THROW_VELOCITY_SCALE;
use canvas::geom::{Point, Velocity, Viewport};
use canvas::physics::{PhysicsParams, Throw};
use canvas::sync::SyncClient;
use clap::{Parser, Subcommand};
use frames::{CreateRequest, Event};
use runtime::{PointerEvent, Runtime, drag_script, spawn_connection, spawn_script, throw_script};
use tokio::sync::mpsc;

const OUTBOUND_CAPACITY: usize = 64;
const DRAG_STEPS: u32 = 12;
const THROW_FRAMES: u32 = 5;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid base url: {0}")]
    InvalidBaseUrl(String),
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("health check returned {0}")]
    Unhealthy(reqwest::StatusCode),
    #[error("unknown block: {0}")]
    UnknownBlock(String),
    #[error("timed out waiting for the hub")]
    Timeout,
    #[error("event loop closed")]
    LoopClosed,
}

#[derive(Debug, Parser)]
#[command(name = "blockboard", about = "Blockboard terminal participant")]
struct Cli {
    #[arg(long, env = "BLOCKBOARD_URL", default_value = "http://127.0.0.1:3000")]
    url: String,

    #[arg(long, default_value_t = canvas::consts::VIEWPORT_WIDTH)]
    width: f64,

    #[arg(long, default_value_t = canvas::consts::VIEWPORT_HEIGHT)]
    height: f64,

    #[arg(long, default_value_t = canvas::consts::BLOCK_WIDTH)]
    block_size: f64,

    /// Seconds to wait for the hub before giving up. Ignored by `watch`.
    #[arg(long, default_value_t = 10)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check that the hub is up.
    Ping,
    /// Print every board event until interrupted.
    Watch,
    /// Double-click at a canvas position to create a block there.
    Create {
        #[arg(long)]
        x: f64,
        #[arg(long)]
        y: f64,
    },
    /// Drag a block to a new origin and drop it without a throw.
    Drag {
        id: String,
        #[arg(long)]
        to_x: f64,
        #[arg(long)]
        to_y: f64,
    },
    /// Fling a block by a per-frame pointer delta and wait for it to settle.
    Throw {
        id: String,
        #[arg(long)]
        dx: f64,
        #[arg(long)]
        dy: f64,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let viewport = Viewport { width: cli.width, height: cli.height, block_width: cli.block_size, block_height: cli.block_size };
    let deadline = Duration::from_secs(cli.timeout_secs);

    match cli.command {
        Commands::Ping => run_ping(&cli.url).await,
        Commands::Watch => run_watch(&cli.url, viewport).await,
        Commands::Create { x, y } => run_create(&cli.url, viewport, Point::new(x, y), deadline).await,
        Commands::Drag { id, to_x, to_y } => run_drag(&cli.url, viewport, &id, Point::new(to_x, to_y), deadline).await,
        Commands::Throw { id, dx, dy } => run_throw(&cli.url, viewport, &id, dx, dy, deadline).await,
    }
}

// =============================================================================
// COMMANDS
// =============================================================================

async fn run_ping(base: &str) -> Result<(), CliError> {
    let resp = reqwest::Client::new()
        .get(format!("{}/healthz", base.trim_end_matches('/')))
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(CliError::Unhealthy(resp.status()));
    }
    println!("ok");
    Ok(())
}

async fn run_watch(base: &str, viewport: Viewport) -> Result<(), CliError> {
    let mut rt = connect(base, viewport)?;
    let mut status = rt.client().status;
    println!("{}", status.indicator());
    while let Some(event) = rt.next().await {
        let observed = rt.dispatch(event);
        if rt.client().status != status {
            status = rt.client().status;
            println!("{}", status.indicator());
        }
        if let Some(event) = observed {
            println!("{}", describe(&event));
        }
    }
    Err(CliError::LoopClosed)
}

async fn run_create(base: &str, viewport: Viewport, at: Point, deadline: Duration) -> Result<(), CliError> {
    let mut rt = connect(base, viewport)?;
    wait_for_snapshot(&mut rt, deadline).await?;

    spawn_script(rt.sender(), vec![(Duration::ZERO, PointerEvent::Create(at))]);
    let record = run_until(&mut rt, deadline, |rt, observed| match observed {
        Some(Event::Created(record)) => {
            let sent = rt.last_create()?;
            (sent == CreateRequest { x: record.x, y: record.y }).then(|| record.clone())
        }
        _ => None,
    })
    .await?;
    println!("created {} at ({:.1}, {:.1})", record.id, record.x, record.y);
    Ok(())
}

async fn run_drag(base: &str, viewport: Viewport, id: &str, to: Point, deadline: Duration) -> Result<(), CliError> {
    let mut rt = connect(base, viewport)?;
    wait_for_snapshot(&mut rt, deadline).await?;

    let origin = block_origin(rt.client(), id)?;
    let grab = centre(origin, viewport);
    let target = centre(viewport.clamp(to), viewport);
    spawn_script(rt.sender(), drag_script(id, grab, target, DRAG_STEPS));

    let settled = wait_for_echo(&mut rt, id, deadline).await?;
    println!("{id} dropped at ({:.1}, {:.1})", settled.x, settled.y);
    Ok(())
}

async fn run_throw(base: &str, viewport: Viewport, id: &str, dx: f64, dy: f64, deadline: Duration) -> Result<(), CliError> {
    let mut rt = connect(base, viewport)?;
    wait_for_snapshot(&mut rt, deadline).await?;

    let origin = block_origin(rt.client(), id)?;
    let landing = predicted_landing(origin, dx, dy, viewport);
    println!("{id} predicted to land near ({:.1}, {:.1})", landing.x, landing.y);
    spawn_script(rt.sender(), throw_script(id, centre(origin, viewport), dx, dy, THROW_FRAMES));

    let settled = wait_for_echo(&mut rt, id, deadline).await?;
    println!("{id} settled at ({:.1}, {:.1})", settled.x, settled.y);
    Ok(())
}

// =============================================================================
// HELPERS
// =============================================================================

/// Derive the websocket endpoint from an http(s) base url.
fn ws_url(base: &str) -> Result<String, CliError> {
    let base = base.trim_end_matches('/');
    let rest = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(CliError::InvalidBaseUrl(base.to_owned()));
    };
    Ok(format!("{rest}/ws"))
}

fn connect(base: &str, viewport: Viewport) -> Result<Runtime, CliError> {
    let url = ws_url(base)?;
    let (outbound_tx, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
    let rt = Runtime::new(viewport, outbound_tx);
    spawn_connection(url, rt.sender(), outbound_rx);
    Ok(rt)
}

/// Dispatch events until `check` yields a value or `deadline` passes.
async fn run_until<T>(
    rt: &mut Runtime,
    deadline: Duration,
    mut check: impl FnMut(&Runtime, Option<&Event>) -> Option<T>,
) -> Result<T, CliError> {
    let drive = async {
        while let Some(event) = rt.next().await {
            let observed = rt.dispatch(event);
            if let Some(done) = check(rt, observed.as_ref()) {
                return Ok(done);
            }
        }
        Err(CliError::LoopClosed)
    };
    tokio::time::timeout(deadline, drive).await.map_err(|_| CliError::Timeout)?
}

async fn wait_for_snapshot(rt: &mut Runtime, deadline: Duration) -> Result<(), CliError> {
    run_until(rt, deadline, |_, observed| matches!(observed, Some(Event::Snapshot(_))).then_some(())).await
}

/// Wait until the gesture is released, the block is back to idle, and the hub
/// has echoed the last position this participant sent for it.
async fn wait_for_echo(rt: &mut Runtime, id: &str, deadline: Duration) -> Result<Point, CliError> {
    run_until(rt, deadline, |rt, observed| {
        let Some(Event::Moved(update)) = observed else { return None };
        if update.id != id || !rt.released() || rt.client().engine.is_owned(id) {
            return None;
        }
        let sent = rt.last_sent(id)?;
        (sent == update).then(|| Point::new(update.x, update.y))
    })
    .await
}

fn block_origin(client: &SyncClient, id: &str) -> Result<Point, CliError> {
    client.engine.doc.position(id).ok_or_else(|| CliError::UnknownBlock(id.to_owned()))
}

fn centre(origin: Point, viewport: Viewport) -> Point {
    Point::new(origin.x + viewport.block_width / 2.0, origin.y + viewport.block_height / 2.0)
}

/// Where a flick of `(dx, dy)` per frame should come to rest. The live release
/// velocity is sampled from real timings, so the outcome lands close to this
/// rather than exactly on it.
fn predicted_landing(origin: Point, dx: f64, dy: f64, viewport: Viewport) -> Point {
    let frames = f64::from(THROW_FRAMES);
    let release = viewport.clamp(Point::new(origin.x + dx * frames, origin.y + dy * frames));
    let velocity = Velocity::new(dx * THROW_VELOCITY_SCALE, dy * THROW_VELOCITY_SCALE);
    Throw::new(release, velocity, viewport.bounds(), PhysicsParams::default())
        .trajectory(1.0)
        .last()
        .map_or(release, |step| step.position)
}

fn describe(event: &Event) -> String {
    match event {
        Event::Snapshot(blocks) => {
            let mut out = format!("snapshot: {} blocks", blocks.len());
            for block in blocks.values() {
                out.push_str(&format!("\n  {} ({:.1}, {:.1}) {}", block.id, block.x, block.y, block.label));
            }
            out
        }
        Event::Moved(update) => format!("moved {} -> ({:.1}, {:.1})", update.id, update.x, update.y),
        Event::Created(block) => format!("created {} at ({:.1}, {:.1}) {}", block.id, block.x, block.y, block.label),
        Event::Move(_) | Event::Create(_) => format!("unexpected client frame: {}", event.syscall()),
    }
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
