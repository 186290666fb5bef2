// Session lifecycle: wire the keyboard reader to the publish timer and
// shut both down in order.
//
// Shutdown order: stop accepting keys -> publish one stop command ->
// restore the terminal -> join the reader thread (bounded wait).

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::{Instant, sleep};
use tracing::{error, info, warn};

use crate::config::{Args, READER_JOIN_TIMEOUT, TeleopConfig};
use crate::error::TeleopError;
use crate::keyboard::{Console, InputReader, KeySource, RawModeGuard, ReaderExit, TerminalKeys};
use crate::publisher::{CommandPublisher, CommandSink, ZenohSink};
use crate::state::SharedState;

/// How a session that did not fail came to an end
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Ctrl-C typed at the keyboard
    Quit,
    /// Interrupt signal delivered to the process
    Interrupted,
}

enum Shutdown {
    Reader(ReaderExit),
    ReaderGone,
    Interrupted,
}

/// Run the reader and the publisher until either side ends the session.
///
/// `terminal` is dropped after the final stop command has been sent and
/// before the reader thread is joined. The final stop is attempted on every
/// path, including reader and publish failures.
pub async fn drive<K, W, S, T>(
    reader: InputReader<K, W>,
    publisher: &mut CommandPublisher<S>,
    running: Arc<AtomicBool>,
    terminal: T,
    interrupt: impl Future<Output = ()>,
) -> Result<SessionEnd, TeleopError>
where
    K: KeySource + Send + 'static,
    W: Write + Send + 'static,
    S: CommandSink,
{
    let (exit_tx, exit_rx) = oneshot::channel();
    let reader_thread = thread::Builder::new()
        .name("keyboard".to_string())
        .spawn(move || {
            // The receiver is gone only if the session already ended
            let _ = exit_tx.send(reader.run());
        })?;

    let shutdown = async {
        tokio::select! {
            exit = exit_rx => match exit {
                Ok(exit) => Shutdown::Reader(exit),
                Err(_) => Shutdown::ReaderGone,
            },
            _ = interrupt => Shutdown::Interrupted,
        }
    };
    let outcome = publisher.run(shutdown).await;

    running.store(false, Ordering::SeqCst);
    let stopped = publisher.publish_stop().await;
    drop(terminal);
    let joined = join_reader(reader_thread, READER_JOIN_TIMEOUT).await;

    let end = match outcome? {
        Shutdown::Reader(ReaderExit::Quit) => SessionEnd::Quit,
        Shutdown::Reader(ReaderExit::Cancelled) | Shutdown::Interrupted => SessionEnd::Interrupted,
        Shutdown::Reader(ReaderExit::Failed(e)) => return Err(TeleopError::Terminal(e)),
        Shutdown::ReaderGone => return Err(TeleopError::ReaderPanicked),
    };
    stopped?;
    joined?;
    Ok(end)
}

async fn join_reader(handle: thread::JoinHandle<()>, timeout: Duration) -> Result<(), TeleopError> {
    let deadline = Instant::now() + timeout;
    while !handle.is_finished() {
        if Instant::now() >= deadline {
            // Blocked in a read that has not returned; leave it to process exit
            warn!("Keyboard reader still busy after {:?}, not waiting for it", timeout);
            return Ok(());
        }
        sleep(Duration::from_millis(10)).await;
    }
    handle.join().map_err(|_| TeleopError::ReaderPanicked)
}

async fn interrupt_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Cannot listen for interrupt signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Interrupt signal received");
}

/// Validate parameters, then run a session. Bad parameters fail here,
/// before any session or terminal is opened.
pub async fn start(args: Args) -> Result<SessionEnd, TeleopError> {
    let config = args.validate()?;
    run(config).await
}

/// Full keyboard teleop session on the controlling terminal
pub async fn run(config: TeleopConfig) -> Result<SessionEnd, TeleopError> {
    info!("Opening Zenoh session...");
    let zenoh_config = match &config.zenoh_config {
        Some(path) => zenoh::Config::from_file(path)?,
        None => zenoh::Config::default(),
    };
    let session = zenoh::open(zenoh_config).await?;
    let sink = ZenohSink::declare(&session, &config.topic).await?;

    info!(
        "Teleop started: {}Hz, {}",
        config.repeat_rate,
        match &config.frame {
            Some(frame_id) => format!("stamped, frame_id {:?}", frame_id),
            None => "unstamped".to_string(),
        }
    );

    let state = SharedState::default();
    let running = Arc::new(AtomicBool::new(true));
    let mut publisher = CommandPublisher::new(sink, state.clone(), running.clone(), &config);

    let terminal = RawModeGuard::acquire()?;
    let mut console = Console::stdout();
    console.print_help()?;
    console.print(&state.snapshot().scale.status_line())?;

    let reader = InputReader::new(TerminalKeys, state, running.clone(), console);
    let result = drive(reader, &mut publisher, running, terminal, interrupt_signal()).await;

    // Let queued commands, the final stop included, reach the network
    let flushed = publisher.into_sink().close().await;
    if let Err(e) = session.close().await {
        warn!("Error closing Zenoh session: {}", e);
    }

    match (&result, &flushed) {
        (Ok(end), Ok(())) => info!("Session ended: {:?}", end),
        (_, Err(e)) => error!("Failed to flush commands: {}", e),
        _ => {}
    }
    let end = result?;
    flushed?;
    Ok(end)
}
