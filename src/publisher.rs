// Fixed-rate command publisher
//
// Every tick takes a copy of the velocity state, scales it and hands the
// result to the sink, whether or not anything changed since the last tick.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info};

use crate::config::{PUBLISH_QUEUE_DEPTH, TeleopConfig};
use crate::error::TeleopError;
use crate::messages::{Header, OutgoingCommand, Time, Twist, TwistStamped, Vector3};
use crate::state::{SharedState, VelocityState};

/// Where outgoing commands are delivered
pub trait CommandSink {
    fn send(&mut self, cmd: OutgoingCommand) -> impl Future<Output = Result<(), TeleopError>> + Send;
}

/// Publishes commands as JSON on a zenoh key expression.
///
/// Commands pass through a bounded queue so a slow network never holds up
/// the publish timer for more than `PUBLISH_QUEUE_DEPTH` messages.
pub struct ZenohSink {
    tx: mpsc::Sender<OutgoingCommand>,
    task: JoinHandle<Result<(), TeleopError>>,
}

impl ZenohSink {
    pub async fn declare(session: &zenoh::Session, topic: &str) -> Result<Self, TeleopError> {
        let publisher = session.declare_publisher(topic.to_string()).await?;
        let (tx, mut rx) = mpsc::channel::<OutgoingCommand>(PUBLISH_QUEUE_DEPTH);

        let task = tokio::spawn(async move {
            while let Some(cmd) = rx.recv().await {
                let payload = serde_json::to_string(&cmd)?;
                publisher.put(payload).await?;
            }
            Ok::<(), TeleopError>(())
        });

        info!("Publishing to: {}", topic);
        Ok(Self { tx, task })
    }

    /// Flush queued commands and wait for the transport task to finish
    pub async fn close(self) -> Result<(), TeleopError> {
        drop(self.tx);
        self.task.await.map_err(|_| TeleopError::QueueClosed)?
    }
}

impl CommandSink for ZenohSink {
    async fn send(&mut self, cmd: OutgoingCommand) -> Result<(), TeleopError> {
        self.tx.send(cmd).await.map_err(|_| TeleopError::QueueClosed)
    }
}

pub struct CommandPublisher<S> {
    sink: S,
    state: SharedState,
    running: Arc<AtomicBool>,
    frame: Option<String>,
    period: Duration,
}

impl<S: CommandSink> CommandPublisher<S> {
    pub fn new(sink: S, state: SharedState, running: Arc<AtomicBool>, config: &TeleopConfig) -> Self {
        Self {
            sink,
            state,
            running,
            frame: config.frame.clone(),
            period: config.period(),
        }
    }

    /// Scale the intent into a velocity command. Only yaw is commanded.
    pub fn command_for(&self, state: &VelocityState) -> OutgoingCommand {
        let VelocityState { intent, scale } = state;
        self.wrap(Twist {
            linear: Vector3::new(
                f64::from(intent.x) * scale.linear,
                f64::from(intent.y) * scale.linear,
                f64::from(intent.z) * scale.linear,
            ),
            angular: Vector3::new(0.0, 0.0, f64::from(intent.th) * scale.angular),
        })
    }

    fn wrap(&self, twist: Twist) -> OutgoingCommand {
        match &self.frame {
            Some(frame_id) => OutgoingCommand::Stamped(TwistStamped {
                header: Header {
                    stamp: Time::now(),
                    frame_id: frame_id.clone(),
                },
                twist,
            }),
            None => OutgoingCommand::Bare(twist),
        }
    }

    /// Publish the current state once.
    ///
    /// Returns `None` without publishing once the session is shutting down;
    /// from then on only the final stop goes out.
    pub async fn publish_tick(&mut self) -> Result<Option<OutgoingCommand>, TeleopError> {
        let snapshot = self.state.snapshot();
        if !self.running.load(Ordering::SeqCst) {
            return Ok(None);
        }
        let cmd = self.command_for(&snapshot);
        self.sink.send(cmd.clone()).await?;
        Ok(Some(cmd))
    }

    /// Publish an all-zero command
    pub async fn publish_stop(&mut self) -> Result<(), TeleopError> {
        info!("Publishing stop command");
        let cmd = self.wrap(Twist::zero());
        self.sink.send(cmd).await
    }

    /// Publish every period until `shutdown` completes or a send fails
    pub async fn run<F: Future>(&mut self, shutdown: F) -> Result<F::Output, TeleopError> {
        let mut tick = interval(self.period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        debug!("Publish loop started, period {:?}", self.period);
        loop {
            tokio::select! {
                biased;
                reason = &mut shutdown => return Ok(reason),
                _ = tick.tick() => {
                    self.publish_tick().await?;
                }
            }
        }
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}
