//! Consumer worker loop: retries, backoff, dead-lettering.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use tracing::{debug, error, warn};

use corehr_events::{EventBus, Subscription, WireMessage};

use crate::consumer::AuditConsumer;
use crate::retry::RetryPolicy;
use crate::store::AuditStore;

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

/// Audit consumer worker.
///
/// - Subscribes to the bus and processes messages for one topic
/// - Retryable failures follow the backoff schedule, then dead-letter
/// - Non-retryable failures dead-letter immediately
/// - Consumer failures never propagate to any caller
///
/// Multiple workers may share a topic; the consumer's structural dedup makes
/// overlapping deliveries safe.
#[derive(Debug)]
pub struct ConsumerWorker;

impl ConsumerWorker {
    /// Spawn a worker thread draining `topic` into the audit store.
    pub fn spawn<B, S>(
        name: &'static str,
        bus: B,
        topic: impl Into<String>,
        consumer: AuditConsumer<S>,
        policy: RetryPolicy,
    ) -> WorkerHandle
    where
        B: EventBus<WireMessage> + Send + Sync + 'static,
        S: AuditStore + Send + Sync + 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let sub: Subscription<WireMessage> = bus.subscribe();
        let topic = topic.into();

        let join = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || worker_loop(name, sub, shutdown_rx, &bus, &topic, &consumer, &policy))
            .expect("failed to spawn consumer worker thread");

        WorkerHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }
}

fn worker_loop<B, S>(
    name: &'static str,
    sub: Subscription<WireMessage>,
    shutdown_rx: mpsc::Receiver<()>,
    bus: &B,
    topic: &str,
    consumer: &AuditConsumer<S>,
    policy: &RetryPolicy,
) where
    B: EventBus<WireMessage>,
    S: AuditStore,
{
    let tick = Duration::from_millis(50);

    loop {
        // Shutdown check (non-blocking)
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        match sub.recv_timeout(tick) {
            Ok(msg) => {
                if msg.topic() != topic {
                    continue;
                }
                handle_message(name, bus, consumer, policy, msg);
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn handle_message<B, S>(
    name: &'static str,
    bus: &B,
    consumer: &AuditConsumer<S>,
    policy: &RetryPolicy,
    msg: WireMessage,
) where
    B: EventBus<WireMessage>,
    S: AuditStore,
{
    let mut retries = 0u32;

    loop {
        match consumer.process(&msg) {
            Ok(outcome) => {
                debug!(worker = name, key = msg.key(), ?outcome, "message processed");
                return;
            }
            Err(err) if !err.is_retryable() => {
                warn!(worker = name, key = msg.key(), error = %err,
                    "non-retryable failure, dead-lettering");
                dead_letter(name, bus, msg);
                return;
            }
            Err(err) if policy.should_retry(retries) => {
                retries += 1;
                let delay = policy.delay_for_retry(retries);
                warn!(worker = name, key = msg.key(), retry = retries,
                    delay_ms = delay.as_millis() as u64, error = %err,
                    "retryable failure, backing off");
                thread::sleep(delay);
            }
            Err(err) => {
                error!(worker = name, key = msg.key(), retries, error = %err,
                    "retries exhausted, dead-lettering");
                dead_letter(name, bus, msg);
                return;
            }
        }
    }
}

fn dead_letter<B>(name: &'static str, bus: &B, msg: WireMessage)
where
    B: EventBus<WireMessage>,
{
    let key = msg.key().to_string();
    if let Err(err) = bus.publish(msg.into_dead_letter()) {
        error!(worker = name, key, error = ?err, "failed to publish to dead-letter channel");
    }
}
