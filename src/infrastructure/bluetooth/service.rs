//! Bluetooth Worker
//!
//! Runs the keypad service on its own thread with a current-thread tokio
//! runtime, so every platform await and every write request is driven by a
//! single event loop. The shell talks to it through [`BluetoothCommand`]s and
//! hears back through [`AppEvent`]s.

use crate::domain::gatt::{Deferral, GattHost, WriteReceiver};
use crate::domain::keypad::KeystrokeInjector;
use crate::domain::models::{AppEvent, BluetoothCommand, MessageSeverity, ServiceState, StatusMessage};
use crate::domain::publisher::ServicePublisher;
use crate::domain::write_handler::WriteHandler;
use anyhow::{Context, Result};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Handle to the Bluetooth worker thread
pub struct BluetoothWorker {
    command_tx: mpsc::UnboundedSender<BluetoothCommand>,
    thread: Option<JoinHandle<()>>,
    shutdown_timeout: Duration,
}

impl BluetoothWorker {
    /// Start the worker; it publishes the keypad service right away.
    pub fn spawn<H, K>(
        host: H,
        injector: K,
        events: mpsc::UnboundedSender<AppEvent>,
        shutdown_timeout: Duration,
    ) -> Result<Self>
    where
        H: GattHost + Send + 'static,
        K: KeystrokeInjector,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let thread = std::thread::Builder::new()
            .name("bluetooth".to_string())
            .spawn(move || {
                let rt = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(rt) => rt,
                    Err(e) => {
                        error!("Failed to create tokio runtime for Bluetooth: {}", e);
                        let _ = events.send(AppEvent::ServiceState(ServiceState::Unavailable(
                            format!("Bluetooth worker failed to start: {}", e),
                        )));
                        return;
                    }
                };

                rt.block_on(run_service(host, injector, events, command_rx));
            })
            .context("Failed to spawn Bluetooth worker thread")?;

        Ok(Self {
            command_tx,
            thread: Some(thread),
            shutdown_timeout,
        })
    }

    /// Stop advertising and wait for the worker to acknowledge.
    ///
    /// Returns false if the acknowledgement did not arrive in time. Calling
    /// this again after it returned is a no-op.
    pub fn shutdown(&mut self) -> bool {
        let Some(thread) = self.thread.take() else {
            return true;
        };

        let (ack_tx, ack_rx) = std::sync::mpsc::channel();
        if self
            .command_tx
            .send(BluetoothCommand::Shutdown(ack_tx))
            .is_err()
        {
            // Worker already gone
            let _ = thread.join();
            return true;
        }

        match ack_rx.recv_timeout(self.shutdown_timeout) {
            Ok(()) => {
                let _ = thread.join();
                info!("Bluetooth worker stopped");
                true
            }
            Err(_) => {
                warn!(
                    "Bluetooth worker did not stop within {:?}",
                    self.shutdown_timeout
                );
                false
            }
        }
    }
}

impl Drop for BluetoothWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn send_log(events: &mpsc::UnboundedSender<AppEvent>, message: String, severity: MessageSeverity) {
    let _ = events.send(AppEvent::LogMessage(StatusMessage { message, severity }));
}

async fn run_service<H, K>(
    host: H,
    injector: K,
    events: mpsc::UnboundedSender<AppEvent>,
    mut commands: mpsc::UnboundedReceiver<BluetoothCommand>,
) where
    H: GattHost,
    K: KeystrokeInjector,
{
    let _ = events.send(AppEvent::ServiceState(ServiceState::Starting));

    let (write_tx, mut write_rx) = mpsc::unbounded_channel();
    let mut publisher = ServicePublisher::new(host);
    match publisher.publish(write_tx).await {
        Ok(()) => {
            if let Some(status) = publisher.advertisement_status() {
                debug!("Advertisement status after start: {:?}", status);
            }
            let _ = events.send(AppEvent::ServiceState(ServiceState::Advertising));
            send_log(
                &events,
                "Keypad service is advertising".to_string(),
                MessageSeverity::Success,
            );
        }
        Err(e) => {
            let status = e.status_text();
            send_log(&events, e.to_string(), MessageSeverity::Error);
            warn!("Keypad service unavailable: {:#}", anyhow::Error::new(e));
            let _ = events.send(AppEvent::ServiceState(ServiceState::Unavailable(status)));
        }
    }

    let handler = Arc::new(WriteHandler::new(injector));
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            Some(write) = write_rx.recv() => {
                let handler = handler.clone();
                let events = events.clone();
                in_flight.spawn(async move {
                    let outcome = handler.handle(write.deferral, write.request).await;
                    let _ = events.send(AppEvent::WriteHandled(outcome));
                });
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    error!("Write request task failed: {}", e);
                }
            }
            command = commands.recv() => {
                let ack = match command {
                    Some(BluetoothCommand::Shutdown(ack)) => Some(ack),
                    // Shell dropped its handle without asking
                    None => None,
                };

                info!("Shutting down keypad service");
                send_log(
                    &events,
                    "Shutting down keypad service".to_string(),
                    MessageSeverity::Info,
                );
                if let Err(e) = publisher.stop_advertising() {
                    warn!("Failed to stop advertising: {}", e);
                    send_log(
                        &events,
                        format!("Failed to stop advertising: {}", e),
                        MessageSeverity::Warning,
                    );
                }
                release_pending(&mut write_rx, &mut in_flight).await;
                let _ = events.send(AppEvent::ServiceState(ServiceState::Stopped));

                if let Some(ack) = ack {
                    let _ = ack.send(());
                }
                break;
            }
        }
    }
}

/// Complete the deferral of every write still queued or in progress.
/// Aborted tasks release theirs through the guard's `Drop`.
async fn release_pending<D, R>(write_rx: &mut WriteReceiver<D, R>, in_flight: &mut JoinSet<()>)
where
    D: Deferral,
{
    write_rx.close();
    let mut queued = 0;
    while let Ok(write) = write_rx.try_recv() {
        if let Err(e) = write.deferral.complete() {
            warn!("Failed to release queued write: {}", e);
        }
        queued += 1;
    }

    let running = in_flight.len();
    in_flight.shutdown().await;

    if queued + running > 0 {
        info!(
            "Released {} queued and {} in-flight write requests",
            queued, running
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::gatt::WriteOption;
    use crate::domain::testing::{
        calls, incoming, stalled, CallLog, MockAdapter, MockHost, RecordingInjector,
    };
    use crate::domain::write_handler::WriteOutcome;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn next_event(events: &mut mpsc::UnboundedReceiver<AppEvent>) -> AppEvent {
        let deadline = std::time::Instant::now() + TIMEOUT;
        loop {
            match events.try_recv() {
                Ok(event) => return event,
                Err(mpsc::error::TryRecvError::Empty) if std::time::Instant::now() < deadline => {
                    std::thread::sleep(Duration::from_millis(5));
                }
                Err(e) => panic!("no event from worker: {:?}", e),
            }
        }
    }

    fn next_service_state(events: &mut mpsc::UnboundedReceiver<AppEvent>) -> ServiceState {
        loop {
            if let AppEvent::ServiceState(state) = next_event(events) {
                return state;
            }
        }
    }

    fn next_outcome(events: &mut mpsc::UnboundedReceiver<AppEvent>) -> WriteOutcome {
        loop {
            if let AppEvent::WriteHandled(outcome) = next_event(events) {
                return outcome;
            }
        }
    }

    #[test]
    fn test_writes_flow_to_injector_and_shutdown_stops_advertising() {
        let log = CallLog::default();
        let host = MockHost::new(&log);
        let writes = host.writes.clone();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        let mut worker = BluetoothWorker::spawn(
            host,
            RecordingInjector::new(log.clone()),
            events_tx,
            TIMEOUT,
        )
        .unwrap();

        assert_eq!(next_service_state(&mut events_rx), ServiceState::Starting);
        assert_eq!(next_service_state(&mut events_rx), ServiceState::Advertising);

        let sink = writes.lock().unwrap().clone().unwrap();
        sink.send(incoming(&log, b"1234", WriteOption::WithResponse))
            .ok()
            .unwrap();
        assert_eq!(
            next_outcome(&mut events_rx),
            WriteOutcome::Accepted {
                digits: 4,
                responded: true
            }
        );

        sink.send(incoming(&log, b"12a4", WriteOption::WithoutResponse))
            .ok()
            .unwrap();
        assert_eq!(
            next_outcome(&mut events_rx),
            WriteOutcome::Rejected {
                bytes: 4,
                responded: false
            }
        );

        assert!(worker.shutdown());
        assert_eq!(next_service_state(&mut events_rx), ServiceState::Stopped);

        let log = calls(&log);
        let tail: Vec<&str> = log.iter().skip(5).map(String::as_str).collect();
        assert_eq!(
            tail,
            ["inject 1234<enter>", "respond", "complete", "complete", "stop_advertising"]
        );
    }

    #[test]
    fn test_stalled_write_does_not_hold_up_later_writes() {
        let log = CallLog::default();
        let host = MockHost::new(&log);
        let writes = host.writes.clone();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        let mut worker = BluetoothWorker::spawn(
            host,
            RecordingInjector::new(log.clone()),
            events_tx,
            TIMEOUT,
        )
        .unwrap();
        assert_eq!(next_service_state(&mut events_rx), ServiceState::Starting);
        assert_eq!(next_service_state(&mut events_rx), ServiceState::Advertising);

        let sink = writes.lock().unwrap().clone().unwrap();
        sink.send(stalled(&log)).ok().unwrap();
        sink.send(incoming(&log, b"42", WriteOption::WithResponse))
            .ok()
            .unwrap();

        assert_eq!(
            next_outcome(&mut events_rx),
            WriteOutcome::Accepted {
                digits: 2,
                responded: true
            }
        );
        let before_shutdown = calls(&log);
        assert_eq!(
            before_shutdown.iter().filter(|c| *c == "complete").count(),
            1
        );

        assert!(worker.shutdown());

        let log = calls(&log);
        let tail: Vec<&str> = log.iter().skip(5).map(String::as_str).collect();
        assert_eq!(
            tail,
            ["inject 42<enter>", "respond", "complete", "stop_advertising", "complete"]
        );

        let mut shutdown_notice = false;
        while let Ok(event) = events_rx.try_recv() {
            if let AppEvent::LogMessage(message) = event {
                shutdown_notice |= message.severity == MessageSeverity::Info;
            }
        }
        assert!(shutdown_notice);
    }

    #[test]
    fn test_shutdown_releases_stalled_writes() {
        let log = CallLog::default();
        let host = MockHost::new(&log);
        let writes = host.writes.clone();
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        let mut worker = BluetoothWorker::spawn(
            host,
            RecordingInjector::new(log.clone()),
            events_tx,
            TIMEOUT,
        )
        .unwrap();
        assert_eq!(next_service_state(&mut events_rx), ServiceState::Starting);
        assert_eq!(next_service_state(&mut events_rx), ServiceState::Advertising);

        let sink = writes.lock().unwrap().clone().unwrap();
        sink.send(stalled(&log)).ok().unwrap();
        sink.send(stalled(&log)).ok().unwrap();

        assert!(worker.shutdown());

        let completes = calls(&log).iter().filter(|c| *c == "complete").count();
        assert_eq!(completes, 2);
        assert!(calls(&log).contains(&"stop_advertising".to_string()));

        // The sink is closed once the worker is gone.
        assert!(sink.send(stalled(&log)).is_err());
    }

    #[test]
    fn test_setup_failure_reported_and_exit_skips_stop() {
        let log = CallLog::default();
        let mut host = MockHost::new(&log);
        host.adapter = MockAdapter::Missing;
        let (events_tx, mut events_rx) = mpsc::unbounded_channel();

        let mut worker = BluetoothWorker::spawn(
            host,
            RecordingInjector::new(log.clone()),
            events_tx,
            TIMEOUT,
        )
        .unwrap();

        assert_eq!(next_service_state(&mut events_rx), ServiceState::Starting);
        assert_eq!(
            next_service_state(&mut events_rx),
            ServiceState::Unavailable("Jelling (No Bluetooth adapter found!)".to_string())
        );

        assert!(worker.shutdown());
        assert!(worker.shutdown());
        assert_eq!(calls(&log), ["default_adapter"]);
    }
}
