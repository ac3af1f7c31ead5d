//! Data bridge — connects [`Monitor`] streams to TUI actions.
//!
//! Runs as a background task: subscribes to the mirrored state, the
//! typed event broadcast, and connection state from the monitor,
//! forwarding every change as an [`Action`] through the TUI's action
//! channel.

use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use vigil_core::{ConnectionState, Monitor, TypedEvent};

use crate::action::Action;

/// Spawn the data bridge connecting the [`Monitor`] to the TUI.
///
/// Starts the monitor, pushes the initial state snapshot, then loops
/// forwarding every mirror change, alert, and connection-state
/// transition as an [`Action`]. Shuts down cleanly on cancellation.
pub async fn run_data_bridge(
    monitor: Monitor,
    action_tx: mpsc::UnboundedSender<Action>,
    cancel: CancellationToken,
) {
    let _ = action_tx.send(Action::Connecting);

    // Subscribe before connect so nothing emitted during startup
    // (the initial-fetch warning, the first state transitions) is lost.
    let mut snapshots = monitor.subscribe();
    let mut events = monitor.events();
    let mut conn_state = monitor.connection_state();

    if let Err(e) = monitor.connect().await {
        warn!(error = %e, "failed to start monitor");
        let _ = action_tx.send(Action::Disconnected(format!("{e}")));
        return;
    }

    // Push the initial state so screens have data immediately.
    let _ = action_tx.send(Action::StateUpdated(snapshots.borrow_and_update().clone()));

    // Stream loop — forward every change until cancelled
    loop {
        tokio::select! {
            biased;

            () = cancel.cancelled() => break,

            Ok(()) = snapshots.changed() => {
                let snapshot = snapshots.borrow_and_update().clone();
                let _ = action_tx.send(Action::StateUpdated(snapshot));
            }

            event = events.recv() => {
                match event {
                    Ok(TypedEvent::SystemAlert(alert)) => {
                        let _ = action_tx.send(Action::AlertReceived(alert));
                    }
                    // Mirror mutations already arrive via the snapshot watch.
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(missed, "data bridge lagged behind the event broadcast");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }

            Ok(()) = conn_state.changed() => {
                let state = *conn_state.borrow_and_update();
                match state {
                    ConnectionState::Connected => {
                        let _ = action_tx.send(Action::Connected);
                    }
                    ConnectionState::Disconnected => {
                        let _ = action_tx.send(Action::Disconnected("event channel down".into()));
                    }
                    ConnectionState::Connecting => {
                        let _ = action_tx.send(Action::Connecting);
                    }
                }
            }
        }
    }

    monitor.disconnect().await;
    debug!("data bridge shut down");
}
