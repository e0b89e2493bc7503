use std::sync::Arc;
use std::time::Duration;

use bulk_sender_core::{ConnectionState, DispatchError, MessagingChannel};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Read-only view of the channel state published by [`StatusPoller`].
#[derive(Debug, Clone)]
pub struct ConnectionGate {
    state: watch::Receiver<ConnectionState>,
}

impl ConnectionGate {
    pub fn new(state: watch::Receiver<ConnectionState>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Fails fast unless the last known state is `connected`.
    pub fn assert_ready(&self) -> Result<(), DispatchError> {
        let state = self.state();
        if state.is_connected() {
            Ok(())
        } else {
            Err(DispatchError::NotConnected {
                state: state.to_string(),
            })
        }
    }
}

/// Polls the channel status on a fixed period, independent of any dispatch
/// session, and publishes the result to every [`ConnectionGate`].
pub struct StatusPoller {
    channel: Arc<dyn MessagingChannel>,
    state: watch::Sender<ConnectionState>,
    poll_interval: Duration,
}

impl StatusPoller {
    pub fn new(channel: Arc<dyn MessagingChannel>, poll_interval: Duration) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            channel,
            state,
            poll_interval,
        }
    }

    pub fn gate(&self) -> ConnectionGate {
        ConnectionGate::new(self.state.subscribe())
    }

    pub fn current(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Queries the channel once. A failed query leaves the last known state
    /// untouched.
    pub async fn poll(&self) -> ConnectionState {
        match self.channel.get_status().await {
            Ok(status) => {
                let next = status.connection_state();
                let changed = self.state.send_if_modified(|current| {
                    if *current == next {
                        false
                    } else {
                        *current = next.clone();
                        true
                    }
                });
                if changed {
                    info!("Messaging channel is now {}", next);
                }
                next
            }
            Err(e) => {
                let current = self.current();
                warn!("Status poll failed, keeping state {}: {}", current, e);
                current
            }
        }
    }

    /// Starts the polling loop. It stops when `cancel` fires.
    pub fn spawn(self: Arc<Self>, cancel: CancellationToken) -> JoinHandle<()> {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        info!("Status poller shutting down");
                        break;
                    }
                    _ = ticker.tick() => {
                        let state = self.poll().await;
                        debug!("Status poll result: {}", state);
                    }
                }
            }
        })
    }

    /// Logs the channel out. Best-effort: a failure is logged, leaves the
    /// published state alone and yields `false`.
    pub async fn disconnect(&self) -> bool {
        match self.channel.disconnect().await {
            Ok(()) => {
                info!("Messaging channel disconnected");
                self.state.send_replace(ConnectionState::Disconnected);
                true
            }
            Err(e) => {
                warn!("Failed to disconnect messaging channel: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ScriptedChannel;
    use bulk_sender_core::{ChannelError, StatusResponse};

    fn status(value: &str, qr_code: Option<&str>) -> Result<StatusResponse, ChannelError> {
        Ok(StatusResponse {
            status: value.to_string(),
            qr_code: qr_code.map(str::to_string),
        })
    }

    #[tokio::test]
    async fn test_poll_publishes_state_to_gate() {
        let channel = Arc::new(ScriptedChannel::new());
        channel.push_status(status("connected", None));
        let poller = StatusPoller::new(channel, Duration::from_secs(5));
        let gate = poller.gate();

        assert!(gate.assert_ready().is_err());
        assert_eq!(poller.poll().await, ConnectionState::Connected);
        assert!(gate.assert_ready().is_ok());
    }

    #[tokio::test]
    async fn test_poll_error_keeps_last_state() {
        let channel = Arc::new(ScriptedChannel::new());
        channel.push_status(status("connected", None));
        channel.push_status(Err(ChannelError::from_status(502, None)));
        channel.push_status(Err(ChannelError::Connectivity("reset".into())));
        let poller = StatusPoller::new(channel, Duration::from_secs(5));

        poller.poll().await;
        assert_eq!(poller.poll().await, ConnectionState::Connected);
        assert_eq!(poller.poll().await, ConnectionState::Connected);
        assert!(poller.gate().assert_ready().is_ok());
    }

    #[tokio::test]
    async fn test_pairing_state_blocks_dispatch() {
        let channel = Arc::new(ScriptedChannel::new());
        channel.push_status(status("disconnected", Some("2@qr-payload")));
        let poller = StatusPoller::new(channel, Duration::from_secs(5));

        let state = poller.poll().await;
        assert_eq!(state.qr_code(), Some("2@qr-payload"));
        match poller.gate().assert_ready() {
            Err(DispatchError::NotConnected { state }) => assert_eq!(state, "pairing"),
            other => panic!("unexpected gate result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_spawned_poller_runs_until_cancelled() {
        let channel = Arc::new(ScriptedChannel::new());
        channel.push_status(status("connected", None));
        let poller = Arc::new(StatusPoller::new(channel.clone(), Duration::from_millis(5)));
        let gate = poller.gate();
        let cancel = CancellationToken::new();

        let handle = poller.clone().spawn(cancel.clone());
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(gate.assert_ready().is_ok());
        assert!(channel.status_calls() >= 2);

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_is_best_effort() {
        let channel = Arc::new(ScriptedChannel::new());
        channel.push_status(status("connected", None));
        channel.fail_disconnect(ChannelError::Connectivity("down".into()));
        let poller = StatusPoller::new(channel.clone(), Duration::from_secs(5));
        poller.poll().await;

        assert!(!poller.disconnect().await);
        assert_eq!(channel.disconnect_calls(), 1);
        assert_eq!(poller.current(), ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_acknowledged_disconnect_closes_gate() {
        let channel = Arc::new(ScriptedChannel::connected());
        let poller = StatusPoller::new(channel.clone(), Duration::from_secs(5));
        poller.poll().await;

        assert!(poller.disconnect().await);
        assert!(poller.gate().assert_ready().is_err());
    }
}
