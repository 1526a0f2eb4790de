//! Fire-and-forget lifecycle events delivered through `EventBus::send`.
//! Nothing in the broker blocks on delivery; a slow or full subscriber
//! only loses events, it never stalls a handler.

use crate::ids::{JobId, WorkerCategory};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionalAnalysisEvent {
    Started,
    Completed,
    Canceled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerRole {
    OnDemand,
    Spot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Requested { role: WorkerRole, count: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrokerEvent {
    Regional {
        job_id: JobId,
        category: WorkerCategory,
        event: RegionalAnalysisEvent,
    },
    Worker {
        category: WorkerCategory,
        event: WorkerEvent,
    },
    Error {
        job_id: Option<JobId>,
        message: String,
    },
}

pub trait EventBus: Send + Sync {
    fn send(&self, event: BrokerEvent);
}

/// Default sink: every event becomes a structured log line. Cheap, always
/// available, and enough for an operator tailing logs.
#[derive(Default)]
pub struct TracingEventBus;

impl EventBus for TracingEventBus {
    fn send(&self, event: BrokerEvent) {
        match event {
            BrokerEvent::Regional {
                job_id,
                category,
                event,
            } => {
                tracing::info!(%job_id, %category, ?event, "regional analysis event");
            }
            BrokerEvent::Worker { category, event } => {
                tracing::info!(%category, ?event, "worker event");
            }
            BrokerEvent::Error { job_id, message } => {
                tracing::error!(?job_id, %message, "error event");
            }
        }
    }
}

/// A bounded channel an operator or test harness can subscribe to.
/// Events are dropped (not blocked on) when the channel is full, matching
/// the fire-and-forget contract.
pub struct ChannelEventBus {
    sender: mpsc::Sender<BrokerEvent>,
}

impl ChannelEventBus {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<BrokerEvent>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

impl EventBus for ChannelEventBus {
    fn send(&self, event: BrokerEvent) {
        if self.sender.try_send(event).is_err() {
            tracing::debug!("event channel full or closed, dropping event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn channel_bus_delivers_events() {
        let (bus, mut rx) = ChannelEventBus::new(4);
        let category = WorkerCategory::new("net", "1.0");
        bus.send(BrokerEvent::Worker {
            category: category.clone(),
            event: WorkerEvent::Requested {
                role: WorkerRole::Spot,
                count: 3,
            },
        });
        let received = rx.recv().await.unwrap();
        assert_eq!(
            received,
            BrokerEvent::Worker {
                category,
                event: WorkerEvent::Requested {
                    role: WorkerRole::Spot,
                    count: 3
                }
            }
        );
    }

    #[test]
    fn channel_bus_drops_when_full_without_blocking() {
        let (bus, _rx) = ChannelEventBus::new(1);
        let category = WorkerCategory::new("net", "1.0");
        for _ in 0..5 {
            bus.send(BrokerEvent::Worker {
                category: category.clone(),
                event: WorkerEvent::Requested {
                    role: WorkerRole::OnDemand,
                    count: 1,
                },
            });
        }
    }
}
