//! Notifications emitted to off-engine observers

use crate::common::types::{AccountId, Asset, RequestId};
use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent<S, O> {
    RollRequested {
        request_id: RequestId,
        player: AccountId,
        stake: u64,
        selection: S,
        asset: Asset,
    },
    RollFulfilled {
        request_id: RequestId,
        player: AccountId,
        outcome: O,
        won: bool,
        payout: u64,
        asset: Asset,
    },
    BetSettled {
        player: AccountId,
        stake: u64,
        selection: S,
        outcome: O,
        won: bool,
        payout: u64,
        asset: Asset,
    },
    BetCancelled {
        request_id: RequestId,
        player: AccountId,
        refund: u64,
        asset: Asset,
    },
}

impl<S, O> EngineEvent<S, O> {
    pub fn name(&self) -> &'static str {
        match self {
            EngineEvent::RollRequested { .. } => "roll_requested",
            EngineEvent::RollFulfilled { .. } => "roll_fulfilled",
            EngineEvent::BetSettled { .. } => "bet_settled",
            EngineEvent::BetCancelled { .. } => "bet_cancelled",
        }
    }
}

/// Receiver of engine notifications
pub trait EventSink<S, O>: Send + Sync {
    fn emit(&self, event: EngineEvent<S, O>);
}

/// Logs every event as a JSON line at `info`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl<S: Serialize, O: Serialize> EventSink<S, O> for TracingEventSink {
    fn emit(&self, event: EngineEvent<S, O>) {
        match serde_json::to_string(&event) {
            Ok(json) => tracing::info!(target: "vrf_wager::events", "{}", json),
            Err(e) => tracing::warn!("Failed to serialize {} event: {}", event.name(), e),
        }
    }
}

/// Keeps every event in memory; cloned out with [`MemoryEventSink::events`]
pub struct MemoryEventSink<S, O> {
    events: Mutex<Vec<EngineEvent<S, O>>>,
}

impl<S, O> MemoryEventSink<S, O> {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }
}

impl<S, O> Default for MemoryEventSink<S, O> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Clone, O: Clone> MemoryEventSink<S, O> {
    pub fn events(&self) -> Vec<EngineEvent<S, O>> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn drain(&self) -> Vec<EngineEvent<S, O>> {
        self.events
            .lock()
            .map(|mut e| std::mem::take(&mut *e))
            .unwrap_or_default()
    }
}

impl<S: Send, O: Send> EventSink<S, O> for MemoryEventSink<S, O> {
    fn emit(&self, event: EngineEvent<S, O>) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Fans one event out to several sinks
pub struct FanoutEventSink<S, O> {
    sinks: Vec<std::sync::Arc<dyn EventSink<S, O>>>,
}

impl<S, O> FanoutEventSink<S, O> {
    pub fn new(sinks: Vec<std::sync::Arc<dyn EventSink<S, O>>>) -> Self {
        Self { sinks }
    }
}

impl<S: Clone, O: Clone> EventSink<S, O> for FanoutEventSink<S, O>
where
    S: Send + Sync,
    O: Send + Sync,
{
    fn emit(&self, event: EngineEvent<S, O>) {
        for sink in &self.sinks {
            sink.emit(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_tag() {
        let event: EngineEvent<u8, u8> = EngineEvent::RollRequested {
            request_id: RequestId(3),
            player: AccountId::from("alice"),
            stake: 100,
            selection: 50,
            asset: Asset::Native,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "roll_requested");
        assert_eq!(json["request_id"], 3);
        assert_eq!(json["player"], "alice");
        assert_eq!(json["asset"]["kind"], "native");
    }

    #[test]
    fn test_memory_sink_drain() {
        let sink: MemoryEventSink<u8, u8> = MemoryEventSink::new();
        sink.emit(EngineEvent::BetCancelled {
            request_id: RequestId(1),
            player: AccountId::from("bob"),
            refund: 10,
            asset: Asset::token("USDC"),
        });
        assert_eq!(sink.events().len(), 1);
        assert_eq!(sink.drain().len(), 1);
        assert!(sink.events().is_empty());
    }
}
