//! Scripted in-memory backend for exercising the discovery engine.

use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use parking_lot::Mutex;
use shared::types::ServiceIdentity;
use crate::error::DiscoveryError;
use crate::mdns::decode::RawValue;
use crate::mdns::engine::{DiscoveryBackend, LifecycleEvent, ResolvedService};

pub fn resolved(address: &str, port: u16, properties: &[(&str, &str)]) -> ResolvedService {
    ResolvedService {
        addresses: vec![address.parse::<Ipv4Addr>().unwrap()],
        port,
        properties: properties
            .iter()
            .map(|(k, v)| (k.as_bytes().to_vec(), RawValue::from(v.as_bytes())))
            .collect(),
    }
}

impl ResolvedService {
    pub fn without_addresses(mut self) -> Self {
        self.addresses.clear();
        self
    }
}

/// Events pushed before `run` are queued on the subscription channel.
/// Each identity has a queue of resolutions; the last one repeats.
pub struct FakeBackend {
    tx: Mutex<Option<flume::Sender<LifecycleEvent>>>,
    rx: Mutex<Option<flume::Receiver<LifecycleEvent>>>,
    resolutions: Mutex<HashMap<ServiceIdentity, VecDeque<ResolvedService>>>,
    unsubscribed: Mutex<Vec<String>>,
    fail_subscribe: bool,
}

impl FakeBackend {
    pub fn new() -> Self {
        let (tx, rx) = flume::unbounded();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
            resolutions: Mutex::new(HashMap::new()),
            unsubscribed: Mutex::new(Vec::new()),
            fail_subscribe: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_subscribe: true,
            ..Self::new()
        }
    }

    pub fn push(&self, event: LifecycleEvent) {
        if let Some(tx) = self.tx.lock().as_ref() {
            tx.send(event).unwrap();
        }
    }

    pub fn set_resolution(&self, identity: &ServiceIdentity, info: ResolvedService) {
        self.resolutions
            .lock()
            .entry(identity.clone())
            .or_default()
            .push_back(info);
    }

    /// Drop the sending side so the subscription ends once drained
    pub fn disconnect(&self) {
        self.tx.lock().take();
    }

    pub fn unsubscribed(&self) -> Vec<String> {
        self.unsubscribed.lock().clone()
    }
}

impl DiscoveryBackend for FakeBackend {
    fn subscribe(&self, service_type: &str) -> Result<flume::Receiver<LifecycleEvent>, DiscoveryError> {
        if self.fail_subscribe {
            return Err(DiscoveryError::Subscribe {
                service_type: service_type.to_string(),
                reason: "simulated".to_string(),
            });
        }
        self.rx
            .lock()
            .take()
            .ok_or_else(|| DiscoveryError::Backend("already subscribed".to_string()))
    }

    fn resolve(&self, identity: &ServiceIdentity) -> Option<ResolvedService> {
        let mut resolutions = self.resolutions.lock();
        let queue = resolutions.get_mut(identity)?;
        if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        }
    }

    fn unsubscribe(&self, service_type: &str) -> Result<(), DiscoveryError> {
        self.unsubscribed.lock().push(service_type.to_string());
        Ok(())
    }
}
