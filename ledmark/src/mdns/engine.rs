use std::collections::HashSet;
use std::net::Ipv4Addr;
use std::time::Duration;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use shared::types::{ServiceIdentity, ServiceRecord};
use crate::error::DiscoveryError;
use crate::mdns::decode::{decode_properties, RawProperties};

/// Lifecycle notification delivered by a discovery subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Added(ServiceIdentity),
    Updated(ServiceIdentity),
    Removed(ServiceIdentity),
}

/// Full service info as returned by a backend resolve
#[derive(Debug, Clone)]
pub struct ResolvedService {
    pub addresses: Vec<Ipv4Addr>,
    pub port: u16,
    pub properties: RawProperties,
}

/// The protocol side of discovery: a browse subscription plus resolution
pub trait DiscoveryBackend: Send + Sync {
    fn subscribe(&self, service_type: &str) -> Result<flume::Receiver<LifecycleEvent>, DiscoveryError>;

    /// Returns None when the service cannot be resolved (yet)
    fn resolve(&self, identity: &ServiceIdentity) -> Option<ResolvedService>;

    fn unsubscribe(&self, service_type: &str) -> Result<(), DiscoveryError>;
}

/// Receiver side of lifecycle events
pub trait LifecycleHandler {
    fn on_add(&self, identity: &ServiceIdentity);
    fn on_update(&self, identity: &ServiceIdentity);
    fn on_remove(&self, identity: &ServiceIdentity);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Idle,
    Subscribed,
    Terminating,
    Closed,
}

enum Termination {
    Expired,
    Cancelled,
    Lost(String),
}

/// Known services in arrival order.
/// `seen` always holds exactly the identities present in `records`.
#[derive(Debug, Default)]
struct Registry {
    records: Vec<ServiceRecord>,
    seen: HashSet<ServiceIdentity>,
}

impl Registry {
    fn contains(&self, identity: &ServiceIdentity) -> bool {
        self.seen.contains(identity)
    }

    fn insert(&mut self, record: ServiceRecord) -> bool {
        if !self.seen.insert(record.identity()) {
            return false;
        }
        self.records.push(record);
        true
    }

    fn merge(&mut self, update: ServiceRecord) -> bool {
        let identity = update.identity();
        match self.records.iter_mut().find(|r| r.identity() == identity) {
            Some(existing) => {
                existing.merge(update);
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, identity: &ServiceIdentity) -> bool {
        if !self.seen.remove(identity) {
            return false;
        }
        self.records.retain(|r| r.name != identity.name || r.service_type != identity.service_type);
        true
    }
}

/// Clamp a signed duration in seconds to a discovery window
pub fn window(secs: i64) -> Duration {
    Duration::from_secs(secs.max(0) as u64)
}

/// Concurrent listener that tracks live services of one type.
/// Handlers resolve outside the registry lock and only lock for the mutation.
pub struct DiscoveryEngine<B> {
    backend: B,
    registry: Mutex<Registry>,
    state: Mutex<EngineState>,
}

impl<B: DiscoveryBackend> DiscoveryEngine<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            registry: Mutex::new(Registry::default()),
            state: Mutex::new(EngineState::Idle),
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn state(&self) -> EngineState {
        *self.state.lock()
    }

    /// Deep copy of the registry taken under the lock
    pub fn snapshot(&self) -> Vec<ServiceRecord> {
        self.registry.lock().records.clone()
    }

    /// Browse `service_type` for `duration` or until `cancel` fires, then
    /// close the subscription and return the final snapshot.
    pub async fn run(
        &self,
        service_type: &str,
        duration: Duration,
        cancel: CancellationToken,
    ) -> Result<Vec<ServiceRecord>, DiscoveryError> {
        let events = self.backend.subscribe(service_type)?;
        self.set_state(EngineState::Subscribed);
        tracing::info!(service_type, secs = duration.as_secs(), "Discovery started");

        let deadline = tokio::time::sleep(duration);
        tokio::pin!(deadline);

        let termination = loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break Termination::Cancelled,
                _ = &mut deadline => break Termination::Expired,
                event = events.recv_async() => match event {
                    Ok(event) => self.dispatch(&event),
                    Err(e) => break Termination::Lost(e.to_string()),
                },
            }
        };

        self.set_state(EngineState::Terminating);
        match &termination {
            Termination::Expired => tracing::debug!("Discovery window elapsed"),
            Termination::Cancelled => tracing::info!("Discovery cancelled"),
            Termination::Lost(reason) => tracing::error!(%reason, "Discovery subscription lost"),
        }

        drop(events);
        if let Err(e) = self.backend.unsubscribe(service_type) {
            tracing::warn!("Failed to close subscription for {}: {}", service_type, e);
        }

        let snapshot = self.snapshot();
        self.set_state(EngineState::Closed);
        tracing::info!(count = snapshot.len(), "Discovery finished");

        match termination {
            Termination::Lost(reason) => Err(DiscoveryError::SubscriptionLost { reason, snapshot }),
            Termination::Expired | Termination::Cancelled => Ok(snapshot),
        }
    }

    fn dispatch(&self, event: &LifecycleEvent) {
        match event {
            LifecycleEvent::Added(identity) => self.on_add(identity),
            LifecycleEvent::Updated(identity) => self.on_update(identity),
            LifecycleEvent::Removed(identity) => self.on_remove(identity),
        }
    }

    fn set_state(&self, state: EngineState) {
        *self.state.lock() = state;
    }

    fn resolve_record(&self, identity: &ServiceIdentity) -> Option<ServiceRecord> {
        let resolved = self.backend.resolve(identity)?;
        let address = resolved.addresses.first()?;

        Some(ServiceRecord {
            name: identity.name.clone(),
            service_type: identity.service_type.clone(),
            address: address.to_string(),
            port: resolved.port,
            properties: decode_properties(&resolved.properties),
        })
    }
}

impl<B: DiscoveryBackend> LifecycleHandler for DiscoveryEngine<B> {
    fn on_add(&self, identity: &ServiceIdentity) {
        if self.registry.lock().contains(identity) {
            return;
        }

        let Some(record) = self.resolve_record(identity) else {
            tracing::debug!(name = %identity.name, "No service info, ignoring add");
            return;
        };

        let address = record.address.clone();
        if self.registry.lock().insert(record) {
            tracing::info!(name = %identity.name, %address, "Service added");
        }
    }

    fn on_update(&self, identity: &ServiceIdentity) {
        if !self.registry.lock().contains(identity) {
            return;
        }

        let Some(record) = self.resolve_record(identity) else {
            tracing::debug!(name = %identity.name, "No service info, ignoring update");
            return;
        };

        let address = record.address.clone();
        if self.registry.lock().merge(record) {
            tracing::info!(name = %identity.name, %address, "Service updated");
        }
    }

    fn on_remove(&self, identity: &ServiceIdentity) {
        if self.registry.lock().remove(identity) {
            tracing::info!(name = %identity.name, "Service removed");
        }
    }
}
