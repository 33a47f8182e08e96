use std::collections::{HashMap, HashSet};
use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use mdns_sd::{ServiceDaemon, ServiceEvent, ServiceInfo};
use parking_lot::Mutex;
use shared::types::ServiceIdentity;
use crate::error::DiscoveryError;
use crate::mdns::decode::{RawProperties, RawValue};
use crate::mdns::engine::{DiscoveryBackend, LifecycleEvent, ResolvedService};

/// mdns-sd backed discovery backend.
///
/// mdns-sd only reports resolutions, so the first usable resolution of a
/// fullname becomes `Added` and any later one `Updated`. The last resolved
/// info per fullname is cached to answer `resolve`.
pub struct MdnsBrowser {
    daemon: ServiceDaemon,
    resolved: Arc<Mutex<HashMap<String, ServiceInfo>>>,
}

impl MdnsBrowser {
    pub fn new() -> Result<Self, DiscoveryError> {
        let daemon = ServiceDaemon::new()
            .map_err(|e| DiscoveryError::Backend(format!("Failed to create mDNS daemon: {}", e)))?;

        Ok(Self {
            daemon,
            resolved: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    pub fn shutdown(&self) -> Result<(), DiscoveryError> {
        self.daemon
            .shutdown()
            .map(|_| ())
            .map_err(|e| DiscoveryError::Backend(format!("Failed to shutdown mDNS daemon: {}", e)))
    }
}

impl DiscoveryBackend for MdnsBrowser {
    fn subscribe(&self, service_type: &str) -> Result<flume::Receiver<LifecycleEvent>, DiscoveryError> {
        let receiver = self
            .daemon
            .browse(service_type)
            .map_err(|e| DiscoveryError::Subscribe {
                service_type: service_type.to_string(),
                reason: e.to_string(),
            })?;

        let (tx, rx) = flume::unbounded();
        let resolved = self.resolved.clone();
        tokio::spawn(forward_events(receiver, tx, resolved));

        Ok(rx)
    }

    fn resolve(&self, identity: &ServiceIdentity) -> Option<ResolvedService> {
        let resolved = self.resolved.lock();
        let info = resolved.get(&identity.name)?;
        if info.get_type() != identity.service_type {
            return None;
        }
        Some(convert_service_info(info))
    }

    fn unsubscribe(&self, service_type: &str) -> Result<(), DiscoveryError> {
        self.daemon
            .stop_browse(service_type)
            .map_err(|e| DiscoveryError::Backend(format!("Failed to stop browsing {}: {}", service_type, e)))
    }
}

/// Translate daemon events into lifecycle events until the browse stops
/// or the engine drops its receiver.
///
/// A fullname only counts as announced once a resolution with an IPv4
/// address went out; until then every resolution is sent as `Added`.
async fn forward_events(
    receiver: flume::Receiver<ServiceEvent>,
    tx: flume::Sender<LifecycleEvent>,
    resolved: Arc<Mutex<HashMap<String, ServiceInfo>>>,
) {
    let mut announced: HashSet<String> = HashSet::new();

    while let Ok(event) = receiver.recv_async().await {
        let lifecycle = match event {
            ServiceEvent::ServiceResolved(info) => {
                let identity = ServiceIdentity::new(info.get_fullname(), info.get_type());
                let usable = has_ipv4(&info);
                resolved.lock().insert(identity.name.clone(), info);

                if announced.contains(&identity.name) {
                    LifecycleEvent::Updated(identity)
                } else {
                    if usable {
                        announced.insert(identity.name.clone());
                    }
                    LifecycleEvent::Added(identity)
                }
            }
            ServiceEvent::ServiceRemoved(service_type, fullname) => {
                resolved.lock().remove(&fullname);
                announced.remove(&fullname);
                LifecycleEvent::Removed(ServiceIdentity::new(fullname, service_type))
            }
            ServiceEvent::SearchStopped(service_type) => {
                tracing::debug!("Browse stopped for {}", service_type);
                break;
            }
            _ => continue,
        };

        if tx.send_async(lifecycle).await.is_err() {
            break;
        }
    }
}

fn has_ipv4(info: &ServiceInfo) -> bool {
    info.get_addresses().iter().any(|addr| addr.is_ipv4())
}

/// Convert an mdns-sd ServiceInfo into raw resolved data
fn convert_service_info(info: &ServiceInfo) -> ResolvedService {
    // IPv4 only, sorted so the chosen address is stable
    let mut addresses: Vec<Ipv4Addr> = info
        .get_addresses()
        .iter()
        .filter_map(|addr| match addr {
            IpAddr::V4(ipv4) => Some(*ipv4),
            _ => None,
        })
        .collect();
    addresses.sort();

    // A key repeated in the TXT record becomes a list value
    let mut properties: RawProperties = Vec::new();
    for prop in info.get_properties().iter() {
        let key = prop.key().as_bytes().to_vec();
        let value = prop.val().unwrap_or_default().to_vec();

        let Some(index) = properties.iter().position(|(k, _)| *k == key) else {
            properties.push((key, RawValue::Bytes(value)));
            continue;
        };
        let existing = &mut properties[index].1;
        match existing {
            RawValue::List(items) => items.push(value),
            RawValue::Bytes(first) => {
                let first = std::mem::take(first);
                *existing = RawValue::List(vec![first, value]);
            }
        }
    }

    ResolvedService {
        addresses,
        port: info.get_port(),
        properties,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mdns::decode::decode_properties;
    use shared::types::PropertyValue;

    fn service_info(ip: &str, txt: HashMap<String, String>) -> ServiceInfo {
        ServiceInfo::new("_wled._tcp.local.", "wled-a", "wled-a.local.", ip, 80, txt).unwrap()
    }

    #[test]
    fn test_convert_ipv4_and_txt() {
        let txt = HashMap::from([("mac".to_string(), "a8032a1b2c3d".to_string())]);
        let info = service_info("192.168.1.10", txt);

        let converted = convert_service_info(&info);
        assert_eq!(converted.addresses, vec![Ipv4Addr::new(192, 168, 1, 10)]);
        assert_eq!(converted.port, 80);

        let props = decode_properties(&converted.properties);
        assert_eq!(props["mac"], PropertyValue::Text("a8032a1b2c3d".to_string()));
    }

    #[test]
    fn test_convert_drops_ipv6() {
        let info = service_info("fe80::1", HashMap::new());
        assert!(convert_service_info(&info).addresses.is_empty());
    }

    fn service_info_at(ip: &str) -> ServiceInfo {
        service_info(ip, HashMap::new())
    }

    /// Feed daemon events through the forwarder and collect what it emits
    async fn forward(events: Vec<ServiceEvent>) -> (Vec<LifecycleEvent>, Arc<Mutex<HashMap<String, ServiceInfo>>>) {
        let (daemon_tx, daemon_rx) = flume::unbounded();
        let (tx, rx) = flume::unbounded();
        let resolved = Arc::new(Mutex::new(HashMap::new()));

        for event in events {
            daemon_tx.send(event).unwrap();
        }
        drop(daemon_tx);

        forward_events(daemon_rx, tx, resolved.clone()).await;
        (rx.drain().collect(), resolved)
    }

    fn wled_a() -> ServiceIdentity {
        ServiceIdentity::new("wled-a._wled._tcp.local.", "_wled._tcp.local.")
    }

    #[tokio::test]
    async fn test_forward_maps_resolutions_to_lifecycle() {
        let (emitted, resolved) = forward(vec![
            ServiceEvent::ServiceResolved(service_info_at("192.168.1.10")),
            ServiceEvent::ServiceResolved(service_info_at("192.168.1.11")),
            ServiceEvent::ServiceRemoved("_wled._tcp.local.".to_string(), "wled-a._wled._tcp.local.".to_string()),
            ServiceEvent::ServiceResolved(service_info_at("192.168.1.12")),
        ])
        .await;

        assert_eq!(
            emitted,
            vec![
                LifecycleEvent::Added(wled_a()),
                LifecycleEvent::Updated(wled_a()),
                LifecycleEvent::Removed(wled_a()),
                LifecycleEvent::Added(wled_a()),
            ]
        );
        assert!(resolved.lock().contains_key("wled-a._wled._tcp.local."));
    }

    #[tokio::test]
    async fn test_ipv6_only_resolution_does_not_mark_announced() {
        let (emitted, resolved) = forward(vec![
            ServiceEvent::ServiceResolved(service_info_at("fe80::1")),
            ServiceEvent::ServiceResolved(service_info_at("192.168.1.10")),
            ServiceEvent::ServiceResolved(service_info_at("192.168.1.10")),
        ])
        .await;

        assert_eq!(
            emitted,
            vec![
                LifecycleEvent::Added(wled_a()),
                LifecycleEvent::Added(wled_a()),
                LifecycleEvent::Updated(wled_a()),
            ]
        );
        let cached = convert_service_info(&resolved.lock()["wled-a._wled._tcp.local."]);
        assert_eq!(cached.addresses, vec![Ipv4Addr::new(192, 168, 1, 10)]);
    }

    #[tokio::test]
    async fn test_stops_on_search_stopped() {
        let (emitted, _) = forward(vec![
            ServiceEvent::SearchStopped("_wled._tcp.local.".to_string()),
            ServiceEvent::ServiceResolved(service_info_at("192.168.1.10")),
        ])
        .await;

        assert!(emitted.is_empty());
    }

    #[test]
    fn test_fullname_matches_identity() {
        let info = service_info("192.168.1.10", HashMap::new());
        assert_eq!(info.get_fullname(), "wled-a._wled._tcp.local.");
        assert_eq!(info.get_type(), "_wled._tcp.local.");
    }
}
