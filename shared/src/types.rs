use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};

/// A TXT property value after decoding.
/// Most properties carry a single string; list-valued payloads keep their order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Text(String),
    List(Vec<String>),
}

/// (name, type) pair identifying one advertised service within a discovery session
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceIdentity {
    pub name: String,
    pub service_type: String,
}

impl ServiceIdentity {
    pub fn new(name: impl Into<String>, service_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            service_type: service_type.into(),
        }
    }
}

/// A discovered service on the network.
/// Field order is the order used in the exported document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceRecord {
    /// Full DNS-SD instance name, e.g. "wled-kitchen._wled._tcp.local."
    pub name: String,

    /// Service type, e.g. "_wled._tcp.local."
    #[serde(rename = "type")]
    pub service_type: String,

    /// IPv4 address, dotted decimal
    pub address: String,

    /// Service port
    pub port: u16,

    /// TXT record properties, keys sorted
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ServiceRecord {
    pub fn identity(&self) -> ServiceIdentity {
        ServiceIdentity::new(self.name.clone(), self.service_type.clone())
    }

    /// Merge a freshly resolved record into this one.
    /// Incoming fields overwrite; properties the update no longer carries are kept.
    pub fn merge(&mut self, update: ServiceRecord) {
        self.address = update.address;
        self.port = update.port;
        self.properties.extend(update.properties);
    }

    /// Instance label without the ".<service type>" suffix
    pub fn instance_label(&self) -> &str {
        let suffix = self.service_type.trim_start_matches('.');
        self.name
            .strip_suffix(suffix)
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|rest| !rest.is_empty())
            .unwrap_or(&self.name)
    }

    /// URL a browser should open to reach the device's web UI
    pub fn url(&self) -> String {
        if self.port == 80 {
            format!("http://{}/", self.address)
        } else {
            format!("http://{}:{}/", self.address, self.port)
        }
    }
}

/// A bookmark row created in moz_bookmarks.
/// Timestamps are microseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkEntry {
    pub id: i64,
    pub title: String,
    pub url: String,
    pub parent_id: i64,
    pub position: i64,
    pub date_added: i64,
    pub last_modified: i64,
}

/// A folder row in moz_bookmarks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderRecord {
    pub id: i64,
    pub title: String,
    pub parent_id: i64,
}
