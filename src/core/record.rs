//! Memory Record - configuration entity describing a memory backend

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordMetadata {
    pub name: String,
    pub namespace: String,
    #[serde(default)]
    pub uid: String,
    /// Bumped by the store on every successful write.
    #[serde(default)]
    pub resource_version: u64,
}

/// How to locate the backend. Exactly one source should be set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value_from: Option<ValueFrom>,
}

impl AddressSpec {
    pub fn literal(url: impl Into<String>) -> Self {
        Self {
            value: Some(url.into()),
            value_from: None,
        }
    }

    pub fn secret(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            value: None,
            value_from: Some(ValueFrom {
                secret_key_ref: Some(KeyRef::new(name, key)),
                ..Default::default()
            }),
        }
    }

    pub fn config_map(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            value: None,
            value_from: Some(ValueFrom {
                config_map_key_ref: Some(KeyRef::new(name, key)),
                ..Default::default()
            }),
        }
    }

    pub fn service(service: ServiceRef) -> Self {
        Self {
            value: None,
            value_from: Some(ValueFrom {
                service_ref: Some(service),
                ..Default::default()
            }),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueFrom {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_map_key_ref: Option<KeyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_key_ref: Option<KeyRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_ref: Option<ServiceRef>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeyRef {
    pub name: String,
    pub key: String,
}

impl KeyRef {
    pub fn new(name: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            key: key.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemorySpec {
    pub address: AddressSpec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_resolved_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryRecord {
    pub metadata: RecordMetadata,
    pub spec: MemorySpec,
    #[serde(default)]
    pub status: MemoryStatus,
}

impl MemoryRecord {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        address: AddressSpec,
    ) -> Self {
        Self {
            metadata: RecordMetadata {
                name: name.into(),
                namespace: namespace.into(),
                ..Default::default()
            },
            spec: MemorySpec {
                address,
                description: None,
            },
            status: MemoryStatus::default(),
        }
    }

    pub fn with_uid(mut self, uid: impl Into<String>) -> Self {
        self.metadata.uid = uid.into();
        self
    }

    pub fn with_resolved_address(mut self, address: impl Into<String>) -> Self {
        self.status.last_resolved_address = Some(address.into());
        self
    }

    /// `namespace/name`, used to identify the record in logs and errors.
    pub fn target(&self) -> String {
        format!("{}/{}", self.metadata.namespace, self.metadata.name)
    }
}
