//! Cluster topology: roles, members, and derived attributes.
//!
//! A [`Role`] is a distinguished class of Ceph daemon tracked as a unit for
//! scaling and health purposes. A [`ClusterTopology`] maps each role to the
//! member instances observed in the last verified fetch; it is only
//! trustworthy immediately after a successful controller run and is never
//! kept live-synced.

use std::collections::HashMap;

use serde_json::{Value, json};

use crate::error::{EngineError, Result};
use crate::snapshot::ResourceRecord;

/// Default monitor client port.
pub const DEFAULT_MON_PORT: u16 = 6789;

/// Default metadata-server port.
pub const DEFAULT_MDS_PORT: u16 = 6801;

/// JSON pointer to a member pod's first container port.
const ROUTING_PORT_POINTER: &str = "/spec/containers/0/ports/0/containerPort";

/// A distinguished cluster role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Ceph monitor.
    Mon,
    /// Ceph metadata server.
    Mds,
}

impl Role {
    /// Label selector matching this role's member pods.
    pub fn label_selector(&self) -> &'static str {
        match self {
            Role::Mon => "app=rook-ceph-mon",
            Role::Mds => "app=rook-ceph-mds",
        }
    }

    /// The custom resource kind that carries this role's desired count.
    pub fn custom_resource_kind(&self) -> &'static str {
        match self {
            Role::Mon => "CephCluster",
            Role::Mds => "CephFilesystem",
        }
    }

    /// JSON merge patch setting this role's desired member count.
    pub fn count_patch(&self, count: u32) -> Value {
        match self {
            Role::Mon => json!({ "spec": { "mon": { "count": count } } }),
            Role::Mds => json!({ "spec": { "metadataServer": { "activeCount": count } } }),
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Mon => write!(f, "mon"),
            Role::Mds => write!(f, "mds"),
        }
    }
}

/// One member instance of a role, with attributes derived from its snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopologyMember {
    /// Pod name.
    pub name: String,
    /// Status phase at verification time.
    pub phase: Option<String>,
    /// Port the member routes client traffic on, read from the first
    /// container's first declared port.
    pub routing_port: u16,
}

impl TopologyMember {
    /// Derive a member from its pod record.
    ///
    /// The routing port is read with explicit presence checks; an absent or
    /// unusable port field is a typed [`EngineError::MissingField`], never a
    /// panic.
    pub fn from_record(record: &ResourceRecord) -> Result<Self> {
        let routing_port = record
            .raw
            .pointer(ROUTING_PORT_POINTER)
            .and_then(Value::as_u64)
            .and_then(|port| u16::try_from(port).ok())
            .ok_or_else(|| EngineError::MissingField {
                resource: record.name.clone(),
                path: ".spec.containers[0].ports[0].containerPort".to_string(),
            })?;
        Ok(Self {
            name: record.name.clone(),
            phase: record.phase.clone(),
            routing_port,
        })
    }
}

/// Mapping from role to its live member instances.
///
/// Owned exclusively by the controller that last rebuilt it; never shared
/// for concurrent write.
#[derive(Debug, Clone, Default)]
pub struct ClusterTopology {
    members: HashMap<Role, Vec<TopologyMember>>,
}

impl ClusterTopology {
    /// Create an empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a role's member list wholesale.
    pub fn replace(&mut self, role: Role, members: Vec<TopologyMember>) {
        self.members.insert(role, members);
    }

    /// The members last verified for a role.
    pub fn members(&self, role: Role) -> &[TopologyMember] {
        self.members.get(&role).map_or(&[], Vec::as_slice)
    }

    /// Number of members last verified for a role.
    pub fn count(&self, role: Role) -> usize {
        self.members(role).len()
    }

    /// Roles with at least one verified member list.
    pub fn roles(&self) -> impl Iterator<Item = Role> + '_ {
        self.members.keys().copied()
    }
}
