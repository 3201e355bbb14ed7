// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Request and response bodies of the metal API `v1` surface used by this crate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A metal network
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projectid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partitionid: Option<String>,
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub destinationprefixes: Vec<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub privatesuper: bool,
    #[serde(default)]
    pub underlay: bool,
    #[serde(default)]
    pub nat: bool,
}

impl Network {
    /// `true` if the network carries `label` (any value)
    #[must_use]
    pub fn has_label(&self, label: &str) -> bool {
        self.labels.contains_key(label)
    }

    /// Project of the network; empty for shared networks
    #[must_use]
    pub fn project(&self) -> &str {
        self.projectid.as_deref().unwrap_or_default()
    }

    /// Partition of the network; empty for partition-less networks
    #[must_use]
    pub fn partition(&self) -> &str {
        self.partitionid.as_deref().unwrap_or_default()
    }
}

/// Network search criteria; unset fields do not filter
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkFindRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projectid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partitionid: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub prefixes: Vec<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Request to allocate a child network from the partition's private super network
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkAllocateRequest {
    pub projectid: String,
    pub partitionid: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// Partition reference of a machine
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionRef {
    pub id: String,
}

/// Size reference of a machine
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRef {
    pub id: String,
}

/// Image reference of an allocation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: String,
}

/// Network attached to an allocation
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllocationNetwork {
    pub networkid: String,
    #[serde(default)]
    pub prefixes: Vec<String>,
    #[serde(default)]
    pub ips: Vec<String>,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub underlay: bool,
}

/// Allocation of a machine to a project
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageRef>,
    #[serde(default)]
    pub networks: Vec<AllocationNetwork>,
    #[serde(default)]
    pub succeeded: bool,
    #[serde(default)]
    pub user_data: String,
    #[serde(default)]
    pub ssh_pub_keys: Vec<String>,
}

/// A machine or firewall
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Machine {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partition: Option<PartitionRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<SizeRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation: Option<Allocation>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl Machine {
    /// Project of the allocation; empty if unallocated
    #[must_use]
    pub fn project(&self) -> &str {
        self.allocation
            .as_ref()
            .map(|a| a.project.as_str())
            .unwrap_or_default()
    }

    /// `true` once the allocation finished
    #[must_use]
    pub fn allocation_succeeded(&self) -> bool {
        self.allocation.as_ref().is_some_and(|a| a.succeeded)
    }

    /// Partition id; empty if unknown
    #[must_use]
    pub fn partition_id(&self) -> &str {
        self.partition
            .as_ref()
            .map(|p| p.id.as_str())
            .unwrap_or_default()
    }
}

/// Firewall search criteria
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallFindRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocation_project: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// Network of a firewall allocation request
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MachineAllocationNetwork {
    pub networkid: String,
    pub autoacquire: bool,
}

/// Request to allocate a firewall
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallCreateRequest {
    pub name: String,
    pub hostname: String,
    #[serde(default)]
    pub description: String,
    pub partitionid: String,
    pub projectid: String,
    pub sizeid: String,
    pub imageid: String,
    pub networks: Vec<MachineAllocationNetwork>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ssh_pub_keys: Vec<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_data: String,
}

/// An IP address
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ip {
    pub ipaddress: String,
    #[serde(default)]
    pub projectid: String,
    #[serde(default)]
    pub networkid: String,
    #[serde(rename = "type", default)]
    pub ip_type: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// IP search criteria
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpFindRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projectid: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub ip_type: Option<String>,
}

/// Replace the mutable fields of an IP
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IpUpdateRequest {
    pub ipaddress: String,
    #[serde(rename = "type")]
    pub ip_type: String,
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
