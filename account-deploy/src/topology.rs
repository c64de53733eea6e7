use std::collections::{BTreeMap, HashSet};
use std::net::Ipv4Addr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DeployError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topology {
    pub stack: Stack,
    pub network: Network,
    pub cluster: Cluster,
    pub load_balancer: LoadBalancer,
    pub service: Service,
    pub dns: Dns,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stack {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub cidr: String,
    pub max_azs: u8,
    pub nat_gateways: u8,
    pub subnets: Vec<SubnetGroup>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubnetKind {
    Public,
    Private,
}

/// One subnet per availability zone is created for every group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubnetGroup {
    pub name: String,
    pub kind: SubnetKind,
    pub cidr_mask: u8,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cluster {
    #[serde(default)]
    pub container_insights: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancer {
    pub internet_facing: bool,
    pub listener_port: u16,
    pub certificate: Certificate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CertificateValidation {
    Dns,
    Email,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub domain_name: String,
    pub validation: CertificateValidation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub image: String,
    pub desired_count: u32,
    pub cpu: u32,
    pub memory_mib: u32,
    pub container_port: u16,
    #[serde(default)]
    pub assign_public_ip: bool,
    pub log_stream_prefix: String,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    /// Environment variable name to Secrets Manager secret name.
    #[serde(default)]
    pub secrets: BTreeMap<String, String>,
    pub health_check: HealthCheck,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    pub path: String,
    pub interval_secs: u32,
    pub timeout_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dns {
    pub zone_domain: String,
    pub record_name: String,
}

/// A concrete subnet: one group in one availability zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetPlan {
    pub logical_id: String,
    pub kind: SubnetKind,
    pub az_index: u8,
    pub cidr: String,
}

impl Topology {
    pub fn from_toml_str(raw: &str) -> Result<Self, DeployError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, DeployError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        debug!(path = %path.as_ref().display(), "topology loaded");
        Self::from_toml_str(&raw)
    }

    /// Collects every rule violation instead of stopping at the first.
    pub fn validate(&self) -> Result<(), DeployError> {
        let mut problems = Vec::new();
        self.validate_network(&mut problems);
        self.validate_service(&mut problems);
        self.validate_edge(&mut problems);

        if problems.is_empty() {
            Ok(())
        } else {
            debug!(count = problems.len(), "topology rejected");
            Err(DeployError::Invalid(problems))
        }
    }

    fn validate_network(&self, problems: &mut Vec<String>) {
        let network = &self.network;
        if network.max_azs < 2 {
            problems.push(format!(
                "network.max_azs must be at least 2, got {}",
                network.max_azs
            ));
        }
        if parse_cidr(&network.cidr).is_none() {
            problems.push(format!("network.cidr {:?} is not an IPv4 CIDR block", network.cidr));
        }

        let has = |kind| network.subnets.iter().any(|s| s.kind == kind);
        if !has(SubnetKind::Public) {
            problems.push("network needs a public subnet group".into());
        }
        if !has(SubnetKind::Private) {
            problems.push("network needs a private subnet group".into());
        } else if network.nat_gateways == 0 || network.nat_gateways > network.max_azs {
            problems.push(format!(
                "network.nat_gateways must be between 1 and {}, got {}",
                network.max_azs, network.nat_gateways
            ));
        }

        let mut names = HashSet::new();
        for subnet in &network.subnets {
            if !(16..=28).contains(&subnet.cidr_mask) {
                problems.push(format!(
                    "subnet {} has mask /{}, expected /16 to /28",
                    subnet.name, subnet.cidr_mask
                ));
            }
            if !names.insert(subnet.name.as_str()) {
                problems.push(format!("subnet name {} is used twice", subnet.name));
            }
        }

        if problems.is_empty() && self.subnet_plan().is_none() {
            problems.push(format!("subnets do not fit in {}", network.cidr));
        }
    }

    fn validate_service(&self, problems: &mut Vec<String>) {
        let service = &self.service;
        if service.desired_count < 1 {
            problems.push("service.desired_count must be at least 1".into());
        }
        if !fargate_size_supported(service.cpu, service.memory_mib) {
            problems.push(format!(
                "Fargate does not offer {} CPU units with {} MiB",
                service.cpu, service.memory_mib
            ));
        }
        if service.assign_public_ip {
            problems.push("service tasks must not get public IPs".into());
        }

        let health = &service.health_check;
        if !health.path.starts_with('/') {
            problems.push(format!("health check path {:?} must start with /", health.path));
        }
        if health.timeout_secs >= health.interval_secs {
            problems.push(format!(
                "health check timeout {}s must be shorter than the {}s interval",
                health.timeout_secs, health.interval_secs
            ));
        }
    }

    fn validate_edge(&self, problems: &mut Vec<String>) {
        let dns = &self.dns;
        let zone = dns.zone_domain.trim_end_matches('.');
        let record = dns.record_name.trim_end_matches('.');
        if record != zone && !record.ends_with(&format!(".{zone}")) {
            problems.push(format!("record {record} is outside zone {zone}"));
        }

        let cert = &self.load_balancer.certificate;
        if cert.domain_name.trim_end_matches('.') != record {
            problems.push(format!(
                "certificate for {} does not cover record {record}",
                cert.domain_name
            ));
        }
    }

    /// Lays out every subnet group across the zones, packing aligned blocks
    /// from the start of the VPC range. `None` when they do not fit.
    pub fn subnet_plan(&self) -> Option<Vec<SubnetPlan>> {
        let (base, prefix) = parse_cidr(&self.network.cidr)?;
        let end = u64::from(base) + (1u64 << (32 - prefix));
        let mut cursor = u64::from(base);
        let mut plan = Vec::new();

        for group in &self.network.subnets {
            if group.cidr_mask < prefix || group.cidr_mask > 32 {
                return None;
            }
            let size = 1u64 << (32 - group.cidr_mask);
            for az in 0..self.network.max_azs {
                cursor = cursor.div_ceil(size) * size;
                if cursor + size > end {
                    return None;
                }
                let addr = Ipv4Addr::from(u32::try_from(cursor).ok()?);
                plan.push(SubnetPlan {
                    logical_id: format!("{}Subnet{}", group.name, az + 1),
                    kind: group.kind,
                    az_index: az,
                    cidr: format!("{addr}/{}", group.cidr_mask),
                });
                cursor += size;
            }
        }

        Some(plan)
    }
}

fn parse_cidr(raw: &str) -> Option<(u32, u8)> {
    let (addr, prefix) = raw.split_once('/')?;
    let addr: Ipv4Addr = addr.parse().ok()?;
    let prefix: u8 = prefix.parse().ok()?;
    if prefix > 32 {
        return None;
    }
    let base = u32::from(addr);
    let host_bits = 32 - u32::from(prefix);
    let mask = u32::MAX.checked_shl(host_bits).unwrap_or(0);
    (base & !mask == 0).then_some((base, prefix))
}

fn fargate_size_supported(cpu: u32, memory_mib: u32) -> bool {
    let gib = |n: u32| n * 1024;
    match cpu {
        256 => matches!(memory_mib, 512 | 1024 | 2048),
        512 => (gib(1)..=gib(4)).contains(&memory_mib) && memory_mib % 1024 == 0,
        1024 => (gib(2)..=gib(8)).contains(&memory_mib) && memory_mib % 1024 == 0,
        2048 => (gib(4)..=gib(16)).contains(&memory_mib) && memory_mib % 1024 == 0,
        4096 => (gib(8)..=gib(30)).contains(&memory_mib) && memory_mib % 1024 == 0,
        8192 => (gib(16)..=gib(60)).contains(&memory_mib) && memory_mib % gib(4) == 0,
        16384 => (gib(32)..=gib(120)).contains(&memory_mib) && memory_mib % gib(8) == 0,
        _ => false,
    }
}
