use serde::{Deserialize, Serialize};

pub type DescriptorId = i64;
pub type ScanId = i64;
pub type ScanResultId = i64;

/// One alternate reachability entry from a descriptor's `or-address` lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrAddress {
    pub address: String,
    pub port: u16,
    pub is_ipv6: bool,
}

/// A published relay server descriptor: a point-in-time snapshot of a
/// relay's announced configuration. Field set follows the fields of
/// interest from the directory protocol's server descriptor document.
/// Rows are append-only; a new relay state is a new row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    pub nickname: String,
    pub fingerprint: String,
    /// Unix seconds, UTC, when the descriptor was generated.
    pub published: i64,
    /// IPv4 literal.
    pub address: Option<String>,
    pub or_port: u16,
    /// Directory-mirror port; absent or zero when not mirroring.
    pub dir_port: Option<u16>,
    pub platform: Option<String>,
    pub tor_version: Option<String>,
    pub operating_system: Option<String>,
    /// Seconds.
    pub uptime: Option<i64>,
    pub contact: Option<String>,
    pub exit_policy: Option<String>,
    pub exit_policy_v6: Option<String>,
    /// Nicknames / fingerprints of the declared family, in declared order.
    pub family: Vec<String>,
    pub average_bandwidth: Option<i64>,
    pub burst_bandwidth: Option<i64>,
    pub observed_bandwidth: Option<i64>,
    pub link_protocols: Vec<String>,
    pub circuit_protocols: Vec<String>,
    pub hibernating: bool,
    pub allow_single_hop_exits: bool,
    pub allow_tunneled_dir_requests: bool,
    pub extra_info_cache: bool,
    /// Hex digest referencing the relay's extra-info document.
    pub extra_info_digest: Option<String>,
    /// Base64 public key for the ntor handshake.
    pub ntor_onion_key: Option<String>,
    pub or_addresses: Vec<OrAddress>,
}

/// A scan job definition. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scan {
    pub submitter: String,
    /// Open taxonomy, e.g. "latency".
    pub scan_type: String,
    pub destination: String,
}

/// Outcome of scanning one relay (one descriptor version) within one scan.
/// `anomaly_detail` is only meaningful when `anomalous` is set, but the
/// schema does not enforce that pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_id: ScanId,
    pub relay_id: DescriptorId,
    /// Unix seconds, UTC, when the scan of this relay began.
    pub t_scan: i64,
    pub anomalous: bool,
    pub anomaly_detail: Option<String>,
}

/// A scan result joined with identity fields of the descriptor it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanResultWithRelay {
    pub id: ScanResultId,
    pub result: ScanResult,
    pub nickname: String,
    pub fingerprint: String,
}
