use crate::{Db, Descriptor, DescriptorId, Result, Scan, ScanId, ScanResult, ScanResultId};
use rusqlite::params;

impl Db {
    pub fn insert_descriptor(&self, d: &Descriptor) -> Result<DescriptorId> {
        self.conn.execute(
            "INSERT INTO descriptors(nickname,fingerprint,published,address,or_port,dir_port,\
             platform,tor_version,operating_system,uptime,contact,exit_policy,exit_policy_v6,\
             family,average_bandwidth,burst_bandwidth,observed_bandwidth,link_protocols,\
             circuit_protocols,hibernating,allow_single_hop_exits,allow_tunneled_dir_requests,\
             extra_info_cache,extra_info_digest,ntor_onion_key,or_addresses)\
             VALUES (?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?,?)",
            params![
                d.nickname,
                d.fingerprint,
                d.published,
                d.address,
                d.or_port,
                d.dir_port,
                d.platform,
                d.tor_version,
                d.operating_system,
                d.uptime,
                d.contact,
                d.exit_policy,
                d.exit_policy_v6,
                serde_json::to_string(&d.family)?,
                d.average_bandwidth,
                d.burst_bandwidth,
                d.observed_bandwidth,
                serde_json::to_string(&d.link_protocols)?,
                serde_json::to_string(&d.circuit_protocols)?,
                d.hibernating,
                d.allow_single_hop_exits,
                d.allow_tunneled_dir_requests,
                d.extra_info_cache,
                d.extra_info_digest,
                d.ntor_onion_key,
                serde_json::to_string(&d.or_addresses)?,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn insert_scan(&self, s: &Scan) -> Result<ScanId> {
        self.conn.execute(
            "INSERT INTO scans(submitter,scan_type,destination) VALUES (?,?,?)",
            params![s.submitter, s.scan_type, s.destination],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Fails with [`crate::StoreError::Constraint`] when `scan_id` or
    /// `relay_id` does not reference an existing row.
    pub fn insert_scan_result(&self, r: &ScanResult) -> Result<ScanResultId> {
        self.conn.execute(
            "INSERT INTO scan_results(scan_id,relay_id,t_scan,anomalous,anomaly_detail)\
             VALUES (?,?,?,?,?)",
            params![r.scan_id, r.relay_id, r.t_scan, r.anomalous, r.anomaly_detail],
        )?;
        Ok(self.conn.last_insert_rowid())
    }
}
