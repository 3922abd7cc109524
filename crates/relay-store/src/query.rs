use crate::models::*;
use crate::{Db, Result, StoreError};
use rusqlite::{params, OptionalExtension, Row};

const DESCRIPTOR_COLS: &str = "nickname,fingerprint,published,address,or_port,dir_port,\
    platform,tor_version,operating_system,uptime,contact,exit_policy,exit_policy_v6,\
    family,average_bandwidth,burst_bandwidth,observed_bandwidth,link_protocols,\
    circuit_protocols,hibernating,allow_single_hop_exits,allow_tunneled_dir_requests,\
    extra_info_cache,extra_info_digest,ntor_onion_key,or_addresses";

// The list columns come off the row as raw JSON text and are decoded outside
// the rusqlite mapping closure, so a malformed column surfaces as
// StoreError::Encoding rather than a masked sqlite error.
struct RawDescriptor {
    d: Descriptor,
    family: String,
    link_protocols: String,
    circuit_protocols: String,
    or_addresses: String,
}

impl RawDescriptor {
    fn decode(mut self) -> Result<Descriptor> {
        self.d.family = serde_json::from_str(&self.family)?;
        self.d.link_protocols = serde_json::from_str(&self.link_protocols)?;
        self.d.circuit_protocols = serde_json::from_str(&self.circuit_protocols)?;
        self.d.or_addresses = serde_json::from_str(&self.or_addresses)?;
        Ok(self.d)
    }
}

fn read_descriptor(row: &Row<'_>, base: usize) -> rusqlite::Result<RawDescriptor> {
    Ok(RawDescriptor {
        d: Descriptor {
            nickname: row.get(base)?,
            fingerprint: row.get(base + 1)?,
            published: row.get(base + 2)?,
            address: row.get(base + 3)?,
            or_port: row.get(base + 4)?,
            dir_port: row.get(base + 5)?,
            platform: row.get(base + 6)?,
            tor_version: row.get(base + 7)?,
            operating_system: row.get(base + 8)?,
            uptime: row.get(base + 9)?,
            contact: row.get(base + 10)?,
            exit_policy: row.get(base + 11)?,
            exit_policy_v6: row.get(base + 12)?,
            family: Vec::new(),
            average_bandwidth: row.get(base + 14)?,
            burst_bandwidth: row.get(base + 15)?,
            observed_bandwidth: row.get(base + 16)?,
            link_protocols: Vec::new(),
            circuit_protocols: Vec::new(),
            hibernating: row.get(base + 19)?,
            allow_single_hop_exits: row.get(base + 20)?,
            allow_tunneled_dir_requests: row.get(base + 21)?,
            extra_info_cache: row.get(base + 22)?,
            extra_info_digest: row.get(base + 23)?,
            ntor_onion_key: row.get(base + 24)?,
            or_addresses: Vec::new(),
        },
        family: row.get(base + 13)?,
        link_protocols: row.get(base + 17)?,
        circuit_protocols: row.get(base + 18)?,
        or_addresses: row.get(base + 25)?,
    })
}

fn read_scan_result(row: &Row<'_>, base: usize) -> rusqlite::Result<ScanResult> {
    Ok(ScanResult {
        scan_id: row.get(base)?,
        relay_id: row.get(base + 1)?,
        t_scan: row.get(base + 2)?,
        anomalous: row.get(base + 3)?,
        anomaly_detail: row.get(base + 4)?,
    })
}

impl Db {
    pub fn table_exists(&self, name: &str) -> Result<bool> {
        let cnt: i64 = self.conn.query_row(
            "SELECT COUNT(1) FROM sqlite_master WHERE type='table' AND name=?",
            [name],
            |r| r.get(0),
        )?;
        Ok(cnt > 0)
    }

    pub fn get_descriptor(&self, id: DescriptorId) -> Result<Descriptor> {
        let raw = self
            .conn
            .query_row(
                &format!("SELECT {DESCRIPTOR_COLS} FROM descriptors WHERE id=?"),
                params![id],
                |row| read_descriptor(row, 0),
            )
            .optional()?;
        match raw {
            Some(raw) => raw.decode(),
            None => Err(StoreError::NotFound(format!("descriptor {id}"))),
        }
    }

    /// All stored versions for a relay identity, oldest first.
    pub fn descriptors_for_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Vec<(DescriptorId, Descriptor)>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id,{DESCRIPTOR_COLS} FROM descriptors WHERE fingerprint=? ORDER BY published"
        ))?;
        let rows = stmt.query_map(params![fingerprint], |row| {
            Ok((row.get::<_, i64>(0)?, read_descriptor(row, 1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            let (id, raw) = row?;
            out.push((id, raw.decode()?));
        }
        Ok(out)
    }

    pub fn get_scan(&self, id: ScanId) -> Result<Scan> {
        self.conn
            .query_row(
                "SELECT submitter,scan_type,destination FROM scans WHERE id=?",
                params![id],
                |row| {
                    Ok(Scan {
                        submitter: row.get(0)?,
                        scan_type: row.get(1)?,
                        destination: row.get(2)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("scan {id}")))
    }

    pub fn list_scans(&self) -> Result<Vec<(ScanId, Scan)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id,submitter,scan_type,destination FROM scans ORDER BY id")?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Scan {
                    submitter: row.get(1)?,
                    scan_type: row.get(2)?,
                    destination: row.get(3)?,
                },
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_scan_result(&self, id: ScanResultId) -> Result<ScanResult> {
        self.conn
            .query_row(
                "SELECT scan_id,relay_id,t_scan,anomalous,anomaly_detail \
                 FROM scan_results WHERE id=?",
                params![id],
                |row| read_scan_result(row, 0),
            )
            .optional()?
            .ok_or_else(|| StoreError::NotFound(format!("scan result {id}")))
    }

    pub fn results_for_scan(&self, scan_id: ScanId) -> Result<Vec<(ScanResultId, ScanResult)>> {
        self.collect_results(
            "SELECT id,scan_id,relay_id,t_scan,anomalous,anomaly_detail \
             FROM scan_results WHERE scan_id=? ORDER BY t_scan,id",
            scan_id,
        )
    }

    /// Only the results flagged anomalous.
    pub fn anomalous_results(&self, scan_id: ScanId) -> Result<Vec<(ScanResultId, ScanResult)>> {
        self.collect_results(
            "SELECT id,scan_id,relay_id,t_scan,anomalous,anomaly_detail \
             FROM scan_results WHERE scan_id=? AND anomalous=1 ORDER BY t_scan,id",
            scan_id,
        )
    }

    /// Results for a scan joined with the identity of the descriptor version
    /// each one references.
    pub fn results_with_relay(&self, scan_id: ScanId) -> Result<Vec<ScanResultWithRelay>> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id,r.scan_id,r.relay_id,r.t_scan,r.anomalous,r.anomaly_detail,\
             d.nickname,d.fingerprint \
             FROM scan_results r JOIN descriptors d ON d.id = r.relay_id \
             WHERE r.scan_id=? ORDER BY r.t_scan,r.id",
        )?;
        let rows = stmt.query_map(params![scan_id], |row| {
            Ok(ScanResultWithRelay {
                id: row.get(0)?,
                result: read_scan_result(row, 1)?,
                nickname: row.get(6)?,
                fingerprint: row.get(7)?,
            })
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn collect_results(
        &self,
        sql: &str,
        scan_id: ScanId,
    ) -> Result<Vec<(ScanResultId, ScanResult)>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params![scan_id], |row| {
            Ok((row.get::<_, i64>(0)?, read_scan_result(row, 1)?))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::format_description::well_known::Rfc3339;
    use time::OffsetDateTime;

    fn ts(s: &str) -> i64 {
        OffsetDateTime::parse(s, &Rfc3339).unwrap().unix_timestamp()
    }

    fn full_descriptor() -> Descriptor {
        Descriptor {
            nickname: "ridgeline".into(),
            fingerprint: "9695DFC35FFEB861329B9F1AB04C46397020CE31".into(),
            published: ts("2023-03-15T12:30:00Z"),
            address: Some("192.0.2.10".into()),
            or_port: 9001,
            dir_port: Some(9030),
            platform: Some("Tor 0.4.7.13 on Linux".into()),
            tor_version: Some("0.4.7.13".into()),
            operating_system: Some("Linux".into()),
            uptime: Some(86_400),
            contact: Some("admin@example.org".into()),
            exit_policy: Some("reject *:*".into()),
            exit_policy_v6: Some("reject 1-65535".into()),
            family: vec!["$AAAA".into(), "$BBBB".into(), "ridgeline2".into()],
            average_bandwidth: Some(1_048_576),
            burst_bandwidth: Some(2_097_152),
            observed_bandwidth: Some(524_288),
            link_protocols: vec!["1".into(), "2".into(), "3".into()],
            circuit_protocols: vec!["1".into()],
            hibernating: false,
            allow_single_hop_exits: false,
            allow_tunneled_dir_requests: true,
            extra_info_cache: true,
            extra_info_digest: Some("6B4D3A2F".into()),
            ntor_onion_key: Some("UfmPBUW0yL3cJUm2lVI1VRDRF7VbJHDIl1f6IBg2Kkw=".into()),
            or_addresses: vec![
                OrAddress {
                    address: "192.0.2.10".into(),
                    port: 9101,
                    is_ipv6: false,
                },
                OrAddress {
                    address: "2001:db8::10".into(),
                    port: 9001,
                    is_ipv6: true,
                },
            ],
        }
    }

    #[test]
    fn descriptor_round_trip_preserves_all_fields_and_list_order() {
        let db = Db::open_in_memory().unwrap();
        let d = full_descriptor();
        let id = db.insert_descriptor(&d).unwrap();
        let back = db.get_descriptor(id).unwrap();
        assert_eq!(back, d);
        assert_eq!(back.family, vec!["$AAAA", "$BBBB", "ridgeline2"]);
        assert_eq!(back.or_addresses[1].port, 9001);
        assert!(back.or_addresses[1].is_ipv6);
    }

    #[test]
    fn sparse_descriptor_round_trip() {
        let db = Db::open_in_memory().unwrap();
        let d = Descriptor {
            nickname: "relay1".into(),
            fingerprint: "ABCD1234".into(),
            published: ts("2023-01-01T00:00:00Z"),
            or_port: 9001,
            ..Descriptor::default()
        };
        let id = db.insert_descriptor(&d).unwrap();
        let back = db.get_descriptor(id).unwrap();
        assert_eq!(back, d);
        assert!(back.address.is_none());
        assert!(back.family.is_empty());
    }

    #[test]
    fn descriptors_for_fingerprint_orders_by_published() {
        let db = Db::open_in_memory().unwrap();
        let mut newer = full_descriptor();
        newer.published = ts("2023-03-16T12:30:00Z");
        let id_new = db.insert_descriptor(&newer).unwrap();
        let id_old = db.insert_descriptor(&full_descriptor()).unwrap();
        let versions = db
            .descriptors_for_fingerprint("9695DFC35FFEB861329B9F1AB04C46397020CE31")
            .unwrap();
        assert_eq!(versions.len(), 2);
        assert_eq!(versions[0].0, id_old);
        assert_eq!(versions[1].0, id_new);
    }

    #[test]
    fn malformed_list_column_surfaces_encoding_error() {
        let db = Db::open_in_memory().unwrap();
        let id = db.insert_descriptor(&full_descriptor()).unwrap();
        db.conn
            .execute(
                "UPDATE descriptors SET family='not json' WHERE id=?",
                params![id],
            )
            .unwrap();
        assert!(matches!(
            db.get_descriptor(id),
            Err(StoreError::Encoding(_))
        ));
    }

    #[test]
    fn missing_ids_are_not_found() {
        let db = Db::open_in_memory().unwrap();
        assert!(matches!(
            db.get_descriptor(42),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(db.get_scan(42), Err(StoreError::NotFound(_))));
        assert!(matches!(
            db.get_scan_result(42),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn dangling_references_are_rejected() {
        let db = Db::open_in_memory().unwrap();
        let r = ScanResult {
            scan_id: 999,
            relay_id: 999,
            t_scan: ts("2023-01-01T00:05:00Z"),
            anomalous: false,
            anomaly_detail: None,
        };
        assert!(matches!(
            db.insert_scan_result(&r),
            Err(StoreError::Constraint(_))
        ));
    }

    // The schema intentionally does not tie anomaly_detail to the anomalous
    // flag; a detail on a non-anomalous row must insert and read back as-is.
    #[test]
    fn detail_without_anomaly_flag_is_permitted() {
        let db = Db::open_in_memory().unwrap();
        let relay_id = db.insert_descriptor(&full_descriptor()).unwrap();
        let scan_id = db
            .insert_scan(&Scan {
                submitter: "ops".into(),
                scan_type: "latency".into(),
                destination: "all".into(),
            })
            .unwrap();
        let id = db
            .insert_scan_result(&ScanResult {
                scan_id,
                relay_id,
                t_scan: ts("2023-01-01T00:05:00Z"),
                anomalous: false,
                anomaly_detail: Some("rtt above baseline but within tolerance".into()),
            })
            .unwrap();
        let back = db.get_scan_result(id).unwrap();
        assert!(!back.anomalous);
        assert_eq!(
            back.anomaly_detail.as_deref(),
            Some("rtt above baseline but within tolerance")
        );
    }

    #[test]
    fn scan_scenario_round_trip_and_join() {
        let db = Db::open_in_memory().unwrap();
        let relay_id = db
            .insert_descriptor(&Descriptor {
                nickname: "relay1".into(),
                fingerprint: "ABCD1234".into(),
                published: ts("2023-01-01T00:00:00Z"),
                or_port: 9001,
                ..Descriptor::default()
            })
            .unwrap();
        let scan_id = db
            .insert_scan(&Scan {
                submitter: "ops".into(),
                scan_type: "latency".into(),
                destination: "relay1".into(),
            })
            .unwrap();
        let result_id = db
            .insert_scan_result(&ScanResult {
                scan_id,
                relay_id,
                t_scan: ts("2023-01-01T00:05:00Z"),
                anomalous: true,
                anomaly_detail: Some("timeout".into()),
            })
            .unwrap();

        let back = db.get_scan_result(result_id).unwrap();
        assert!(back.anomalous);
        assert_eq!(back.anomaly_detail.as_deref(), Some("timeout"));

        let joined = db.results_with_relay(scan_id).unwrap();
        assert_eq!(joined.len(), 1);
        assert_eq!(joined[0].id, result_id);
        assert_eq!(joined[0].nickname, "relay1");
        assert_eq!(joined[0].fingerprint, "ABCD1234");

        let flagged = db.anomalous_results(scan_id).unwrap();
        assert_eq!(flagged.len(), 1);
        assert_eq!(db.results_for_scan(scan_id).unwrap().len(), 1);

        let (listed_id, listed) = &db.list_scans().unwrap()[0];
        assert_eq!(*listed_id, scan_id);
        assert_eq!(listed.scan_type, "latency");
        assert_eq!(db.get_scan(scan_id).unwrap().submitter, "ops");
    }
}
