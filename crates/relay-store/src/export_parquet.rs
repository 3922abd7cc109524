use crate::arrow_schemas;
use crate::{Db, Result, StoreError};
use arrow::array::{ArrayRef, Int64Builder, StringBuilder};
use arrow::datatypes::Schema;
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;
use rusqlite::Row;
use std::path::Path;
use std::sync::Arc;

const CHUNK: usize = 10_000;

/// Dump one table to a Parquet file. Supported tables: `descriptors`,
/// `scan_results`.
pub fn export_table_to_parquet(db: &Db, table: &str, out: &Path) -> Result<()> {
    match table {
        "descriptors" => export_descriptors(db, out),
        "scan_results" => export_scan_results(db, out),
        other => Err(StoreError::UnsupportedTable(other.to_string())),
    }
}

fn writer_props() -> WriterProperties {
    WriterProperties::builder()
        .set_compression(Compression::ZSTD(ZstdLevel::default()))
        .build()
}

fn export_descriptors(db: &Db, out: &Path) -> Result<()> {
    let schema = Arc::new(arrow_schemas::descriptors_schema());
    let mut stmt = db.conn.prepare(
        "SELECT id,nickname,fingerprint,published,address,or_port,dir_port,platform,\
         tor_version,operating_system,uptime,contact,exit_policy,exit_policy_v6,family,\
         average_bandwidth,burst_bandwidth,observed_bandwidth,link_protocols,\
         circuit_protocols,hibernating,allow_single_hop_exits,allow_tunneled_dir_requests,\
         extra_info_cache,extra_info_digest,ntor_onion_key,or_addresses \
         FROM descriptors ORDER BY id",
    )?;
    let mut rows = stmt.query([])?;
    let file = std::fs::File::create(out)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(writer_props()))?;

    loop {
        let mut batch = DescriptorBatch::new();
        let mut count = 0;
        while count < CHUNK {
            let Some(row) = rows.next()? else { break };
            batch.push(row)?;
            count += 1;
        }
        if count == 0 {
            break;
        }
        let rb = RecordBatch::try_new(schema.clone(), batch.finish())?;
        writer.write(&rb)?;
    }
    writer.close()?;
    Ok(())
}

fn export_scan_results(db: &Db, out: &Path) -> Result<()> {
    let schema: Arc<Schema> = Arc::new(arrow_schemas::scan_results_schema());
    let mut stmt = db.conn.prepare(
        "SELECT id,scan_id,relay_id,t_scan,anomalous,anomaly_detail \
         FROM scan_results ORDER BY id",
    )?;
    let mut rows = stmt.query([])?;
    let file = std::fs::File::create(out)?;
    let mut writer = ArrowWriter::try_new(file, schema.clone(), Some(writer_props()))?;

    loop {
        let mut batch = ScanResultBatch::new();
        let mut count = 0;
        while count < CHUNK {
            let Some(row) = rows.next()? else { break };
            batch.push(row)?;
            count += 1;
        }
        if count == 0 {
            break;
        }
        let rb = RecordBatch::try_new(schema.clone(), batch.finish())?;
        writer.write(&rb)?;
    }
    writer.close()?;
    Ok(())
}

struct DescriptorBatch {
    id: Int64Builder,
    nickname: StringBuilder,
    fingerprint: StringBuilder,
    published: Int64Builder,
    address: StringBuilder,
    or_port: Int64Builder,
    dir_port: Int64Builder,
    platform: StringBuilder,
    tor_version: StringBuilder,
    operating_system: StringBuilder,
    uptime: Int64Builder,
    contact: StringBuilder,
    exit_policy: StringBuilder,
    exit_policy_v6: StringBuilder,
    family: StringBuilder,
    average_bandwidth: Int64Builder,
    burst_bandwidth: Int64Builder,
    observed_bandwidth: Int64Builder,
    link_protocols: StringBuilder,
    circuit_protocols: StringBuilder,
    hibernating: Int64Builder,
    allow_single_hop_exits: Int64Builder,
    allow_tunneled_dir_requests: Int64Builder,
    extra_info_cache: Int64Builder,
    extra_info_digest: StringBuilder,
    ntor_onion_key: StringBuilder,
    or_addresses: StringBuilder,
}

impl DescriptorBatch {
    fn new() -> Self {
        DescriptorBatch {
            id: Int64Builder::new(),
            nickname: StringBuilder::new(),
            fingerprint: StringBuilder::new(),
            published: Int64Builder::new(),
            address: StringBuilder::new(),
            or_port: Int64Builder::new(),
            dir_port: Int64Builder::new(),
            platform: StringBuilder::new(),
            tor_version: StringBuilder::new(),
            operating_system: StringBuilder::new(),
            uptime: Int64Builder::new(),
            contact: StringBuilder::new(),
            exit_policy: StringBuilder::new(),
            exit_policy_v6: StringBuilder::new(),
            family: StringBuilder::new(),
            average_bandwidth: Int64Builder::new(),
            burst_bandwidth: Int64Builder::new(),
            observed_bandwidth: Int64Builder::new(),
            link_protocols: StringBuilder::new(),
            circuit_protocols: StringBuilder::new(),
            hibernating: Int64Builder::new(),
            allow_single_hop_exits: Int64Builder::new(),
            allow_tunneled_dir_requests: Int64Builder::new(),
            extra_info_cache: Int64Builder::new(),
            extra_info_digest: StringBuilder::new(),
            ntor_onion_key: StringBuilder::new(),
            or_addresses: StringBuilder::new(),
        }
    }

    fn push(&mut self, row: &Row<'_>) -> Result<()> {
        self.id.append_value(row.get::<_, i64>(0)?);
        self.nickname.append_value(row.get::<_, String>(1)?);
        self.fingerprint.append_value(row.get::<_, String>(2)?);
        self.published.append_value(row.get::<_, i64>(3)?);
        self.address.append_option(row.get::<_, Option<String>>(4)?);
        self.or_port.append_value(row.get::<_, i64>(5)?);
        self.dir_port.append_option(row.get::<_, Option<i64>>(6)?);
        self.platform.append_option(row.get::<_, Option<String>>(7)?);
        self.tor_version
            .append_option(row.get::<_, Option<String>>(8)?);
        self.operating_system
            .append_option(row.get::<_, Option<String>>(9)?);
        self.uptime.append_option(row.get::<_, Option<i64>>(10)?);
        self.contact
            .append_option(row.get::<_, Option<String>>(11)?);
        self.exit_policy
            .append_option(row.get::<_, Option<String>>(12)?);
        self.exit_policy_v6
            .append_option(row.get::<_, Option<String>>(13)?);
        self.family.append_value(row.get::<_, String>(14)?);
        self.average_bandwidth
            .append_option(row.get::<_, Option<i64>>(15)?);
        self.burst_bandwidth
            .append_option(row.get::<_, Option<i64>>(16)?);
        self.observed_bandwidth
            .append_option(row.get::<_, Option<i64>>(17)?);
        self.link_protocols.append_value(row.get::<_, String>(18)?);
        self.circuit_protocols
            .append_value(row.get::<_, String>(19)?);
        self.hibernating.append_value(row.get::<_, i64>(20)?);
        self.allow_single_hop_exits
            .append_value(row.get::<_, i64>(21)?);
        self.allow_tunneled_dir_requests
            .append_value(row.get::<_, i64>(22)?);
        self.extra_info_cache.append_value(row.get::<_, i64>(23)?);
        self.extra_info_digest
            .append_option(row.get::<_, Option<String>>(24)?);
        self.ntor_onion_key
            .append_option(row.get::<_, Option<String>>(25)?);
        self.or_addresses.append_value(row.get::<_, String>(26)?);
        Ok(())
    }

    fn finish(mut self) -> Vec<ArrayRef> {
        vec![
            Arc::new(self.id.finish()),
            Arc::new(self.nickname.finish()),
            Arc::new(self.fingerprint.finish()),
            Arc::new(self.published.finish()),
            Arc::new(self.address.finish()),
            Arc::new(self.or_port.finish()),
            Arc::new(self.dir_port.finish()),
            Arc::new(self.platform.finish()),
            Arc::new(self.tor_version.finish()),
            Arc::new(self.operating_system.finish()),
            Arc::new(self.uptime.finish()),
            Arc::new(self.contact.finish()),
            Arc::new(self.exit_policy.finish()),
            Arc::new(self.exit_policy_v6.finish()),
            Arc::new(self.family.finish()),
            Arc::new(self.average_bandwidth.finish()),
            Arc::new(self.burst_bandwidth.finish()),
            Arc::new(self.observed_bandwidth.finish()),
            Arc::new(self.link_protocols.finish()),
            Arc::new(self.circuit_protocols.finish()),
            Arc::new(self.hibernating.finish()),
            Arc::new(self.allow_single_hop_exits.finish()),
            Arc::new(self.allow_tunneled_dir_requests.finish()),
            Arc::new(self.extra_info_cache.finish()),
            Arc::new(self.extra_info_digest.finish()),
            Arc::new(self.ntor_onion_key.finish()),
            Arc::new(self.or_addresses.finish()),
        ]
    }
}

struct ScanResultBatch {
    id: Int64Builder,
    scan_id: Int64Builder,
    relay_id: Int64Builder,
    t_scan: Int64Builder,
    anomalous: Int64Builder,
    anomaly_detail: StringBuilder,
}

impl ScanResultBatch {
    fn new() -> Self {
        ScanResultBatch {
            id: Int64Builder::new(),
            scan_id: Int64Builder::new(),
            relay_id: Int64Builder::new(),
            t_scan: Int64Builder::new(),
            anomalous: Int64Builder::new(),
            anomaly_detail: StringBuilder::new(),
        }
    }

    fn push(&mut self, row: &Row<'_>) -> Result<()> {
        self.id.append_value(row.get::<_, i64>(0)?);
        self.scan_id.append_value(row.get::<_, i64>(1)?);
        self.relay_id.append_value(row.get::<_, i64>(2)?);
        self.t_scan.append_value(row.get::<_, i64>(3)?);
        self.anomalous.append_value(row.get::<_, i64>(4)?);
        self.anomaly_detail
            .append_option(row.get::<_, Option<String>>(5)?);
        Ok(())
    }

    fn finish(mut self) -> Vec<ArrayRef> {
        vec![
            Arc::new(self.id.finish()),
            Arc::new(self.scan_id.finish()),
            Arc::new(self.relay_id.finish()),
            Arc::new(self.t_scan.finish()),
            Arc::new(self.anomalous.finish()),
            Arc::new(self.anomaly_detail.finish()),
        ]
    }
}
