// SQLite has no array columns, so the list-valued descriptor fields
// (family, link_protocols, circuit_protocols, or_addresses) are stored as
// JSON text; element order is preserved. Timestamps are Unix seconds, UTC.
//
// (fingerprint, published) is the natural identity of a descriptor version
// but is deliberately not UNIQUE; the upstream directory data makes no such
// promise, so only a lookup index is declared.

pub const SCHEMA_INIT: &str = r#"
BEGIN;

CREATE TABLE descriptors (
  id                          INTEGER PRIMARY KEY AUTOINCREMENT,
  nickname                    TEXT NOT NULL,
  fingerprint                 TEXT NOT NULL,
  published                   INTEGER NOT NULL,
  address                     TEXT,
  or_port                     INTEGER NOT NULL CHECK (or_port BETWEEN 0 AND 65535),
  dir_port                    INTEGER CHECK (dir_port BETWEEN 0 AND 65535),
  platform                    TEXT,
  tor_version                 TEXT,
  operating_system            TEXT,
  uptime                      INTEGER,
  contact                     TEXT,
  exit_policy                 TEXT,
  exit_policy_v6              TEXT,
  family                      TEXT NOT NULL DEFAULT '[]',
  average_bandwidth           INTEGER,
  burst_bandwidth             INTEGER,
  observed_bandwidth          INTEGER,
  link_protocols              TEXT NOT NULL DEFAULT '[]',
  circuit_protocols           TEXT NOT NULL DEFAULT '[]',
  hibernating                 INTEGER NOT NULL CHECK (hibernating IN (0,1)) DEFAULT 0,
  allow_single_hop_exits      INTEGER NOT NULL CHECK (allow_single_hop_exits IN (0,1)) DEFAULT 0,
  allow_tunneled_dir_requests INTEGER NOT NULL CHECK (allow_tunneled_dir_requests IN (0,1)) DEFAULT 0,
  extra_info_cache            INTEGER NOT NULL CHECK (extra_info_cache IN (0,1)) DEFAULT 0,
  extra_info_digest           TEXT,
  ntor_onion_key              TEXT,
  or_addresses                TEXT NOT NULL DEFAULT '[]'
);

CREATE TABLE scans (
  id              INTEGER PRIMARY KEY AUTOINCREMENT,
  submitter       TEXT NOT NULL,
  scan_type       TEXT NOT NULL,
  destination     TEXT NOT NULL
);

CREATE TABLE scan_results (
  id              INTEGER PRIMARY KEY AUTOINCREMENT,
  scan_id         INTEGER NOT NULL REFERENCES scans(id),
  relay_id        INTEGER NOT NULL REFERENCES descriptors(id),
  t_scan          INTEGER NOT NULL,
  anomalous       INTEGER NOT NULL CHECK (anomalous IN (0,1)),
  anomaly_detail  TEXT
);

CREATE INDEX idx_descriptors_identity ON descriptors(fingerprint, published);
CREATE INDEX idx_results_scan ON scan_results(scan_id);
CREATE INDEX idx_results_relay ON scan_results(relay_id);

COMMIT;
"#;
