use arrow::datatypes::{DataType, Field, Schema};

// List-valued columns export as their JSON text encoding, matching the
// storage representation.
pub fn descriptors_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("nickname", DataType::Utf8, false),
        Field::new("fingerprint", DataType::Utf8, false),
        Field::new("published", DataType::Int64, false),
        Field::new("address", DataType::Utf8, true),
        Field::new("or_port", DataType::Int64, false),
        Field::new("dir_port", DataType::Int64, true),
        Field::new("platform", DataType::Utf8, true),
        Field::new("tor_version", DataType::Utf8, true),
        Field::new("operating_system", DataType::Utf8, true),
        Field::new("uptime", DataType::Int64, true),
        Field::new("contact", DataType::Utf8, true),
        Field::new("exit_policy", DataType::Utf8, true),
        Field::new("exit_policy_v6", DataType::Utf8, true),
        Field::new("family", DataType::Utf8, false),
        Field::new("average_bandwidth", DataType::Int64, true),
        Field::new("burst_bandwidth", DataType::Int64, true),
        Field::new("observed_bandwidth", DataType::Int64, true),
        Field::new("link_protocols", DataType::Utf8, false),
        Field::new("circuit_protocols", DataType::Utf8, false),
        Field::new("hibernating", DataType::Int64, false),
        Field::new("allow_single_hop_exits", DataType::Int64, false),
        Field::new("allow_tunneled_dir_requests", DataType::Int64, false),
        Field::new("extra_info_cache", DataType::Int64, false),
        Field::new("extra_info_digest", DataType::Utf8, true),
        Field::new("ntor_onion_key", DataType::Utf8, true),
        Field::new("or_addresses", DataType::Utf8, false),
    ])
}

pub fn scan_results_schema() -> Schema {
    Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("scan_id", DataType::Int64, false),
        Field::new("relay_id", DataType::Int64, false),
        Field::new("t_scan", DataType::Int64, false),
        Field::new("anomalous", DataType::Int64, false),
        Field::new("anomaly_detail", DataType::Utf8, true),
    ])
}
