//! Resource quantity parsing
//!
//! Kubernetes encodes resource quantities as strings with heterogeneous
//! unit suffixes: requests use millicores and binary memory suffixes
//! ("500m", "2Gi"), while the metrics API reports usage in nano/micro/
//! milli units ("12345678n"). Everything here normalizes to exactly two
//! units: CPU cores and memory GiB.
//!
//! Parsing never fails. Metric feeds are unreliable enough that a single
//! malformed reading must not abort a control cycle, so any unparsable
//! input resolves to zero magnitude. Callers that want to surface that
//! degradation use the `try_` variants and count `None` readings.

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Parse a CPU request/limit quantity ("500m", "2") into cores.
pub fn try_parse_cpu_request(s: &str) -> Option<f64> {
    if let Some(millis) = s.strip_suffix('m') {
        millis.trim().parse::<f64>().ok().map(|v| v / 1000.0)
    } else {
        s.trim().parse::<f64>().ok()
    }
}

/// Fail-to-zero variant of [`try_parse_cpu_request`].
pub fn parse_cpu_request(s: &str) -> f64 {
    try_parse_cpu_request(s).unwrap_or(0.0)
}

/// Parse a memory request/limit quantity ("2Gi", "100Mi", "512Ki",
/// raw bytes) into GiB. The `m` (millibyte) suffix is a degenerate unit
/// the platform nonetheless accepts.
pub fn try_parse_memory_request(s: &str) -> Option<f64> {
    if let Some(v) = s.strip_suffix("Gi") {
        v.trim().parse::<f64>().ok()
    } else if let Some(v) = s.strip_suffix("Mi") {
        v.trim().parse::<f64>().ok().map(|v| v / 1024.0)
    } else if let Some(v) = s.strip_suffix("Ki") {
        v.trim().parse::<f64>().ok().map(|v| v / (1024.0 * 1024.0))
    } else if let Some(v) = s.strip_suffix('m') {
        v.trim()
            .parse::<f64>()
            .ok()
            .map(|v| v / (BYTES_PER_GIB * 1000.0))
    } else {
        s.trim().parse::<f64>().ok().map(|v| v / BYTES_PER_GIB)
    }
}

/// Fail-to-zero variant of [`try_parse_memory_request`].
pub fn parse_memory_request(s: &str) -> f64 {
    try_parse_memory_request(s).unwrap_or(0.0)
}

/// Parse a CPU usage quantity from the metrics API ("12345678n",
/// "250u", "150m", "0.5") into cores.
pub fn try_parse_cpu_usage(s: &str) -> Option<f64> {
    if let Some(v) = s.strip_suffix('n') {
        v.trim().parse::<f64>().ok().map(|v| v / 1e9)
    } else if let Some(v) = s.strip_suffix('u') {
        v.trim().parse::<f64>().ok().map(|v| v / 1e6)
    } else if let Some(v) = s.strip_suffix('m') {
        v.trim().parse::<f64>().ok().map(|v| v / 1e3)
    } else {
        s.trim().parse::<f64>().ok()
    }
}

/// Fail-to-zero variant of [`try_parse_cpu_usage`].
pub fn parse_cpu_usage(s: &str) -> f64 {
    try_parse_cpu_usage(s).unwrap_or(0.0)
}

/// Parse a memory usage quantity from the metrics API into GiB.
/// Same suffix table as requests minus the millibyte branch; a bare
/// number is raw bytes.
pub fn try_parse_memory_usage(s: &str) -> Option<f64> {
    if let Some(v) = s.strip_suffix("Gi") {
        v.trim().parse::<f64>().ok()
    } else if let Some(v) = s.strip_suffix("Mi") {
        v.trim().parse::<f64>().ok().map(|v| v / 1024.0)
    } else if let Some(v) = s.strip_suffix("Ki") {
        v.trim().parse::<f64>().ok().map(|v| v / (1024.0 * 1024.0))
    } else {
        s.trim().parse::<f64>().ok().map(|v| v / BYTES_PER_GIB)
    }
}

/// Fail-to-zero variant of [`try_parse_memory_usage`].
pub fn parse_memory_usage(s: &str) -> f64 {
    try_parse_memory_usage(s).unwrap_or(0.0)
}
