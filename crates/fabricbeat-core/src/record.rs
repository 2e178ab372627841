// Output document model
//
// Every poll emits flat, string-keyed records tagged with the fabric
// and site they came from. The sink accepts heterogeneous documents,
// so each record kind serializes to its own field set; the field names
// below are the index schema and must not drift.

use serde::Serialize;

use crate::index::ContractDirection;

/// One flat output document, ready for the bulk sink.
pub type Document = serde_json::Map<String, serde_json::Value>;

/// Fabric/site identity stamped into every record of a poll.
#[derive(Debug, Clone)]
pub struct Tags {
    pub fabric: String,
    pub site: String,
}

impl Tags {
    /// Fabric-qualified hierarchical location qualifier.
    pub fn hlq(&self, dn_prefix: &str) -> String {
        format!("{}/{}", self.fabric, dn_prefix)
    }
}

/// Serialize a record struct into a `Document`.
pub(crate) fn to_document<T: Serialize>(record: &T) -> Document {
    // Record structs are plain field sets; they always serialize to
    // JSON objects.
    match serde_json::to_value(record) {
        Ok(serde_json::Value::Object(map)) => map,
        _ => Document::new(),
    }
}

// ── Policy ───────────────────────────────────────────────────────────

/// One (EPG, contract, direction, filter, entry) combination from the
/// chain join.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyRuleRecord {
    pub mo: &'static str,
    pub hlq: String,
    pub tenant: String,
    pub ap: String,
    pub epg: String,
    pub site: String,
    pub fabric: String,
    pub contract: String,
    pub contract_direction: ContractDirection,
    pub filter: String,
    pub entry_name: String,
    pub prot: String,
    pub from_port: String,
    pub to_port: String,
}

// ── Endpoints ────────────────────────────────────────────────────────

/// One attached endpoint (per learned IP).
#[derive(Debug, Clone, Serialize)]
pub struct EndpointRecord {
    pub mo: &'static str,
    pub hlq: String,
    pub tenant: String,
    pub ap: String,
    pub epg: String,
    pub site: String,
    pub fabric: String,
    pub encap: String,
    pub mac: String,
    #[serde(rename = "fvIp")]
    pub fv_ip: String,
}

// ── Inventory & device health ────────────────────────────────────────

/// One leaf or spine from the fabric inventory.
#[derive(Debug, Clone, Serialize)]
pub struct InventoryRecord {
    pub device: String,
    pub site: String,
    pub fabric: String,
    pub sw_version: String,
    pub model: String,
    pub serial: String,
}

/// Physical-port capacity rollup for one device.
#[derive(Debug, Clone, Serialize)]
pub struct PortCapacityRecord {
    pub device: String,
    pub site: String,
    pub fabric: String,
    pub ports_total: u32,
    pub ports_free: u32,
    pub ports_disabled: u32,
    pub ports_down: u32,
    pub ports_util_percent: f64,
    pub ports_up: u32,
}

/// Route-processor shared-memory stats for one node.
#[derive(Debug, Clone, Serialize)]
pub struct MemoryRecord {
    pub mo: &'static str,
    pub hlq: String,
    pub pod: String,
    pub node: String,
    pub site: String,
    pub fabric: String,
    #[serde(rename = "shMemAllocFailCount")]
    pub sh_mem_alloc_fail_count: i64,
    #[serde(rename = "shMemTotal")]
    pub sh_mem_total: i64,
    #[serde(rename = "shMemUsage")]
    pub sh_mem_usage: i64,
    #[serde(rename = "shMemAlert")]
    pub sh_mem_alert: String,
}

// ── Location counts ──────────────────────────────────────────────────

/// Aggregate count of one object class at one pod/node location. The
/// count field is named `{class}_count`, so this record builds its
/// document by hand rather than deriving `Serialize`.
#[derive(Debug, Clone)]
pub struct LocationCount {
    pub class: String,
    pub location: String,
    pub pod: String,
    pub node: String,
    pub count: u64,
}

impl LocationCount {
    pub fn into_document(self, tags: &Tags) -> Document {
        let mut doc = Document::new();
        doc.insert("mo".into(), self.class.clone().into());
        doc.insert("hlq".into(), tags.hlq(&self.location).into());
        doc.insert("pod".into(), self.pod.into());
        doc.insert("node".into(), self.node.into());
        doc.insert("site".into(), tags.site.clone().into());
        doc.insert("fabric".into(), tags.fabric.clone().into());
        doc.insert(format!("{}_count", self.class), self.count.into());
        doc
    }
}
