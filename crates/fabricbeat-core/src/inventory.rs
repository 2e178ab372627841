// Fabric inventory and device health
//
// fabricNode gives the leaf/spine inventory; the retained device list
// then drives the per-node physical-port capacity pass. rpmEntity
// supplies route-processor shared-memory stats per node.

use tracing::warn;

use fabricbeat_api::{ApicSession, Error};

use crate::dn::Dn;
use crate::record::{
    Document, InventoryRecord, MemoryRecord, PortCapacityRecord, Tags, to_document,
};

/// A device retained from the inventory pass for node-scoped reads.
#[derive(Debug, Clone)]
pub struct DeviceRef {
    pub name: String,
    pub dn: Dn,
}

/// Fetch `fabricNode` and emit one inventory record per leaf or spine.
/// Controllers and unmanaged roles are skipped. Also returns the
/// device list for the port-capacity pass.
pub async fn collect_inventory(
    session: &ApicSession,
    tags: &Tags,
) -> Result<(Vec<Document>, Vec<DeviceRef>), Error> {
    let mos = session.fetch_class("fabricNode", &[]).await?;

    let mut docs = Vec::new();
    let mut devices = Vec::new();
    for mo in &mos {
        let role = mo.attr("role").unwrap_or_default();
        if role != "leaf" && role != "spine" {
            continue;
        }
        let Some(name) = mo.name() else { continue };
        let Some(dn) = mo.dn() else { continue };

        docs.push(to_document(&InventoryRecord {
            device: name.to_owned(),
            site: tags.site.clone(),
            fabric: tags.fabric.clone(),
            sw_version: mo.attr("version").unwrap_or_default().to_owned(),
            model: mo.attr("model").unwrap_or_default().to_owned(),
            serial: mo.attr("serial").unwrap_or_default().to_owned(),
        }));
        devices.push(DeviceRef {
            name: name.to_owned(),
            dn: Dn::parse(dn),
        });
    }
    Ok((docs, devices))
}

/// Per-device physical-port capacity: node-scoped `l1PhysIf` fetch
/// with the `ethpmPhysIf` operational child inlined, classified into
/// up / down / disabled and rolled up with a utilization percentage.
///
/// A device with an unreachable or empty interface listing contributes
/// no record; the pass continues with the next device.
pub async fn collect_port_capacity(
    session: &ApicSession,
    tags: &Tags,
    devices: &[DeviceRef],
) -> Result<Vec<Document>, Error> {
    let mut docs = Vec::new();
    for device in devices {
        let (Some(pod), Some(node)) = (device.dn.pod(), device.dn.node()) else {
            continue;
        };
        let scope = format!("topology/pod-{pod}/node-{node}");

        let ports = match session
            .fetch_node_class(&scope, "l1PhysIf", &["ethpmPhysIf"])
            .await
        {
            Ok(ports) => ports,
            Err(err) if err.is_session_fatal() => return Err(err),
            Err(err) => {
                warn!(device = %device.name, "port fetch failed, skipping device: {err}");
                continue;
            }
        };
        if ports.is_empty() {
            continue;
        }

        let mut up = 0u32;
        let mut down = 0u32;
        let mut disabled = 0u32;
        let total = u32::try_from(ports.len()).unwrap_or(u32::MAX);

        for port in &ports {
            let admin_state = port.attr("adminSt").unwrap_or_default();
            let oper_state = port
                .child_of("ethpmPhysIf")
                .and_then(|c| c.attr("operSt"))
                .unwrap_or_default();
            match oper_state {
                "up" => up += 1,
                "down" if admin_state == "down" => disabled += 1,
                "down" => down += 1,
                _ => {}
            }
        }

        let util_percent = (f64::from(up) * 1000.0 / f64::from(total)).round() / 10.0;
        docs.push(to_document(&PortCapacityRecord {
            device: device.name.clone(),
            site: tags.site.clone(),
            fabric: tags.fabric.clone(),
            ports_total: total,
            ports_free: total - up,
            ports_disabled: disabled,
            ports_down: down,
            ports_util_percent: util_percent,
            ports_up: up,
        }));
    }
    Ok(docs)
}

/// Fetch `rpmEntity` and emit per-node shared-memory stats.
pub async fn collect_memory_stats(
    session: &ApicSession,
    tags: &Tags,
) -> Result<Vec<Document>, Error> {
    let mos = session.fetch_class("rpmEntity", &[]).await?;

    let mut docs = Vec::new();
    for mo in &mos {
        let Some(dn) = mo.dn() else { continue };
        let dn = Dn::parse(dn);

        let int_attr = |name: &str| -> i64 {
            mo.attr(name)
                .and_then(|v| v.parse().ok())
                .unwrap_or_default()
        };

        docs.push(to_document(&MemoryRecord {
            mo: "rpmEntity",
            hlq: tags.hlq(&dn.location_key(3)),
            pod: dn.pod().unwrap_or_default().to_owned(),
            node: dn.node().unwrap_or_default().to_owned(),
            site: tags.site.clone(),
            fabric: tags.fabric.clone(),
            sh_mem_alloc_fail_count: int_attr("shMemAllocFailCount"),
            sh_mem_total: int_attr("shMemTotal"),
            sh_mem_usage: int_attr("shMemUsage"),
            sh_mem_alert: mo.attr("shMemAlert").unwrap_or_default().to_owned(),
        }));
    }
    Ok(docs)
}
