// Collection driver
//
// Iterates configured fabrics, drives the session lifecycle and the
// collection pipeline, and returns each fabric's records as one batch.
// Every step degrades independently: a failed step logs one reason and
// contributes nothing, a session-fatal failure abandons the rest of
// that fabric's cycle, and no fabric's failure ever reaches the
// process level.

use secrecy::SecretString;
use tracing::{info, warn};

use fabricbeat_api::transport::TransportConfig;
use fabricbeat_api::{ApicSession, Error};

use crate::record::{Document, Tags};
use crate::{aggregate, endpoint, inventory, l3out, policy};

/// The contract every collector satisfies: one poll in, a batch of
/// flat documents out. Peers (the CLI screen-scraping collector, the
/// vendor REST collector) implement the same shape.
#[allow(async_fn_in_trait)]
pub trait Collector {
    /// Short name for logging.
    fn name(&self) -> &'static str;

    /// Run one poll across everything this collector is configured
    /// for. Never fails: partial and total collection failures surface
    /// as a smaller (possibly empty) batch plus log output.
    async fn collect(&self) -> Vec<Document>;
}

/// One controller endpoint of a fabric. Endpoints are tried in
/// configuration order until a login succeeds.
#[derive(Debug, Clone)]
pub struct FabricEndpoint {
    pub address: String,
    pub username: String,
    pub password: SecretString,
    pub site: String,
}

/// One named fabric with its ordered controller endpoints.
#[derive(Debug, Clone)]
pub struct Fabric {
    pub name: String,
    pub endpoints: Vec<FabricEndpoint>,
}

/// The ACI collector: polls each configured fabric's APIC and flattens
/// the results.
pub struct AciCollector {
    fabrics: Vec<Fabric>,
    environment: String,
    region_name: String,
    transport: TransportConfig,
}

impl AciCollector {
    pub fn new(fabrics: Vec<Fabric>, environment: String, region_name: String) -> Self {
        Self {
            fabrics,
            environment,
            region_name,
            transport: TransportConfig::default(),
        }
    }

    /// Override the default transport (TLS mode, timeout).
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// Log in to the first reachable controller of a fabric.
    async fn connect(&self, fabric: &Fabric) -> Option<(ApicSession, Tags)> {
        for endpoint in &fabric.endpoints {
            match ApicSession::login(
                &endpoint.address,
                &endpoint.username,
                endpoint.password.clone(),
                &self.transport,
            )
            .await
            {
                Ok(session) => {
                    info!(fabric = %fabric.name, address = %endpoint.address, "connected to APIC");
                    return Some((
                        session,
                        Tags {
                            fabric: fabric.name.clone(),
                            site: endpoint.site.clone(),
                        },
                    ));
                }
                Err(err) => {
                    warn!(fabric = %fabric.name, address = %endpoint.address, "login failed: {err}");
                }
            }
        }
        warn!(fabric = %fabric.name, "no controller reachable, skipping fabric");
        None
    }

    /// One fabric, start to finish. Returns whatever was collected
    /// before any session-fatal failure.
    async fn collect_fabric(&self, fabric: &Fabric) -> Vec<Document> {
        let Some((session, tags)) = self.connect(fabric).await else {
            return Vec::new();
        };

        let mut docs = Vec::new();
        'steps: {
            if !absorb(
                &mut docs,
                &tags,
                "policy rules",
                policy::collect_policy_rules(&session, &tags).await,
            ) {
                break 'steps;
            }

            if !absorb(
                &mut docs,
                &tags,
                "endpoints",
                endpoint::collect_endpoints(&session, &tags).await,
            ) {
                break 'steps;
            }

            let devices = match inventory::collect_inventory(&session, &tags).await {
                Ok((batch, devices)) => {
                    docs.extend(batch);
                    devices
                }
                Err(err) => {
                    warn!(fabric = %tags.fabric, "inventory collection failed: {err}");
                    if err.is_session_fatal() {
                        break 'steps;
                    }
                    Vec::new()
                }
            };

            if !absorb(
                &mut docs,
                &tags,
                "port capacity",
                inventory::collect_port_capacity(&session, &tags, &devices).await,
            ) {
                break 'steps;
            }

            if !absorb(
                &mut docs,
                &tags,
                "memory stats",
                inventory::collect_memory_stats(&session, &tags).await,
            ) {
                break 'steps;
            }

            for class in ["rtmapRule", "rtmapEntry", "rtpfxEntry"] {
                if !absorb(
                    &mut docs,
                    &tags,
                    class,
                    aggregate::count_by_location(&session, class, &tags).await,
                ) {
                    break 'steps;
                }
            }

            if !absorb(
                &mut docs,
                &tags,
                "fvRtdEpP",
                l3out::count_node_attachments(
                    &session,
                    "fvRtdEpP",
                    l3out::l3out_from_bracketed,
                    &tags,
                )
                .await,
            ) {
                break 'steps;
            }

            for class in ["actrlPfxEntry", "actrlRule"] {
                if !absorb(
                    &mut docs,
                    &tags,
                    class,
                    aggregate::count_by_location(&session, class, &tags).await,
                ) {
                    break 'steps;
                }
            }

            if !absorb(
                &mut docs,
                &tags,
                "l3extInstP",
                l3out::count_node_attachments(
                    &session,
                    "l3extInstP",
                    l3out::l3out_from_parent,
                    &tags,
                )
                .await,
            ) {
                break 'steps;
            }
        }

        session.close().await;
        docs
    }
}

impl Collector for AciCollector {
    fn name(&self) -> &'static str {
        "aci"
    }

    async fn collect(&self) -> Vec<Document> {
        let mut all = Vec::new();
        for fabric in &self.fabrics {
            info!(fabric = %fabric.name, "collecting fabric");
            let batch = self.collect_fabric(fabric).await;
            info!(fabric = %fabric.name, documents = batch.len(), "fabric collection finished");
            all.extend(batch);
        }

        for doc in &mut all {
            doc.insert("environment".into(), self.environment.clone().into());
            doc.insert("region_name".into(), self.region_name.clone().into());
        }
        all
    }
}

/// Fold one step's outcome into the fabric batch. Returns `false` when
/// the session is dead and the rest of the cycle must be abandoned.
fn absorb(
    docs: &mut Vec<Document>,
    tags: &Tags,
    step: &str,
    result: Result<Vec<Document>, Error>,
) -> bool {
    match result {
        Ok(batch) => {
            docs.extend(batch);
            true
        }
        Err(err) => {
            warn!(fabric = %tags.fabric, step, "collection step failed: {err}");
            !err.is_session_fatal()
        }
    }
}
