// Policy flattening: the join phase
//
// EPG ⋈ contract ⋈ subject ⋈ filter ⋈ entry, each hop a single-key
// lookup into a snapshot index. A reference that cannot be resolved
// (unknown contract, subject without a filter relation, unknown
// filter) ends that branch silently — a dangling reference yields zero
// output, never an error.

use tracing::{debug, warn};

use fabricbeat_api::{ApicSession, Error, ManagedObject};

use crate::index::{
    ContractIndex, EpgPolicy, FilterIndex, SubjectIndex, build_contract_index, build_epg_policies,
    build_filter_index, build_subject_index,
};
use crate::record::{Document, PolicyRuleRecord, Tags, to_document};

/// The four snapshot indices of one fabric poll. The join runs only
/// after all four builds complete; the builds themselves are
/// order-insensitive.
#[derive(Debug, Default)]
pub struct PolicyIndices {
    pub filters: FilterIndex,
    pub contracts: ContractIndex,
    pub subjects: SubjectIndex,
    pub epgs: Vec<EpgPolicy>,
}

impl PolicyIndices {
    /// Fetch the four policy classes and build their indices. A failed
    /// fetch for one class leaves that index empty and the downstream
    /// joins degrade; only session-fatal errors abort the build.
    pub async fn fetch(session: &ApicSession) -> Result<Self, Error> {
        let filters = fetch_degraded(session, "vzFilter", &["vzEntry"]).await?;
        let contracts = fetch_degraded(session, "vzBrCP", &["vzSubj"]).await?;
        let subjects = fetch_degraded(session, "vzSubj", &["vzRsSubjFiltAtt"]).await?;
        let epgs = fetch_degraded(session, "fvAEPg", &["fvRsProv", "fvRsCons"]).await?;

        Ok(Self {
            filters: build_filter_index(&filters),
            contracts: build_contract_index(&contracts),
            subjects: build_subject_index(&subjects),
            epgs: build_epg_policies(&epgs),
        })
    }

    /// Run the chain join and emit one flat record per surviving
    /// (EPG, direction, contract, subject, entry) combination.
    pub fn join(&self, tags: &Tags) -> Vec<Document> {
        let mut docs = Vec::new();
        for epg in &self.epgs {
            for (direction, contract_name) in &epg.relations {
                let Some(subject_names) = self.contracts.get(contract_name) else {
                    continue;
                };
                for subject_name in subject_names {
                    let Some(filter_name) = self.subjects.get(subject_name) else {
                        continue;
                    };
                    let Some(entries) = self.filters.get(filter_name) else {
                        continue;
                    };
                    for entry in entries {
                        docs.push(to_document(&PolicyRuleRecord {
                            mo: "fvAEPg",
                            hlq: tags.hlq(&epg.hlq),
                            tenant: epg.tenant.clone(),
                            ap: epg.app.clone(),
                            epg: epg.epg.clone(),
                            site: tags.site.clone(),
                            fabric: tags.fabric.clone(),
                            contract: contract_name.clone(),
                            contract_direction: *direction,
                            filter: filter_name.clone(),
                            entry_name: entry.name.clone(),
                            prot: entry.prot.clone(),
                            from_port: entry.from_port.clone(),
                            to_port: entry.to_port.clone(),
                        }));
                    }
                }
            }
        }
        debug!(records = docs.len(), "policy join complete");
        docs
    }
}

/// Fetch the policy rule documents for one fabric.
pub async fn collect_policy_rules(
    session: &ApicSession,
    tags: &Tags,
) -> Result<Vec<Document>, Error> {
    let indices = PolicyIndices::fetch(session).await?;
    Ok(indices.join(tags))
}

/// Class fetch that degrades to an empty result on non-fatal errors:
/// the affected class simply contributes an empty index for this poll.
async fn fetch_degraded(
    session: &ApicSession,
    class_name: &str,
    subtree_classes: &[&str],
) -> Result<Vec<ManagedObject>, Error> {
    match session.fetch_class(class_name, subtree_classes).await {
        Ok(mos) => Ok(mos),
        Err(err) if err.is_session_fatal() => Err(err),
        Err(err) => {
            warn!(class = class_name, "class fetch failed, index will be empty: {err}");
            Ok(Vec::new())
        }
    }
}
