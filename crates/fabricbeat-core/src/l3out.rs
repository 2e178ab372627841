// External-route-table traversal
//
// Two external endpoint-group classes need a nested two-hop walk:
// external EPG → owning L3Out → logical node profiles → node
// attachments, counting attachments per target device. The classes
// differ only in how the owning L3Out DN is derived from the external
// EPG's DN, so one traversal routine takes the derivation as a
// parameter.

use std::collections::BTreeMap;

use tracing::warn;

use fabricbeat_api::{ApicSession, Error, ManagedObject};

use crate::dn::Dn;
use crate::record::{Document, LocationCount, Tags};

/// How an external EPG's DN names its owning L3Out.
pub type L3outDerivation = fn(&str) -> Option<String>;

/// `fvRtdEpP` embeds the L3Out inside a bracketed target reference:
/// `.../rtdEpP-[uni/tn-T/out-CORE/instP-X]` → `uni/tn-T/out-CORE`.
pub fn l3out_from_bracketed(dn: &str) -> Option<String> {
    let (_, target) = dn.split_once('[')?;
    Dn::parse(target).parent()
}

/// `l3extInstP` lives directly under its L3Out:
/// `uni/tn-T/out-CORE/instP-X` → `uni/tn-T/out-CORE`.
pub fn l3out_from_parent(dn: &str) -> Option<String> {
    Dn::parse(dn).parent()
}

/// Count `l3extRsNodeL3OutAtt` attachments per target device across
/// every external EPG of `class_name`, emitting one record per
/// location with a `{class}_count` field.
///
/// Two external EPGs under the same L3Out traverse it twice and the
/// attachments count twice; counts are per-reference, not per-L3Out.
pub async fn count_node_attachments(
    session: &ApicSession,
    class_name: &str,
    derive: L3outDerivation,
    tags: &Tags,
) -> Result<Vec<Document>, Error> {
    let ext_epgs = session.fetch_class(class_name, &[]).await?;

    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for ext_epg in &ext_epgs {
        let Some(dn) = ext_epg.dn() else { continue };
        let Some(l3out_dn) = derive(dn) else { continue };

        for l3out in fetch_mo_degraded(session, &l3out_dn, "l3extLNodeP").await? {
            for node_profile in l3out.children_of("l3extLNodeP") {
                let Some(rn) = node_profile.rn() else { continue };
                let profile_dn = format!("{l3out_dn}/{rn}");

                for profile in
                    fetch_mo_degraded(session, &profile_dn, "l3extRsNodeL3OutAtt").await?
                {
                    for attachment in profile.children_of("l3extRsNodeL3OutAtt") {
                        if let Some(target) = attachment.attr("tDn") {
                            *counts.entry(target.to_owned()).or_insert(0) += 1;
                        }
                    }
                }
            }
        }
    }

    Ok(counts
        .into_iter()
        .map(|(location, count)| {
            let dn = Dn::parse(location.as_str());
            LocationCount {
                class: class_name.to_owned(),
                pod: dn.pod().unwrap_or_default().to_owned(),
                node: dn.node().unwrap_or_default().to_owned(),
                location,
                count,
            }
            .into_document(tags)
        })
        .collect())
}

/// MO fetch that degrades to an empty result on non-fatal errors, so
/// one unreachable branch of the walk drops out without aborting the
/// rest.
async fn fetch_mo_degraded(
    session: &ApicSession,
    dn: &str,
    subtree_class: &str,
) -> Result<Vec<ManagedObject>, Error> {
    match session.fetch_mo(dn, subtree_class).await {
        Ok(mos) => Ok(mos),
        Err(err) if err.is_session_fatal() => Err(err),
        Err(err) => {
            warn!(dn, "MO fetch failed, skipping branch: {err}");
            Ok(Vec::new())
        }
    }
}
