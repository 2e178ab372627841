// Per-device aggregation
//
// Generic "count objects of one class grouped by pod/node location".
// Reused verbatim for every count-only class (rtmapRule, rtmapEntry,
// rtpfxEntry, actrlPfxEntry, actrlRule); the join-requiring classes
// live in the policy module.

use std::collections::BTreeMap;

use fabricbeat_api::{ApicSession, Error};

use crate::dn::Dn;
use crate::record::{Document, LocationCount, Tags};

/// Fetch `class_name` fabric-wide and emit one record per distinct
/// pod/node location carrying that location's object count. Zero rows
/// is a valid outcome and yields zero records.
pub async fn count_by_location(
    session: &ApicSession,
    class_name: &str,
    tags: &Tags,
) -> Result<Vec<Document>, Error> {
    let mos = session.fetch_class(class_name, &[]).await?;

    // BTreeMap keeps emission order stable across polls.
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for mo in &mos {
        let Some(dn) = mo.dn() else { continue };
        *counts.entry(Dn::parse(dn).location_key(3)).or_insert(0) += 1;
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
