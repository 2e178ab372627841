// Learned-endpoint collection
//
// fvCEp objects with their fvIp children. Endpoints attached directly
// to a VRF (DNs carrying a `ctx-` segment) are not EPG members and are
// filtered out. An endpoint with several learned IPs fans out into one
// record per IP; an endpoint with none still emits a single record
// with an empty address.

use fabricbeat_api::{ApicSession, Error};

use crate::dn::Dn;
use crate::record::{Document, EndpointRecord, Tags, to_document};

pub async fn collect_endpoints(
    session: &ApicSession,
    tags: &Tags,
) -> Result<Vec<Document>, Error> {
    let mos = session.fetch_class("fvCEp", &["fvIp"]).await?;

    let mut docs = Vec::new();
    for mo in &mos {
        let Some(raw_dn) = mo.dn() else { continue };
        // e.g. uni/tn-common/ctx-prod/cep-E8:98:6D:54:E0:12
        if raw_dn.contains("ctx-") {
            continue;
        }
        let dn = Dn::parse(raw_dn);

        let record = EndpointRecord {
            mo: "fvCEp",
            hlq: tags.hlq(&dn.location_key(5)),
            tenant: dn.tenant().unwrap_or_default().to_owned(),
            ap: dn.app().unwrap_or_default().to_owned(),
            epg: dn.epg().unwrap_or_default().to_owned(),
            site: tags.site.clone(),
            fabric: tags.fabric.clone(),
            encap: mo.attr("encap").unwrap_or_default().to_owned(),
            mac: mo.attr("mac").unwrap_or_default().to_owned(),
            fv_ip: String::new(),
        };

        let ips: Vec<&str> = mo
            .children_of("fvIp")
            .filter_map(|ip| ip.attr("addr"))
            .collect();
        if ips.is_empty() {
            docs.push(to_document(&record));
        } else {
            for ip in ips {
                docs.push(to_document(&EndpointRecord {
                    fv_ip: ip.to_owned(),
                    ..record.clone()
                }));
            }
        }
    }
    Ok(docs)
}
