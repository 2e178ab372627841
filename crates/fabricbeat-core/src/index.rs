// Policy index construction
//
// The build phase of the join engine: four independently fetched
// object-class forests become four immutable snapshot indices, keyed
// by name. Built once per fabric poll from a completed fetch result;
// never mutated afterwards, never reused across fabrics. DN-hierarchy
// parsing and relation-prefix stripping stand in for foreign keys.

use std::collections::HashMap;

use serde::Serialize;
use tracing::trace;

use fabricbeat_api::ManagedObject;

use crate::dn::{Dn, strip_prefix};

/// Which side of a contract an EPG sits on. Decoded from the relation
/// child's class tag at the fetch boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ContractDirection {
    Provide,
    Consume,
}

impl ContractDirection {
    /// Decode a relation child class (`fvRsProv` / `fvRsCons`).
    /// Unknown child kinds decode to `None` and are skipped.
    pub fn from_class(class: &str) -> Option<Self> {
        match class {
            "fvRsProv" => Some(Self::Provide),
            "fvRsCons" => Some(Self::Consume),
            _ => None,
        }
    }
}

/// One match entry of a traffic filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEntry {
    pub name: String,
    pub prot: String,
    pub from_port: String,
    pub to_port: String,
}

/// Filter name → ordered match entries.
pub type FilterIndex = HashMap<String, Vec<FilterEntry>>;

/// Contract name → subject names, in response order.
pub type ContractIndex = HashMap<String, Vec<String>>;

/// Subject name → referenced filter name.
pub type SubjectIndex = HashMap<String, String>;

/// One EPG with its decoded contract relations.
#[derive(Debug, Clone)]
pub struct EpgPolicy {
    /// Five-segment DN prefix (through tenant/app/EPG scope).
    pub hlq: String,
    pub tenant: String,
    pub app: String,
    pub epg: String,
    pub relations: Vec<(ContractDirection, String)>,
}

/// Build the filter index from `vzFilter` objects fetched with a
/// `vzEntry` subtree.
pub fn build_filter_index(mos: &[ManagedObject]) -> FilterIndex {
    let mut index = FilterIndex::new();
    for mo in mos {
        let Some(filter_name) = mo.name() else { continue };
        let entries = mo
            .children_of("vzEntry")
            .map(|entry| FilterEntry {
                name: entry.name().unwrap_or_default().to_owned(),
                prot: entry.attr("prot").unwrap_or_default().to_owned(),
                from_port: entry.attr("sFromPort").unwrap_or_default().to_owned(),
                to_port: entry.attr("sToPort").unwrap_or_default().to_owned(),
            })
            .collect();
        index.insert(filter_name.to_owned(), entries);
    }
    trace!(filters = index.len(), "filter index built");
    index
}

/// Build the contract index from `vzBrCP` objects fetched with a
/// `vzSubj` subtree. Contract children arrive heterogeneously keyed
/// across controller versions, so every immediate child's `name`
/// attribute is read regardless of its class tag.
pub fn build_contract_index(mos: &[ManagedObject]) -> ContractIndex {
    let mut index = ContractIndex::new();
    for mo in mos {
        let Some(contract_name) = mo.name() else { continue };
        let subjects = mo
            .children()
            .iter()
            .filter_map(ManagedObject::name)
            .map(str::to_owned)
            .collect();
        index.insert(contract_name.to_owned(), subjects);
    }
    trace!(contracts = index.len(), "contract index built");
    index
}

/// Build the subject index from `vzSubj` objects fetched with a
/// `vzRsSubjFiltAtt` subtree. The filter name comes from the relation's
/// `tRn` attribute minus the `flt-` marker.
///
/// Subject names are assumed unique fabric-wide; a repeated name keeps
/// the last fetched mapping.
pub fn build_subject_index(mos: &[ManagedObject]) -> SubjectIndex {
    let mut index = SubjectIndex::new();
    for mo in mos {
        let Some(subject_name) = mo.name() else { continue };
        for relation in mo.children_of("vzRsSubjFiltAtt") {
            let Some(t_rn) = relation.attr("tRn") else { continue };
            index.insert(subject_name.to_owned(), strip_prefix(t_rn, "flt-").to_owned());
        }
    }
    trace!(subjects = index.len(), "subject index built");
    index
}

/// Decode `fvAEPg` objects (fetched with `fvRsProv` + `fvRsCons`
/// subtrees) into per-EPG relation lists. Tenant/app/EPG identity
/// comes from the DN; the contract name from the relation's `tRn`
/// attribute minus the `brc-` marker.
pub fn build_epg_policies(mos: &[ManagedObject]) -> Vec<EpgPolicy> {
    let mut epgs = Vec::new();
    for mo in mos {
        let Some(dn) = mo.dn() else { continue };
        let dn = Dn::parse(dn);

        let relations = mo
            .children()
            .iter()
            .filter_map(|child| {
                let direction = ContractDirection::from_class(child.class())?;
                let t_rn = child.attr("tRn")?;
                Some((direction, strip_prefix(t_rn, "brc-").to_owned()))
            })
            .collect();

        epgs.push(EpgPolicy {
            hlq: dn.location_key(5),
            tenant: dn.tenant().unwrap_or_default().to_owned(),
            app: dn.app().unwrap_or_default().to_owned(),
            epg: dn.epg().unwrap_or_default().to_owned(),
            relations,
        });
    }
    trace!(epgs = epgs.len(), "EPG relations decoded");
    epgs
}
