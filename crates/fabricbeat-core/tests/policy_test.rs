#![allow(clippy::unwrap_used)]
// Join-engine tests: index construction and the chain join, driven on
// decoded trees with no controller in the loop.

use pretty_assertions::assert_eq;
use serde_json::json;

use fabricbeat_api::ManagedObject;
use fabricbeat_core::Tags;
use fabricbeat_core::index::{
    ContractDirection, build_contract_index, build_epg_policies, build_filter_index,
    build_subject_index,
};
use fabricbeat_core::policy::PolicyIndices;
use fabricbeat_core::record::Document;

// ── Helpers ─────────────────────────────────────────────────────────

fn mos(value: serde_json::Value) -> Vec<ManagedObject> {
    serde_json::from_value(value).unwrap()
}

fn tags() -> Tags {
    Tags {
        fabric: "FAB1".into(),
        site: "1".into(),
    }
}

/// One EPG providing one contract, one contract with one subject, one
/// subject referencing one filter with two entries.
fn complete_chain() -> PolicyIndices {
    let filters = mos(json!([{
        "vzFilter": {
            "attributes": { "name": "web-filter" },
            "children": [
                { "vzEntry": { "attributes": {
                    "name": "tcp-80", "prot": "tcp", "sFromPort": "80", "sToPort": "80"
                } } },
                { "vzEntry": { "attributes": {
                    "name": "tcp-443", "prot": "tcp", "sFromPort": "443", "sToPort": "443"
                } } }
            ]
        }
    }]));
    let contracts = mos(json!([{
        "vzBrCP": {
            "attributes": { "name": "web" },
            "children": [
                { "vzSubj": { "attributes": { "name": "web-subj" } } }
            ]
        }
    }]));
    let subjects = mos(json!([{
        "vzSubj": {
            "attributes": { "name": "web-subj" },
            "children": [
                { "vzRsSubjFiltAtt": { "attributes": { "tRn": "flt-web-filter" } } }
            ]
        }
    }]));
    let epgs = mos(json!([{
        "fvAEPg": {
            "attributes": { "dn": "uni/tn-prod/ap-shop/epg-frontend" },
            "children": [
                { "fvRsProv": { "attributes": { "tRn": "brc-web" } } }
            ]
        }
    }]));

    PolicyIndices {
        filters: build_filter_index(&filters),
        contracts: build_contract_index(&contracts),
        subjects: build_subject_index(&subjects),
        epgs: build_epg_policies(&epgs),
    }
}

fn sorted(mut docs: Vec<Document>) -> Vec<String> {
    let mut keys: Vec<String> = docs
        .drain(..)
        .map(|d| serde_json::Value::Object(d).to_string())
        .collect();
    keys.sort();
    keys
}

// ── Join completeness ───────────────────────────────────────────────

#[test]
fn join_emits_one_record_per_filter_entry() {
    let docs = complete_chain().join(&tags());

    assert_eq!(docs.len(), 2);
    for doc in &docs {
        assert_eq!(doc["mo"], "fvAEPg");
        assert_eq!(doc["hlq"], "FAB1/uni/tn-prod/ap-shop/epg-frontend");
        assert_eq!(doc["tenant"], "prod");
        assert_eq!(doc["ap"], "shop");
        assert_eq!(doc["epg"], "frontend");
        assert_eq!(doc["contract"], "web");
        assert_eq!(doc["contract_direction"], "provide");
        assert_eq!(doc["filter"], "web-filter");
        assert_eq!(doc["prot"], "tcp");
    }
    // The two records differ only in entry-specific fields.
    let entry_names: Vec<&str> = docs.iter().map(|d| d["entry_name"].as_str().unwrap()).collect();
    assert_eq!(entry_names, ["tcp-80", "tcp-443"]);
    assert_eq!(docs[0]["from_port"], "80");
    assert_eq!(docs[1]["from_port"], "443");
}

#[test]
fn consume_relation_carries_consume_direction() {
    let mut indices = complete_chain();
    indices.epgs = build_epg_policies(&mos(json!([{
        "fvAEPg": {
            "attributes": { "dn": "uni/tn-prod/ap-shop/epg-backend" },
            "children": [
                { "fvRsCons": { "attributes": { "tRn": "brc-web" } } }
            ]
        }
    }])));

    let docs = indices.join(&tags());
    assert_eq!(docs.len(), 2);
    assert_eq!(docs[0]["contract_direction"], "consume");
}

// ── Dangling references ─────────────────────────────────────────────

#[test]
fn unknown_contract_emits_nothing() {
    let mut indices = complete_chain();
    indices.epgs = build_epg_policies(&mos(json!([{
        "fvAEPg": {
            "attributes": { "dn": "uni/tn-prod/ap-shop/epg-orphan" },
            "children": [
                { "fvRsProv": { "attributes": { "tRn": "brc-no-such-contract" } } }
            ]
        }
    }])));

    assert!(indices.join(&tags()).is_empty());
}

#[test]
fn subject_without_filter_relation_emits_nothing() {
    let mut indices = complete_chain();
    // The subject exists but its filter-relation child is missing, so
    // the subject index has no entry for it.
    indices.subjects = build_subject_index(&mos(json!([{
        "vzSubj": { "attributes": { "name": "web-subj" } }
    }])));

    assert!(indices.join(&tags()).is_empty());
}

#[test]
fn unknown_filter_emits_nothing() {
    let mut indices = complete_chain();
    indices.filters = build_filter_index(&[]);

    assert!(indices.join(&tags()).is_empty());
}

// ── Idempotence ─────────────────────────────────────────────────────

#[test]
fn join_is_idempotent_over_identical_trees() {
    let first = complete_chain().join(&tags());
    let second = complete_chain().join(&tags());

    assert_eq!(sorted(first), sorted(second));
}

// ── Index construction details ──────────────────────────────────────

#[test]
fn contract_children_accepted_regardless_of_class_tag() {
    // Contract children can arrive keyed by any child kind; every
    // immediate child's name is read.
    let contracts = build_contract_index(&mos(json!([{
        "vzBrCP": {
            "attributes": { "name": "mixed" },
            "children": [
                { "vzSubj": { "attributes": { "name": "subj-a" } } },
                { "vzSubjAlias": { "attributes": { "name": "subj-b" } } }
            ]
        }
    }])));

    assert_eq!(contracts["mixed"], vec!["subj-a", "subj-b"]);
}

#[test]
fn repeated_subject_name_keeps_last_mapping() {
    let subjects = build_subject_index(&mos(json!([
        {
            "vzSubj": {
                "attributes": { "name": "shared" },
                "children": [
                    { "vzRsSubjFiltAtt": { "attributes": { "tRn": "flt-first" } } }
                ]
            }
        },
        {
            "vzSubj": {
                "attributes": { "name": "shared" },
                "children": [
                    { "vzRsSubjFiltAtt": { "attributes": { "tRn": "flt-second" } } }
                ]
            }
        }
    ])));

    assert_eq!(subjects["shared"], "second");
}

#[test]
fn subject_attached_to_two_contracts_joins_twice() {
    let mut indices = complete_chain();
    indices.contracts = build_contract_index(&mos(json!([
        {
            "vzBrCP": {
                "attributes": { "name": "web" },
                "children": [{ "vzSubj": { "attributes": { "name": "web-subj" } } }]
            }
        },
        {
            "vzBrCP": {
                "attributes": { "name": "web-dr" },
                "children": [{ "vzSubj": { "attributes": { "name": "web-subj" } } }]
            }
        }
    ])));
    indices.epgs = build_epg_policies(&mos(json!([{
        "fvAEPg": {
            "attributes": { "dn": "uni/tn-prod/ap-shop/epg-frontend" },
            "children": [
                { "fvRsProv": { "attributes": { "tRn": "brc-web" } } },
                { "fvRsCons": { "attributes": { "tRn": "brc-web-dr" } } }
            ]
        }
    }])));

    // Two independent join paths, two entries each.
    let docs = indices.join(&tags());
    assert_eq!(docs.len(), 4);
}

#[test]
fn unknown_relation_child_kinds_are_skipped() {
    let epgs = build_epg_policies(&mos(json!([{
        "fvAEPg": {
            "attributes": { "dn": "uni/tn-prod/ap-shop/epg-frontend" },
            "children": [
                { "fvRsProv": { "attributes": { "tRn": "brc-web" } } },
                { "fvRsBd": { "attributes": { "tRn": "bd-main" } } }
            ]
        }
    }])));

    assert_eq!(epgs.len(), 1);
    assert_eq!(
        epgs[0].relations,
        vec![(ContractDirection::Provide, "web".to_owned())]
    );
}

#[test]
fn filter_entry_order_is_preserved() {
    let filters = build_filter_index(&mos(json!([{
        "vzFilter": {
            "attributes": { "name": "ordered" },
            "children": [
                { "vzEntry": { "attributes": { "name": "z-last", "prot": "udp" } } },
                { "vzEntry": { "attributes": { "name": "a-first", "prot": "tcp" } } }
            ]
        }
    }])));

    let names: Vec<&str> = filters["ordered"].iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["z-last", "a-first"]);
}
