//! Response projection: maps full resource payloads into the reduced views
//! individual tools promise. Inputs are borrowed and never mutated; unknown
//! fields are dropped; absent optional fields stay absent in the view.

use serde_json::{Map, Value, json};

fn copy_field(src: &Value, dst: &mut Map<String, Value>, key: &str) {
    if let Some(value) = src.get(key) {
        if !value.is_null() {
            dst.insert(key.to_string(), value.clone());
        }
    }
}

/// True iff the item carries a non-empty enrichment mapping.
pub fn has_enriched_data(item: &Value) -> bool {
    item.get("enrichedData")
        .and_then(Value::as_object)
        .is_some_and(|map| !map.is_empty())
}

/// Listing view of an item: identity, provenance, verification state, and
/// the derived enrichment flag.
pub fn item_summary(item: &Value) -> Value {
    let mut view = Map::new();
    copy_field(item, &mut view, "id");
    copy_field(item, &mut view, "url");
    copy_field(item, &mut view, "title");
    copy_field(item, &mut view, "type");
    if let Some(status) = item.pointer("/verification/status") {
        if !status.is_null() {
            view.insert("verificationStatus".to_string(), status.clone());
        }
    }
    view.insert("hasEnrichedData".to_string(), json!(has_enriched_data(item)));
    copy_field(item, &mut view, "createdAt");
    copy_field(item, &mut view, "updatedAt");
    Value::Object(view)
}

/// Source-oriented view of an item, used by the search-items listing: keeps
/// provenance and the structured result payloads, drops page content.
pub fn item_source_view(item: &Value) -> Value {
    let mut view = Map::new();
    for key in [
        "id",
        "url",
        "title",
        "type",
        "source",
        "sourceId",
        "properties",
        "evaluations",
        "enrichments",
        "createdAt",
        "updatedAt",
    ] {
        copy_field(item, &mut view, key);
    }
    Value::Object(view)
}

/// Listing view of a webset: identity, lifecycle status, and counts of the
/// embedded sub-resource arrays. An absent array counts as zero because the
/// remote contract defines these as (possibly empty) collections.
pub fn webset_summary(webset: &Value) -> Value {
    let mut view = Map::new();
    copy_field(webset, &mut view, "id");
    copy_field(webset, &mut view, "status");
    copy_field(webset, &mut view, "externalId");
    for (field, source) in [
        ("searchCount", "searches"),
        ("enrichmentCount", "enrichments"),
        ("monitorCount", "monitors"),
    ] {
        let count = webset
            .get(source)
            .and_then(Value::as_array)
            .map_or(0, Vec::len);
        view.insert(field.to_string(), json!(count));
    }
    copy_field(webset, &mut view, "createdAt");
    copy_field(webset, &mut view, "updatedAt");
    Value::Object(view)
}
