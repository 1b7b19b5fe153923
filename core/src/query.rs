use crate::types::VerificationStatus;

/// Ordered query-parameter set. Only fields that are actually present are
/// ever appended — the remote API treats an empty value differently from an
/// omitted one, so absence must mean absence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: &str, value: impl Into<String>) {
        self.pairs.push((key.to_string(), value.into()));
    }

    pub fn push_opt_str(&mut self, key: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.push(key, value);
        }
    }

    pub fn push_opt_u64(&mut self, key: &str, value: Option<u64>) {
        if let Some(value) = value {
            self.push(key, value.to_string());
        }
    }

    pub fn push_opt_bool(&mut self, key: &str, value: Option<bool>) {
        if let Some(value) = value {
            self.push(key, if value { "true" } else { "false" });
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// Optional filters accepted by the item listing endpoint. Field names match
/// the wire contract; all fields are omitted from the query when absent.
#[derive(Debug, Clone, Default)]
pub struct ItemListFilters {
    pub item_type: Option<String>,
    pub verification_status: Option<VerificationStatus>,
    pub has_enriched_data: Option<bool>,
    pub created_after: Option<String>,
    pub created_before: Option<String>,
    pub updated_after: Option<String>,
    pub updated_before: Option<String>,
}

impl ItemListFilters {
    /// Appends the present filters in canonical order. Values are trusted —
    /// schema validation happened at the tool boundary.
    pub fn apply(&self, query: &mut Query) {
        query.push_opt_str("type", self.item_type.as_deref());
        query.push_opt_str(
            "verificationStatus",
            self.verification_status.map(VerificationStatus::as_str),
        );
        query.push_opt_bool("hasEnrichedData", self.has_enriched_data);
        query.push_opt_str("createdAfter", self.created_after.as_deref());
        query.push_opt_str("createdBefore", self.created_before.as_deref());
        query.push_opt_str("updatedAfter", self.updated_after.as_deref());
        query.push_opt_str("updatedBefore", self.updated_before.as_deref());
    }
}
