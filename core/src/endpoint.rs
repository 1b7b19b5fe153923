use crate::error::CoreError;

/// Route templates of the Websets API. Placeholders are colon-prefixed path
/// segments, substituted by [`resolve`].
pub mod routes {
    pub const WEBSETS: &str = "/websets";
    pub const WEBSET_BY_ID: &str = "/websets/:websetId";
    pub const WEBSET_ITEMS: &str = "/websets/:websetId/items";
    pub const WEBSET_ITEM_BY_ID: &str = "/websets/:websetId/items/:itemId";
    pub const WEBSET_ITEMS_BATCH_UPDATE: &str = "/websets/:websetId/items/batch-update";
    pub const WEBSET_ITEMS_BATCH_DELETE: &str = "/websets/:websetId/items/batch-delete";
    pub const WEBSET_ITEMS_BATCH_VERIFY: &str = "/websets/:websetId/items/batch-verify";
    pub const WEBSET_SEARCHES: &str = "/websets/:websetId/searches";
    pub const WEBSET_SEARCH_BY_ID: &str = "/websets/:websetId/searches/:searchId";
    pub const WEBSET_SEARCH_CANCEL: &str = "/websets/:websetId/searches/:searchId/cancel";
    pub const WEBSET_ENRICHMENTS: &str = "/websets/:websetId/enrichments";
    pub const WEBSET_ENRICHMENT_BY_ID: &str = "/websets/:websetId/enrichments/:enrichmentId";
}

/// Substitutes every `:name` segment in `template` with its value from
/// `params`. Values are inserted verbatim — callers supply already-safe
/// identifiers. A placeholder with no (or an empty) value fails with
/// `MissingParameter`; the path is never partially substituted.
pub fn resolve(template: &str, params: &[(&str, &str)]) -> Result<String, CoreError> {
    let mut segments = Vec::new();
    for segment in template.split('/') {
        match segment.strip_prefix(':') {
            Some(name) => {
                let value = params
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| value.trim())
                    .filter(|value| !value.is_empty())
                    .ok_or_else(|| CoreError::MissingParameter(name.to_string()))?;
                segments.push(value);
            }
            None => segments.push(segment),
        }
    }
    Ok(segments.join("/"))
}
