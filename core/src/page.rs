use serde_json::Value;

use crate::query::Query;

/// Caller side of the pagination protocol: an opaque cursor from the previous
/// page and an optional page-size limit. The remote service owns the default
/// and maximum; both values pass through unmodified.
#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    pub cursor: Option<String>,
    pub limit: Option<u64>,
}

impl PageRequest {
    pub fn apply(&self, query: &mut Query) {
        query.push_opt_str("cursor", self.cursor.as_deref());
        query.push_opt_u64("limit", self.limit);
    }
}

/// One page of a listing response, exactly as the remote service reported
/// it: no re-ordering, no filtering, no deduplication. The cursor is only
/// surfaced when further pages exist.
#[derive(Debug, Clone)]
pub struct Page {
    pub items: Vec<Value>,
    pub has_more: bool,
    pub next_cursor: Option<String>,
}

impl Page {
    pub fn from_response(body: &Value) -> Self {
        let items = body
            .get("data")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let has_more = body.get("hasMore").and_then(Value::as_bool).unwrap_or(false);
        let next_cursor = if has_more {
            body.get("nextCursor")
                .and_then(Value::as_str)
                .filter(|cursor| !cursor.is_empty())
                .map(str::to_string)
        } else {
            None
        };
        Self {
            items,
            has_more,
            next_cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_request_omits_absent_fields() {
        let mut query = Query::new();
        PageRequest::default().apply(&mut query);
        assert!(query.is_empty());
    }

    #[test]
    fn page_request_passes_cursor_and_limit_through() {
        let mut query = Query::new();
        PageRequest {
            cursor: Some("cursor_abc".into()),
            limit: Some(3),
        }
        .apply(&mut query);
        assert_eq!(
            query.pairs(),
            &[
                ("cursor".to_string(), "cursor_abc".to_string()),
                ("limit".to_string(), "3".to_string()),
            ]
        );
    }

    #[test]
    fn cursor_surfaces_exactly_when_more_pages_exist() {
        let page = Page::from_response(&json!({
            "data": [{"id": "item_1"}],
            "hasMore": true,
            "nextCursor": "cursor_next"
        }));
        assert!(page.has_more);
        assert_eq!(page.next_cursor.as_deref(), Some("cursor_next"));
    }

    #[test]
    fn no_cursor_on_final_page() {
        let page = Page::from_response(&json!({
            "data": [{"id": "item_1"}, {"id": "item_2"}],
            "hasMore": false,
            "nextCursor": "stale_cursor_the_remote_should_not_have_sent"
        }));
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn missing_data_array_is_an_empty_page() {
        let page = Page::from_response(&json!({"hasMore": false}));
        assert!(page.items.is_empty());
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
    }

    #[test]
    fn items_keep_remote_order() {
        let page = Page::from_response(&json!({
            "data": [{"id": "b"}, {"id": "a"}, {"id": "c"}],
            "hasMore": false
        }));
        let ids: Vec<&str> = page
            .items
            .iter()
            .map(|item| item["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["b", "a", "c"]);
    }
}
