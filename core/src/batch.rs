//! Batch mutation coordination: one mutation applied to a set of item ids,
//! either through the remote batch endpoint (native) or as a sequential
//! per-item loop with partial-failure aggregation (emulated).

use serde_json::{Value, json};

use crate::client::WebsetsClient;
use crate::endpoint::{resolve, routes};
use crate::error::CoreError;
use crate::types::VerificationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStrategy {
    /// One remote call carrying the full id set; one aggregate outcome.
    Native,
    /// One remote call per id, sequential, in caller order; every id is
    /// attempted exactly once regardless of earlier failures.
    Emulated,
}

impl BatchStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            BatchStrategy::Native => "native",
            BatchStrategy::Emulated => "emulated",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationKind {
    Update,
    Delete,
    Verify,
}

/// The mutation applied identically to every id in the batch.
#[derive(Debug, Clone)]
pub enum BatchMutation {
    /// Partial update; the payload is the PATCH body the remote accepts for
    /// a single item (metadata, verification, customFields).
    Update(Value),
    Delete,
    Verify {
        status: VerificationStatus,
        reasoning: Option<String>,
    },
}

impl BatchMutation {
    pub fn kind(&self) -> MutationKind {
        match self {
            BatchMutation::Update(_) => MutationKind::Update,
            BatchMutation::Delete => MutationKind::Delete,
            BatchMutation::Verify { .. } => MutationKind::Verify,
        }
    }

    fn verification_body(status: VerificationStatus, reasoning: &Option<String>) -> Value {
        let mut verification = json!({ "status": status.as_str() });
        if let Some(reasoning) = reasoning {
            verification["reasoning"] = json!(reasoning);
        }
        verification
    }
}

/// Per-mutation-kind strategy selection. Whether the remote batch endpoints
/// actually exist is unconfirmed, so this stays configuration rather than an
/// assumption baked into call sites.
#[derive(Debug, Clone, Copy)]
pub struct BatchProfile {
    pub update: BatchStrategy,
    pub delete: BatchStrategy,
    pub verify: BatchStrategy,
}

impl Default for BatchProfile {
    fn default() -> Self {
        Self {
            update: BatchStrategy::Native,
            delete: BatchStrategy::Native,
            verify: BatchStrategy::Native,
        }
    }
}

impl BatchProfile {
    pub fn strategy_for(&self, kind: MutationKind) -> BatchStrategy {
        match kind {
            MutationKind::Update => self.update,
            MutationKind::Delete => self.delete,
            MutationKind::Verify => self.verify,
        }
    }

    pub fn emulate(&mut self, kind: MutationKind) {
        match kind {
            MutationKind::Update => self.update = BatchStrategy::Emulated,
            MutationKind::Delete => self.delete = BatchStrategy::Emulated,
            MutationKind::Verify => self.verify = BatchStrategy::Emulated,
        }
    }
}

/// Outcome of one per-item attempt in an emulated batch.
#[derive(Debug)]
pub struct ItemOutcome {
    pub item_id: String,
    pub result: Result<Value, CoreError>,
}

impl ItemOutcome {
    fn to_value(&self) -> Value {
        match &self.result {
            Ok(response) => json!({
                "itemId": self.item_id,
                "ok": true,
                "response": response,
            }),
            Err(err) => {
                let mut value = json!({
                    "itemId": self.item_id,
                    "ok": false,
                    "error": err.code(),
                    "message": err.to_string(),
                });
                if let CoreError::RemoteApi { status, .. } = err {
                    value["status"] = json!(status);
                }
                value
            }
        }
    }
}

#[derive(Debug)]
pub enum BatchOutcome {
    Native {
        requested: usize,
        response: Value,
    },
    Emulated {
        outcomes: Vec<ItemOutcome>,
        succeeded: usize,
        failed: usize,
    },
}

impl BatchOutcome {
    pub fn to_value(&self) -> Value {
        match self {
            BatchOutcome::Native {
                requested,
                response,
            } => json!({
                "strategy": BatchStrategy::Native.as_str(),
                "requestedCount": requested,
                "response": response,
            }),
            BatchOutcome::Emulated {
                outcomes,
                succeeded,
                failed,
            } => json!({
                "strategy": BatchStrategy::Emulated.as_str(),
                "requestedCount": outcomes.len(),
                "succeeded": succeeded,
                "failed": failed,
                "outcomes": outcomes.iter().map(ItemOutcome::to_value).collect::<Vec<_>>(),
            }),
        }
    }
}

/// Applies one mutation to a set of item ids through the configured strategy.
pub struct BatchCoordinator<'a> {
    client: &'a WebsetsClient,
    profile: BatchProfile,
}

impl<'a> BatchCoordinator<'a> {
    pub fn new(client: &'a WebsetsClient, profile: BatchProfile) -> Self {
        Self { client, profile }
    }

    /// Rejects an empty id set before any network call. Duplicate ids are
    /// not deduplicated; they produce duplicate attempts and outcomes.
    pub async fn apply(
        &self,
        webset_id: &str,
        item_ids: &[String],
        mutation: &BatchMutation,
    ) -> Result<BatchOutcome, CoreError> {
        if item_ids.is_empty() {
            return Err(CoreError::EmptyBatch);
        }
        match self.profile.strategy_for(mutation.kind()) {
            BatchStrategy::Native => self.apply_native(webset_id, item_ids, mutation).await,
            BatchStrategy::Emulated => Ok(self.apply_emulated(webset_id, item_ids, mutation).await),
        }
    }

    async fn apply_native(
        &self,
        webset_id: &str,
        item_ids: &[String],
        mutation: &BatchMutation,
    ) -> Result<BatchOutcome, CoreError> {
        let params = [("websetId", webset_id)];
        let (path, body) = match mutation {
            BatchMutation::Update(updates) => (
                resolve(routes::WEBSET_ITEMS_BATCH_UPDATE, &params)?,
                json!({ "itemIds": item_ids, "updates": updates }),
            ),
            BatchMutation::Delete => (
                resolve(routes::WEBSET_ITEMS_BATCH_DELETE, &params)?,
                json!({ "itemIds": item_ids }),
            ),
            BatchMutation::Verify { status, reasoning } => (
                resolve(routes::WEBSET_ITEMS_BATCH_VERIFY, &params)?,
                json!({
                    "itemIds": item_ids,
                    "verification": BatchMutation::verification_body(*status, reasoning),
                }),
            ),
        };
        let response = self.client.post(&path, body).await?;
        Ok(BatchOutcome::Native {
            requested: item_ids.len(),
            response,
        })
    }

    async fn apply_emulated(
        &self,
        webset_id: &str,
        item_ids: &[String],
        mutation: &BatchMutation,
    ) -> BatchOutcome {
        let mut outcomes = Vec::with_capacity(item_ids.len());
        let mut succeeded = 0;
        let mut failed = 0;
        for item_id in item_ids {
            let result = self.apply_single(webset_id, item_id, mutation).await;
            match &result {
                Ok(_) => succeeded += 1,
                Err(_) => failed += 1,
            }
            outcomes.push(ItemOutcome {
                item_id: item_id.clone(),
                result,
            });
        }
        BatchOutcome::Emulated {
            outcomes,
            succeeded,
            failed,
        }
    }

    async fn apply_single(
        &self,
        webset_id: &str,
        item_id: &str,
        mutation: &BatchMutation,
    ) -> Result<Value, CoreError> {
        let path = resolve(
            routes::WEBSET_ITEM_BY_ID,
            &[("websetId", webset_id), ("itemId", item_id)],
        )?;
        match mutation {
            BatchMutation::Update(updates) => self.client.patch(&path, updates.clone()).await,
            BatchMutation::Delete => self.client.delete(&path).await,
            BatchMutation::Verify { status, reasoning } => {
                let body = json!({
                    "verification": BatchMutation::verification_body(*status, reasoning),
                });
                self.client.patch(&path, body).await
            }
        }
    }
}
