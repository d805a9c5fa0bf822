//! # In-Process Document Store
//!
//! A [`DocumentStore`] backed by a single Tokio task.
//!
//! [`StoreActor`] is the "server" half: it owns every collection and the receiving end
//! of an mpsc channel. [`StoreClient`] is the cloneable "client" half that turns each
//! trait call into a [`StoreRequest`] plus a oneshot reply channel.
//!
//! **Concurrency Model**:
//! The actor processes requests sequentially, so the collections need no `Mutex`.
//! A multi-field `update_fields` is applied inside one loop iteration and can never
//! interleave with another writer on the same key. Last write wins.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::{ops, Document, DocumentStore, FieldWrite, QueryResult, StoreError, StoreFilter};

/// Type alias for the one-shot response channel used by the store actor.
pub type Response<T> = oneshot::Sender<Result<T, StoreError>>;

/// Messages understood by the [`StoreActor`], one per [`DocumentStore`] operation.
#[derive(Debug)]
pub enum StoreRequest {
    CreateIfAbsent {
        collection: String,
        key: String,
        document: Document,
        respond_to: Response<()>,
    },
    Get {
        collection: String,
        key: String,
        respond_to: Response<Document>,
    },
    UpdateFields {
        collection: String,
        key: String,
        writes: Vec<FieldWrite>,
        respond_to: Response<()>,
    },
    Delete {
        collection: String,
        key: String,
        respond_to: Response<()>,
    },
    Query {
        collection: String,
        filters: Vec<StoreFilter>,
        respond_to: Response<QueryResult>,
    },
}

type Collection = BTreeMap<String, Document>;

/// The task that owns all stored documents.
pub struct StoreActor {
    receiver: mpsc::Receiver<StoreRequest>,
    collections: HashMap<String, Collection>,
}

impl StoreActor {
    pub fn new(buffer_size: usize) -> (Self, StoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            collections: HashMap::new(),
        };
        (actor, StoreClient::new(sender))
    }

    /// Runs the request loop until every [`StoreClient`] has been dropped.
    pub async fn run(mut self) {
        info!("Store started");

        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::CreateIfAbsent {
                    collection,
                    key,
                    document,
                    respond_to,
                } => {
                    debug!(%collection, %key, "CreateIfAbsent");
                    let docs = self.collections.entry(collection.clone()).or_default();
                    let result = if docs.contains_key(&key) {
                        warn!(%collection, %key, "Already exists");
                        Err(StoreError::AlreadyExists(key))
                    } else {
                        docs.insert(key.clone(), document);
                        info!(%collection, %key, size = docs.len(), "Created");
                        Ok(())
                    };
                    let _ = respond_to.send(result);
                }
                StoreRequest::Get {
                    collection,
                    key,
                    respond_to,
                } => {
                    let doc = self
                        .collections
                        .get(&collection)
                        .and_then(|docs| docs.get(&key))
                        .cloned();
                    debug!(%collection, %key, found = doc.is_some(), "Get");
                    let _ = respond_to.send(doc.ok_or(StoreError::NotFound(key)));
                }
                StoreRequest::UpdateFields {
                    collection,
                    key,
                    writes,
                    respond_to,
                } => {
                    debug!(%collection, %key, ?writes, "UpdateFields");
                    let doc = self
                        .collections
                        .get_mut(&collection)
                        .and_then(|docs| docs.get_mut(&key));
                    let result = match doc {
                        Some(doc) => {
                            for write in writes {
                                doc.insert(write.path, write.value);
                            }
                            info!(%collection, %key, "Updated");
                            Ok(())
                        }
                        None => {
                            warn!(%collection, %key, "Not found");
                            Err(StoreError::NotFound(key))
                        }
                    };
                    let _ = respond_to.send(result);
                }
                StoreRequest::Delete {
                    collection,
                    key,
                    respond_to,
                } => {
                    debug!(%collection, %key, "Delete");
                    if let Some(docs) = self.collections.get_mut(&collection) {
                        if docs.remove(&key).is_some() {
                            info!(%collection, %key, size = docs.len(), "Deleted");
                        }
                    }
                    let _ = respond_to.send(Ok(()));
                }
                StoreRequest::Query {
                    collection,
                    filters,
                    respond_to,
                } => {
                    debug!(%collection, ?filters, "Query");
                    let docs = self.collections.get(&collection);
                    let result = run_query(docs, &filters);
                    match &result {
                        Ok(found) => debug!(%collection, matched = found.documents.len(), "Query ok"),
                        Err(e) => warn!(%collection, error = %e, "Query failed"),
                    }
                    let _ = respond_to.send(result);
                }
            }
        }

        let size: usize = self.collections.values().map(BTreeMap::len).sum();
        info!(size, "Store shutdown");
    }
}

fn run_query(docs: Option<&Collection>, filters: &[StoreFilter]) -> Result<QueryResult, StoreError> {
    if let Some(bad) = filters.iter().find(|f| !is_supported(f.operator)) {
        return Err(StoreError::Failure(format!(
            "unsupported operator '{}' on '{}'",
            bad.operator, bad.path
        )));
    }

    let documents = docs
        .into_iter()
        .flat_map(|docs| docs.values())
        .filter(|doc| filters.iter().all(|f| filter_matches(doc, f)))
        .cloned()
        .collect();

    Ok(QueryResult {
        documents,
        skipped: Vec::new(),
    })
}

fn is_supported(operator: &str) -> bool {
    matches!(
        operator,
        ops::EQ | ops::NE | ops::LT | ops::GT | ops::LE | ops::GE
    )
}

/// A missing field or a type mismatch never matches, whatever the operator.
fn filter_matches(doc: &Document, filter: &StoreFilter) -> bool {
    let Some(ordering) = doc.get(&filter.path).and_then(|v| compare(v, &filter.value)) else {
        return false;
    };
    match filter.operator {
        ops::EQ => ordering == Ordering::Equal,
        ops::NE => ordering != Ordering::Equal,
        ops::LT => ordering == Ordering::Less,
        ops::GT => ordering == Ordering::Greater,
        ops::LE => ordering != Ordering::Greater,
        ops::GE => ordering != Ordering::Less,
        _ => false,
    }
}

fn compare(stored: &Value, wanted: &Value) -> Option<Ordering> {
    match (stored, wanted) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => match (a.as_i64(), b.as_i64()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => a.as_f64()?.partial_cmp(&b.as_f64()?),
        },
        _ => None,
    }
}

/// Cloneable handle to a running [`StoreActor`].
#[derive(Clone)]
pub struct StoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl StoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }

    async fn request<T>(
        &self,
        build: impl FnOnce(Response<T>) -> StoreRequest,
    ) -> Result<T, StoreError> {
        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(build(respond_to))
            .await
            .map_err(|_| StoreError::Unavailable)?;
        response.await.map_err(|_| StoreError::Dropped)?
    }
}

#[async_trait]
impl DocumentStore for StoreClient {
    async fn create_if_absent(
        &self,
        collection: &str,
        key: &str,
        document: Document,
    ) -> Result<(), StoreError> {
        self.request(|respond_to| StoreRequest::CreateIfAbsent {
            collection: collection.to_string(),
            key: key.to_string(),
            document,
            respond_to,
        })
        .await
    }

    async fn get(&self, collection: &str, key: &str) -> Result<Document, StoreError> {
        self.request(|respond_to| StoreRequest::Get {
            collection: collection.to_string(),
            key: key.to_string(),
            respond_to,
        })
        .await
    }

    async fn update_fields(
        &self,
        collection: &str,
        key: &str,
        writes: Vec<FieldWrite>,
    ) -> Result<(), StoreError> {
        self.request(|respond_to| StoreRequest::UpdateFields {
            collection: collection.to_string(),
            key: key.to_string(),
            writes,
            respond_to,
        })
        .await
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        self.request(|respond_to| StoreRequest::Delete {
            collection: collection.to_string(),
            key: key.to_string(),
            respond_to,
        })
        .await
    }

    async fn query(
        &self,
        collection: &str,
        filters: Vec<StoreFilter>,
    ) -> Result<QueryResult, StoreError> {
        self.request(|respond_to| StoreRequest::Query {
            collection: collection.to_string(),
            filters,
            respond_to,
        })
        .await
    }
}
