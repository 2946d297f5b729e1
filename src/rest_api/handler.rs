//! # Resource Handler
//!
//! Turns one CRUD request into record store calls. Every request walks
//!
//! ```text
//! Received -> Validated -> Executed -> Responded
//!          \-> ErrorResponded (validation or execution failed)
//! ```
//!
//! exactly once, synchronously, with no retries.

use std::cmp::Ordering;
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info_span, warn};
use uuid::Uuid;

use crate::schema::{CollectionSchema, SchemaValidator};
use crate::store::{compare, compare_typed, field_type_of, Predicate, Record, RecordStore, StoreError};

use super::errors::{RestError, RestResult};
use super::parser::{OrderBy, QueryParams};
use super::response::{DeleteResponse, ListResponse, SingleResponse};

/// Lifecycle of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Validated,
    Executed,
    Responded,
    ErrorResponded,
}

impl RequestState {
    /// Whether the state can follow `self`
    pub fn can_advance_to(self, next: RequestState) -> bool {
        matches!(
            (self, next),
            (RequestState::Received, RequestState::Validated)
                | (RequestState::Validated, RequestState::Executed)
                | (RequestState::Executed, RequestState::Responded)
                | (RequestState::Received, RequestState::ErrorResponded)
                | (RequestState::Validated, RequestState::ErrorResponded)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, RequestState::Responded | RequestState::ErrorResponded)
    }
}

/// Operation as received, before any validation
#[derive(Debug, Clone)]
pub enum Operation {
    /// `POST /`
    Create { body: Value },
    /// `GET /`
    List { query: Vec<(String, String)> },
    /// `GET /:id`
    Read { id: String },
    /// `PUT /:id`
    Update { id: String, body: Value },
    /// `DELETE /:id`
    Destroy { id: String },
    /// `GET /:id/:association`
    Children {
        id: String,
        association: String,
        query: Vec<(String, String)>,
    },
}

impl Operation {
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Create { .. } => "create",
            Operation::List { .. } => "list",
            Operation::Read { .. } => "read",
            Operation::Update { .. } => "update",
            Operation::Destroy { .. } => "destroy",
            Operation::Children { .. } => "children",
        }
    }
}

/// Operation after validation
#[derive(Debug)]
enum Command {
    Create { fields: Value },
    List { params: QueryParams, schema: CollectionSchema },
    Read { id: u64 },
    Update { id: u64, fields: Value },
    Destroy { id: u64 },
    Children {
        id: u64,
        association: String,
        params: QueryParams,
        child_schema: CollectionSchema,
    },
}

/// An inbound request for one collection
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub request_id: Uuid,
    pub collection: String,
    pub operation: Operation,
    state: RequestState,
    history: Vec<RequestState>,
}

impl ResourceRequest {
    pub fn new(collection: impl Into<String>, operation: Operation) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            collection: collection.into(),
            operation,
            state: RequestState::Received,
            history: vec![RequestState::Received],
        }
    }

    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Every state entered so far, `Received` first.
    pub fn history(&self) -> &[RequestState] {
        &self.history
    }

    fn advance(&mut self, next: RequestState) {
        debug_assert!(self.state.can_advance_to(next));
        debug!(from = ?self.state, to = ?next, "request state");
        self.state = next;
        self.history.push(next);
    }
}

/// Response payload
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Created(SingleResponse<Record>),
    Record(SingleResponse<Record>),
    List(ListResponse<Record>),
    Deleted(DeleteResponse),
}

/// Outcome of a handled request
#[derive(Debug)]
pub struct HandledRequest {
    pub request_id: Uuid,
    pub state: RequestState,
    pub history: Vec<RequestState>,
    pub result: RestResult<Payload>,
}

/// Maps CRUD operations onto the record store
pub struct ResourceHandler {
    store: Arc<RecordStore>,
}

impl ResourceHandler {
    pub fn new(store: Arc<RecordStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<RecordStore> {
        &self.store
    }

    /// Handles one request to completion.
    pub fn handle(&self, mut request: ResourceRequest) -> HandledRequest {
        let span = info_span!(
            "resource",
            request_id = %request.request_id,
            collection = %request.collection,
            operation = request.operation.name()
        );
        let _guard = span.enter();

        let command = match self.validate(&request) {
            Ok(command) => command,
            Err(err) => return Self::fail(request, err),
        };
        request.advance(RequestState::Validated);

        let payload = match self.execute(&request.collection, command) {
            Ok(payload) => payload,
            Err(err) => return Self::fail(request, err),
        };
        request.advance(RequestState::Executed);

        request.advance(RequestState::Responded);
        HandledRequest {
            request_id: request.request_id,
            state: request.state,
            history: request.history,
            result: Ok(payload),
        }
    }

    fn fail(mut request: ResourceRequest, err: RestError) -> HandledRequest {
        if err.status_code().is_server_error() {
            warn!(error = %err, "request failed");
        } else {
            debug!(error = %err, "request rejected");
        }
        request.advance(RequestState::ErrorResponded);
        HandledRequest {
            request_id: request.request_id,
            state: request.state,
            history: request.history,
            result: Err(err),
        }
    }

    /// Checks that need no record access: ids, payloads against the
    /// schema, filters and ordering against the fields they name.
    fn validate(&self, request: &ResourceRequest) -> RestResult<Command> {
        let collection = &request.collection;
        let schema = self.store.schema(collection)?;
        let validator = SchemaValidator::new(&schema);

        let command = match &request.operation {
            Operation::Create { body } => {
                let fields = require_object(body)?;
                validator.validate_insert(&fields)?;
                Command::Create { fields }
            }
            Operation::List { query } => {
                let params = conform_query(QueryParams::parse(query)?, &schema)?;
                Command::List { params, schema }
            }
            Operation::Read { id } => Command::Read { id: parse_id(id)? },
            Operation::Update { id, body } => {
                let id = parse_id(id)?;
                let fields = require_object(body)?;
                validator.validate_update(&fields)?;
                Command::Update { id, fields }
            }
            Operation::Destroy { id } => Command::Destroy { id: parse_id(id)? },
            Operation::Children {
                id,
                association,
                query,
            } => {
                let def = self.store.association(collection, association)?;
                let id = parse_id(id)?;
                let child_schema = self.store.schema(&def.child)?;
                let params = conform_query(QueryParams::parse(query)?, &child_schema)?;
                Command::Children {
                    id,
                    association: association.clone(),
                    params,
                    child_schema,
                }
            }
        };
        Ok(command)
    }

    fn execute(&self, collection: &str, command: Command) -> RestResult<Payload> {
        match command {
            Command::Create { fields } => {
                let record = self.store.insert(collection, &fields)?;
                Ok(Payload::Created(SingleResponse::new(record)))
            }
            Command::List { params, schema } => {
                let records = self.store.find_all(collection, Some(&params.predicate))?;
                Ok(Payload::List(page(records, &params, &schema)))
            }
            Command::Read { id } => {
                let record = self
                    .store
                    .find_by_id(collection, id)?
                    .ok_or_else(|| RestError::record_not_found(collection, id))?;
                Ok(Payload::Record(SingleResponse::new(record)))
            }
            Command::Update { id, fields } => {
                let updated = self.store.update(collection, &fields, &Predicate::by_id(id))?;
                if updated == 0 {
                    return Err(RestError::record_not_found(collection, id));
                }
                let record = self
                    .store
                    .find_by_id(collection, id)?
                    .ok_or_else(|| RestError::record_not_found(collection, id))?;
                Ok(Payload::Record(SingleResponse::new(record)))
            }
            Command::Destroy { id } => {
                let deleted = self.store.destroy(collection, &Predicate::by_id(id))?;
                if deleted == 0 {
                    return Err(RestError::record_not_found(collection, id));
                }
                Ok(Payload::Deleted(DeleteResponse::new(collection, id, deleted)))
            }
            Command::Children {
                id,
                association,
                params,
                child_schema,
            } => {
                if self.store.find_by_id(collection, id)?.is_none() {
                    return Err(RestError::record_not_found(collection, id));
                }
                let children = self
                    .store
                    .children_by_name(collection, id, &association)?
                    .into_iter()
                    .filter(|r| params.predicate.matches(r))
                    .collect();
                Ok(Payload::List(page(children, &params, &child_schema)))
            }
        }
    }
}

fn parse_id(raw: &str) -> RestResult<u64> {
    match raw.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(RestError::InvalidId(raw.to_string())),
    }
}

fn require_object(body: &Value) -> RestResult<Value> {
    if body.is_object() {
        Ok(body.clone())
    } else {
        Err(RestError::InvalidBody("expected a JSON object".to_string()))
    }
}

/// Aligns filter values with field types and rejects filters or ordering
/// on fields the collection does not have.
fn conform_query(mut params: QueryParams, schema: &CollectionSchema) -> RestResult<QueryParams> {
    params
        .predicate
        .conform(schema)
        .map_err(|reason| StoreError::InvalidPredicate {
            collection: schema.name.clone(),
            reason,
        })?;

    if let Some(clause) = params
        .order
        .iter()
        .find(|clause| field_type_of(schema, &clause.field).is_none())
    {
        return Err(RestError::InvalidQueryParam(format!(
            "cannot order '{}' by unknown field '{}'",
            schema.name, clause.field
        )));
    }
    Ok(params)
}

/// Sorts, then applies offset and limit.
fn page(
    mut records: Vec<Record>,
    params: &QueryParams,
    schema: &CollectionSchema,
) -> ListResponse<Record> {
    apply_ordering(&mut records, &params.order, schema);
    let total = records.len();
    let records = records
        .into_iter()
        .skip(params.offset)
        .take(params.limit)
        .collect();
    ListResponse::new(records, total, params.limit, params.offset)
}

/// Stable sort, so ties keep insertion order. Missing values sort last.
/// Timestamps order as instants.
fn apply_ordering(records: &mut [Record], order: &[OrderBy], schema: &CollectionSchema) {
    if order.is_empty() {
        return;
    }

    records.sort_by(|a, b| {
        for clause in order {
            let cmp = match (a.get(&clause.field), b.get(&clause.field)) {
                (Some(Value::Null) | None, Some(Value::Null) | None) => Ordering::Equal,
                (Some(Value::Null) | None, _) => Ordering::Greater,
                (_, Some(Value::Null) | None) => Ordering::Less,
                (Some(x), Some(y)) => {
                    let cmp = match field_type_of(schema, &clause.field) {
                        Some(field_type) => compare_typed(field_type, &x, &y),
                        None => compare(&x, &y),
                    }
                    .unwrap_or(Ordering::Equal);
                    if clause.ascending {
                        cmp
                    } else {
                        cmp.reverse()
                    }
                }
            };
            if cmp != Ordering::Equal {
                return cmp;
            }
        }
        Ordering::Equal
    });
}
