//! Project record endpoints: lookup, live subscription, status updates,
//! message/asset logs, and asset blobs.
//!
//! Mutating handlers commit, re-read, and publish the fresh snapshot while
//! holding the store lock, so subscribers observe snapshots in commit order
//! per record. The message/asset arrays deliberately expose both write
//! contracts: `PUT` replaces the whole array (the UIs' read-modify-write
//! write-back, last write wins) and `POST` appends atomically.

use axum::extract::{Multipart, Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use atelier_shared::models::{AssetEntry, MessageEntry, ProjectRecord};
use atelier_shared::protocol::{
    CreateRecord, NewMessage, NotificationPayload, StatusUpdate, UploadResponse,
};
use atelier_shared::types::{RecordId, SenderTag};
use atelier_store::Session;

use crate::api::AppState;
use crate::auth;
use crate::error::ServerError;
use crate::sse;

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    /// Equality filter on the contact address.
    pub contact: Option<String>,
}

/// Fetch a record and check that the caller may touch it. Clients only ever
/// see their own record; admins see all of them.
fn load_record_for(
    state: &AppState,
    session: &Session,
    id: RecordId,
) -> Result<ProjectRecord, ServerError> {
    let record = state.store()?.get_record(id)?;
    if !session.is_admin && record.contact_email != session.email {
        return Err(ServerError::Forbidden("Not your record".into()));
    }
    Ok(record)
}

fn admin_record_url(state: &AppState, id: RecordId) -> String {
    format!("{}/admin/records/{}", state.config.public_base_url, id)
}

// ---------------------------------------------------------------------------
// Lookup / listing
// ---------------------------------------------------------------------------

/// `GET /records[?contact=...]`
///
/// With a `contact` filter this is the record locator: every match in store
/// order (callers expecting "the" record take the first). Without a filter
/// it is the admin overview of all records.
pub async fn query_records(
    State(state): State<AppState>,
    Query(query): Query<RecordsQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<ProjectRecord>>, ServerError> {
    let session = auth::require_session(&state, &headers)?;

    let records = match query.contact {
        Some(contact) => {
            if !session.is_admin && contact != session.email {
                return Err(ServerError::Forbidden(
                    "Contact filter must match your session".into(),
                ));
            }
            state.store()?.find_records_by_contact(&contact)?
        }
        None => {
            if !session.is_admin {
                return Err(ServerError::Forbidden("Admin session required".into()));
            }
            state.store()?.list_records()?
        }
    };

    Ok(Json(records))
}

/// `GET /records/{id}`
pub async fn get_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<ProjectRecord>, ServerError> {
    let session = auth::require_session(&state, &headers)?;
    let record = load_record_for(&state, &session, RecordId(id))?;
    Ok(Json(record))
}

/// `POST /records`: admin: open a record for a new client.
pub async fn create_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateRecord>,
) -> Result<Json<ProjectRecord>, ServerError> {
    auth::require_admin(&state, &headers)?;

    let contact = req.contact_email.trim();
    if contact.is_empty() {
        return Err(ServerError::BadRequest("Contact email is empty".into()));
    }

    let record = ProjectRecord::new(contact);
    state.store()?.create_record(&record)?;
    info!(record = %record.id, contact = %record.contact_email, "Record created");

    Ok(Json(record))
}

/// `DELETE /records/{id}`: admin. Stored asset blobs are left behind.
pub async fn delete_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ServerError> {
    auth::require_admin(&state, &headers)?;

    let deleted = state.store()?.delete_record(RecordId(id))?;
    if deleted {
        info!(record = %id, "Record deleted");
    }
    Ok(Json(serde_json::json!({ "deleted": deleted })))
}

// ---------------------------------------------------------------------------
// Status fields
// ---------------------------------------------------------------------------

/// `PUT /records/{id}/status`: admin, field-level update.
pub async fn update_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<ProjectRecord>, ServerError> {
    auth::require_admin(&state, &headers)?;
    let id = RecordId(id);

    let updated = {
        let db = state.store()?;
        let updated = db.update_status(id, &update)?;
        state.watch.publish(&updated);
        updated
    };

    Ok(Json(updated))
}

// ---------------------------------------------------------------------------
// Message log
// ---------------------------------------------------------------------------

/// `PUT /records/{id}/messages`: whole-array write-back.
///
/// The caller computed this array from its own (possibly stale) snapshot;
/// whatever was committed in between is overwritten. That lost-update
/// hazard is the documented contract of this endpoint, inherited from the
/// read-modify-write pattern.
pub async fn put_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(messages): Json<Vec<MessageEntry>>,
) -> Result<Json<ProjectRecord>, ServerError> {
    let session = auth::require_session(&state, &headers)?;
    let id = RecordId(id);
    let previous = load_record_for(&state, &session, id)?;

    let updated = {
        let db = state.store()?;
        db.set_messages(id, &messages)?;
        let updated = db.get_record(id)?;
        state.watch.publish(&updated);
        updated
    };

    notify_on_new_message(&state, &previous, &updated);
    Ok(Json(updated))
}

/// `POST /records/{id}/messages`: atomic append (the corrected primitive).
pub async fn append_message(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(req): Json<NewMessage>,
) -> Result<Json<MessageEntry>, ServerError> {
    let session = auth::require_session(&state, &headers)?;
    let id = RecordId(id);

    let text = req.text.trim();
    if text.is_empty() {
        return Err(ServerError::BadRequest("Message text is empty".into()));
    }
    if !session.is_admin && req.sender != SenderTag::Client {
        return Err(ServerError::Forbidden("Clients send as \"client\"".into()));
    }

    load_record_for(&state, &session, id)?;

    let (entry, updated) = {
        let db = state.store()?;
        let entry = db.append_message(id, req.sender, text)?;
        let updated = db.get_record(id)?;
        state.watch.publish(&updated);
        (entry, updated)
    };

    if entry.sender == SenderTag::Client {
        state.notify.publish(NotificationPayload {
            title: "New client message".into(),
            body: entry.text.clone(),
            url: admin_record_url(&state, updated.id),
        });
    }

    Ok(Json(entry))
}

fn notify_on_new_message(state: &AppState, previous: &ProjectRecord, updated: &ProjectRecord) {
    if updated.messages.len() <= previous.messages.len() {
        return;
    }
    if let Some(last) = updated.messages.last() {
        if last.sender == SenderTag::Client {
            state.notify.publish(NotificationPayload {
                title: "New client message".into(),
                body: last.text.clone(),
                url: admin_record_url(state, updated.id),
            });
        }
    }
}

// ---------------------------------------------------------------------------
// Asset log
// ---------------------------------------------------------------------------

/// `PUT /records/{id}/assets`: whole-array write-back of the asset log.
/// Same contract and same hazard as [`put_messages`].
pub async fn put_assets(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    Json(assets): Json<Vec<AssetEntry>>,
) -> Result<Json<ProjectRecord>, ServerError> {
    let session = auth::require_session(&state, &headers)?;
    let id = RecordId(id);
    let previous = load_record_for(&state, &session, id)?;

    let updated = {
        let db = state.store()?;
        db.set_assets(id, &assets)?;
        let updated = db.get_record(id)?;
        state.watch.publish(&updated);
        updated
    };

    if updated.assets.len() > previous.assets.len() {
        if let Some(entry) = updated.assets.last() {
            match entry.uploader {
                // Fresh intel from the studio: email the client.
                SenderTag::Agency => {
                    let outcome = state
                        .mailer
                        .send_asset_notice(&updated.contact_email, &entry.name)
                        .await;
                    if !outcome.success {
                        warn!(
                            record = %updated.id,
                            error = ?outcome.error,
                            "Asset notification email failed"
                        );
                    }
                }
                // Client dropped off a file: ping the admin consoles.
                SenderTag::Client => {
                    state.notify.publish(NotificationPayload {
                        title: "New client upload".into(),
                        body: entry.name.clone(),
                        url: admin_record_url(&state, updated.id),
                    });
                }
            }
        }
    }

    Ok(Json(updated))
}

/// `POST /records/{id}/assets`: store a blob and mint its durable download
/// reference.
///
/// This is step one of the upload flow; appending the metadata entry to the
/// asset log is a separate `PUT`, so a failure after this point leaves an
/// orphaned blob and no metadata (the documented gap).
pub async fn upload_asset(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ServerError> {
    let session = auth::require_session(&state, &headers)?;
    let id = RecordId(id);
    load_record_for(&state, &session, id)?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServerError::BadRequest(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .filter(|n| !n.is_empty())
            .ok_or_else(|| ServerError::BadRequest("Missing file name".into()))?;

        let data = field
            .bytes()
            .await
            .map_err(|e| ServerError::BadRequest(format!("Failed to read field: {e}")))?;

        state.assets.store(id, &filename, &data).await?;

        let url = format!(
            "{}/assets/{}/{}",
            state.config.public_base_url, id, filename
        );

        info!(
            record = %id,
            file = %filename,
            size = data.len(),
            admin = session.is_admin,
            "Asset uploaded"
        );

        return Ok(Json(UploadResponse { name: filename, url }));
    }

    Err(ServerError::BadRequest(
        "Missing 'file' field in multipart form".to_string(),
    ))
}

/// `GET /assets/{record_id}/{filename}`: public download by durable
/// reference.
pub async fn download_asset(
    State(state): State<AppState>,
    Path((id, filename)): Path<(Uuid, String)>,
) -> Result<Vec<u8>, ServerError> {
    let data = state.assets.read(RecordId(id), &filename).await?;
    Ok(data)
}

// ---------------------------------------------------------------------------
// Live subscription
// ---------------------------------------------------------------------------

/// `GET /records/{id}/watch`: SSE feed of full snapshots.
///
/// The first frame is the current document; every later frame is the full
/// record after a committed change. Subscribing happens under the store
/// lock, so no commit can fall between the initial read and the feed.
pub async fn watch_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<
    axum::response::sse::Sse<
        impl futures::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>,
    >,
    ServerError,
> {
    let session = auth::require_session(&state, &headers)?;
    let id = RecordId(id);

    let (initial, rx) = {
        let db = state.store()?;
        let record = db.get_record(id)?;
        if !session.is_admin && record.contact_email != session.email {
            return Err(ServerError::Forbidden("Not your record".into()));
        }
        let rx = state.watch.subscribe(id);
        (record, rx)
    };

    info!(record = %id, "Live subscription opened");
    Ok(sse::event_stream(Some(initial), rx))
}
