//! Material services - Upload dei file, metadati e download

use super::course::load_owned_course;
use crate::core::{AppError, AppJson, AppPath, AppQuery, AppState};
use crate::dtos::{
    CreateMaterialDTO, MaterialDTO, MaterialQuery, MaterialUrlDTO, UpdateMaterialDTO,
};
use crate::entities::{Material, User};
use crate::repositories::{Create, Delete, Update};
use crate::storage::{FileStorage, sanitize_file_name};
use axum::{
    Extension,
    body::{Body, Bytes},
    extract::{Json, Multipart, State, multipart::MultipartRejection},
    http::{StatusCode, header},
    response::IntoResponse,
};
use object_store::path::Path as StoragePath;
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};
use validator::Validate;

const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "text/plain",
    "text/markdown",
    "application/json",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "application/vnd.ms-powerpoint",
    "application/vnd.openxmlformats-officedocument.presentationml.presentation",
    "image/png",
    "image/jpeg",
    "image/webp",
];

fn content_type_from_extension(file_name: &str) -> Option<&'static str> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let content_type = match ext.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "json" => "application/json",
        "doc" => "application/msword",
        "docx" => "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
        "ppt" => "application/vnd.ms-powerpoint",
        "pptx" => "application/vnd.openxmlformats-officedocument.presentationml.presentation",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        _ => return None,
    };
    Some(content_type)
}

/// Content type da salvare per un upload, `None` se non è accettato.
/// I browser spesso inviano `application/octet-stream` (o niente) per markdown
/// e file office, in quel caso decide l'estensione.
pub fn resolve_content_type(declared: Option<&str>, file_name: &str) -> Option<&'static str> {
    let declared = declared
        .and_then(|ct| ct.split(';').next())
        .map(|ct| ct.trim().to_ascii_lowercase())
        .filter(|ct| !ct.is_empty() && ct != "application/octet-stream");

    match declared.as_deref() {
        Some("text/x-markdown") => Some("text/markdown"),
        Some("image/jpg") => Some("image/jpeg"),
        Some(ct) => ALLOWED_CONTENT_TYPES.iter().copied().find(|allowed| *allowed == ct),
        None => content_type_from_extension(file_name),
    }
}

/// Campi raccolti dal body multipart
#[derive(Default)]
struct UploadForm {
    course_id: Option<i64>,
    title: Option<String>,
    description: Option<String>,
    file: Option<(String, Option<String>, Bytes)>,
}

async fn read_upload_form(mut multipart: Multipart, max_bytes: usize) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "course_id" => {
                let text = field.text().await?;
                let id = text.trim().parse::<i64>().map_err(|_| {
                    AppError::bad_request("course_id must be an integer")
                })?;
                form.course_id = Some(id);
            }
            "title" => form.title = Some(field.text().await?.trim().to_string()).filter(|t| !t.is_empty()),
            "description" => {
                form.description = Some(field.text().await?).filter(|d| !d.trim().is_empty())
            }
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                if bytes.len() > max_bytes {
                    warn!("Upload of {} bytes over the limit", bytes.len());
                    return Err(AppError::payload_too_large("Upload exceeds the size limit"));
                }
                form.file = Some((file_name, content_type, bytes));
            }
            other => debug!("Ignoring multipart field {}", other),
        }
    }
    Ok(form)
}

pub(crate) async fn load_owned_material(
    state: &AppState,
    material_id: i64,
    user_id: i64,
) -> Result<Material, AppError> {
    state
        .materials
        .find_owned(material_id, user_id)
        .await?
        .ok_or_else(|| {
            warn!("Material {} not found for user {}", material_id, user_id);
            AppError::not_found("Material not found")
        })
}

#[instrument(skip(state, current_user, query), fields(user_id = %current_user.id))]
pub async fn list_materials(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppQuery(query): AppQuery<MaterialQuery>,
) -> Result<Json<Vec<MaterialDTO>>, AppError> {
    debug!("Listing materials");
    let materials = state
        .materials
        .find_many_by_user(current_user.id, query.course_id)
        .await?;

    info!("Retrieved {} materials", materials.len());
    Ok(Json(materials.into_iter().map(MaterialDTO::from).collect()))
}

#[instrument(skip(state, current_user, multipart), fields(user_id = %current_user.id))]
pub async fn upload_material(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Uploading material");
    // 1. Leggere il form, il file viene bufferizzato fino al limite di upload
    // 2. Il corso deve appartenere all'utente corrente
    // 3. Rifiutare file vuoti e content type fuori dalla lista consentita
    // 4. Scrivere il file, poi il record. Se il record fallisce il file viene rimosso.
    let form = read_upload_form(multipart?, state.config.max_upload_bytes).await?;

    let course_id = form
        .course_id
        .ok_or_else(|| AppError::bad_request("course_id is required"))?;
    let (file_name, declared_type, bytes) = form
        .file
        .ok_or_else(|| AppError::bad_request("file is required"))?;

    let course = load_owned_course(&state, course_id, current_user.id).await?;

    if bytes.is_empty() {
        return Err(AppError::bad_request("Uploaded file is empty"));
    }
    let content_type = resolve_content_type(declared_type.as_deref(), &file_name)
        .ok_or_else(|| {
            warn!("Rejected content type {:?} for {}", declared_type, file_name);
            AppError::unsupported_media_type("File type not allowed")
                .with_details(declared_type.clone().unwrap_or_else(|| file_name.clone()))
        })?;

    let key = FileStorage::material_key(current_user.id, course.id, &file_name);
    let size_bytes = bytes.len() as i64;
    state.storage.put(&key, bytes).await?;

    let title = form.title.unwrap_or_else(|| file_name.clone());
    let created = state
        .materials
        .create(&CreateMaterialDTO {
            user_id: current_user.id,
            course_id: course.id,
            title,
            description: form.description,
            file_name,
            content_type: content_type.to_string(),
            size_bytes,
            storage_key: key.to_string(),
        })
        .await;

    let material = match created {
        Ok(material) => material,
        Err(e) => {
            error!("Failed to record material, removing blob: {:?}", e);
            if let Err(cleanup) = state.storage.delete(&key).await {
                warn!("Failed to remove orphan blob {}: {}", key, cleanup);
            }
            return Err(e.into());
        }
    };

    info!("Material {} uploaded ({} bytes)", material.id, size_bytes);
    Ok((StatusCode::CREATED, Json(MaterialDTO::from(material))))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn get_material(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppPath(material_id): AppPath<i64>,
) -> Result<Json<MaterialDTO>, AppError> {
    debug!("Fetching material");
    let material = load_owned_material(&state, material_id, current_user.id).await?;
    Ok(Json(MaterialDTO::from(material)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn get_material_url(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppPath(material_id): AppPath<i64>,
) -> Result<Json<MaterialUrlDTO>, AppError> {
    debug!("Building material URL");
    let material = load_owned_material(&state, material_id, current_user.id).await?;
    let key = StoragePath::from(material.storage_key.as_str());

    let url = match state.storage.signed_url(&key).await? {
        Some(url) => url,
        None => format!("/api/materials/{}/download", material.id),
    };

    Ok(Json(MaterialUrlDTO {
        url,
        expires_in_secs: state.storage.signed_url_ttl().as_secs(),
    }))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn download_material(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppPath(material_id): AppPath<i64>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Streaming material");
    let material = load_owned_material(&state, material_id, current_user.id).await?;
    let key = StoragePath::from(material.storage_key.as_str());
    let blob = state.storage.get(&key).await?;

    let headers = [
        (header::CONTENT_TYPE, material.content_type.clone()),
        (header::CONTENT_LENGTH, blob.meta.size.to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!(
                "attachment; filename=\"{}\"",
                sanitize_file_name(&material.file_name)
            ),
        ),
    ];

    info!("Streaming {} bytes", blob.meta.size);
    Ok((headers, Body::from_stream(blob.into_stream())))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn update_material(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppPath(material_id): AppPath<i64>,
    AppJson(body): AppJson<UpdateMaterialDTO>,
) -> Result<Json<MaterialDTO>, AppError> {
    debug!("Updating material");
    body.validate()?;
    let material = load_owned_material(&state, material_id, current_user.id).await?;

    let updated = state.materials.update(&material.id, &body).await?;

    info!("Material updated");
    Ok(Json(MaterialDTO::from(updated)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn delete_material(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppPath(material_id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    debug!("Deleting material");
    let material = load_owned_material(&state, material_id, current_user.id).await?;

    let key = StoragePath::from(material.storage_key.as_str());
    if let Err(e) = state.storage.delete(&key).await {
        warn!("Failed to delete blob {}: {}", key, e);
    }
    state.materials.delete(&material.id).await?;

    info!("Material {} deleted", material.id);
    Ok(StatusCode::NO_CONTENT)
}
