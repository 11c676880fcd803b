use actix_web::{error, web, HttpResponse};

use crate::error::ApiError;

use super::tasks::tasks_handlers;

pub fn tasks_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tasks")
            .route("", web::get().to(tasks_handlers::get_task_list))
            .route("", web::post().to(tasks_handlers::create_task))
            .route("/{task_id}", web::put().to(tasks_handlers::update_task))
            .route("/{task_id}", web::patch().to(tasks_handlers::update_task))
            .route("/{task_id}", web::delete().to(tasks_handlers::delete_task))
    );
}

use super::tags::tags_handlers;

pub fn tags_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/tags")
            .route("", web::get().to(tags_handlers::get_tag_list))
            .route("", web::post().to(tags_handlers::create_tag))
            .route("/{tag_id}", web::put().to(tags_handlers::update_tag))
            .route("/{tag_id}", web::delete().to(tags_handlers::delete_tag))
    );
}

use super::workspaces::workspaces_handlers;

pub fn workspaces_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/workspaces")
            .route("", web::get().to(workspaces_handlers::get_workspace_list))
            .route("", web::post().to(workspaces_handlers::create_workspace))
            .route("/{workspace_id}", web::get().to(workspaces_handlers::get_workspace))
            .route("/{workspace_id}", web::put().to(workspaces_handlers::rename_workspace))
            .route("/{workspace_id}", web::delete().to(workspaces_handlers::delete_workspace))
            .route("/{workspace_id}/members", web::get().to(workspaces_handlers::get_member_list))
            .route("/{workspace_id}/members", web::post().to(workspaces_handlers::add_member))
    );
}

use super::uploads::uploads_handlers;

pub fn uploads_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/upload")
            .route("", web::post().to(uploads_handlers::upload_file))
            .route("", web::delete().to(uploads_handlers::delete_file))
    );
    cfg.service(
        web::scope("/attachments")
            .route("/{attachment_id}", web::delete().to(uploads_handlers::delete_attachment))
    );
}

pub fn files_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/uploads")
            .route("/{file_name}", web::get().to(uploads_handlers::serve_file))
    );
}

use super::webhooks::webhooks_handlers;

pub fn webhooks_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/webhooks")
            .route("/provider", web::post().to(webhooks_handlers::receive_event))
    );
}

// Default handler for the service root
pub async fn root_get() -> HttpResponse {
    HttpResponse::Ok().body("Hello, this is the TaskHub API.")
}

/// Mounts every resource under `/api`, with extractor failures rendered
/// through the same `{"error": ...}` body as handler errors.
pub fn api_configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .app_data(web::JsonConfig::default().error_handler(|err, _| {
                error::Error::from(ApiError::Validation(format!("Invalid JSON body: {}", err)))
            }))
            .app_data(web::QueryConfig::default().error_handler(|err, _| {
                error::Error::from(ApiError::Validation(format!("Invalid query: {}", err)))
            }))
            .configure(tasks_configure)
            .configure(tags_configure)
            .configure(workspaces_configure)
            .configure(uploads_configure)
            .configure(webhooks_configure)
    );
}
