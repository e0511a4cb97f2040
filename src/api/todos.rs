use actix_web::{delete, get, post, put, web, HttpResponse};

use crate::api::error::{json_error_handler, path_error_handler, ApiError};
use crate::models::{Deleted, NewTodo, OrdinalBatch, TodoId, TodoPatch};
use crate::repository::{StoreError, TodoRepository};

/// Runs a blocking repository call on actix's blocking pool.
async fn run<T, F>(db: web::Data<dyn TodoRepository>, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&dyn TodoRepository) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let repository = db.into_inner();
    Ok(web::block(move || op(repository.as_ref())).await??)
}

#[post("/todos")]
pub async fn create_todo(
    db: web::Data<dyn TodoRepository>,
    new_todo: web::Json<NewTodo>,
) -> Result<HttpResponse, ApiError> {
    let new_todo = new_todo.into_inner();
    new_todo.validate().map_err(ApiError::Validation)?;
    let todo = run(db, move |repo| repo.create(new_todo)).await?;
    Ok(HttpResponse::Ok().json(todo))
}

#[get("/todos/{id}")]
pub async fn get_todo_by_id(
    db: web::Data<dyn TodoRepository>,
    id: web::Path<TodoId>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let todo = run(db, move |repo| repo.get_by_id(id)).await?;
    Ok(HttpResponse::Ok().json(todo))
}

#[get("/todos")]
pub async fn get_todos(db: web::Data<dyn TodoRepository>) -> Result<HttpResponse, ApiError> {
    let todos = run(db, |repo| repo.list()).await?;
    Ok(HttpResponse::Ok().json(todos))
}

#[delete("/todos/{id}")]
pub async fn delete_todo_by_id(
    db: web::Data<dyn TodoRepository>,
    id: web::Path<TodoId>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let id = run(db, move |repo| repo.delete(id)).await?;
    Ok(HttpResponse::Ok().json(Deleted { id }))
}

#[put("/todos/{id}")]
pub async fn update_todo_by_id(
    db: web::Data<dyn TodoRepository>,
    id: web::Path<TodoId>,
    patch: web::Json<TodoPatch>,
) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let patch = patch.into_inner();
    patch.validate().map_err(ApiError::Validation)?;
    let todo = run(db, move |repo| repo.update(id, patch)).await?;
    Ok(HttpResponse::Ok().json(todo))
}

#[put("/todos/ordinal")]
pub async fn update_todos_ordinal(
    db: web::Data<dyn TodoRepository>,
    batch: web::Json<OrdinalBatch>,
) -> Result<HttpResponse, ApiError> {
    let batch = batch.into_inner();
    let todos = run(db, move |repo| repo.batch_update_ordinals(&batch.todos)).await?;
    Ok(HttpResponse::Ok().json(todos))
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .app_data(web::PathConfig::default().error_handler(path_error_handler))
        // must precede `/todos/{id}`
        .service(update_todos_ordinal)
        .service(create_todo)
        .service(get_todo_by_id)
        .service(get_todos)
        .service(delete_todo_by_id)
        .service(update_todo_by_id);
}
