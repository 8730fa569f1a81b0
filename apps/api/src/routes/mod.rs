pub mod health;
pub mod upload;

use axum::{
    routing::{delete, get, patch, post, put},
    Router,
};

use crate::assistant::handlers as assistant;
use crate::bloggers::handlers as bloggers;
use crate::fashion::handlers as fashion;
use crate::planning::handlers as planning;
use crate::state::AppState;
use crate::tasks::handlers as tasks;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Bloggers
        .route(
            "/api/bloggers",
            get(bloggers::handle_list_bloggers).post(bloggers::handle_create_blogger),
        )
        .route(
            "/api/bloggers/:id",
            get(bloggers::handle_get_blogger)
                .put(bloggers::handle_update_blogger)
                .delete(bloggers::handle_delete_blogger),
        )
        .route("/api/bloggers/:id/pattern", get(planning::handle_weekly_pattern))
        .route("/api/bloggers/:id/locations", post(bloggers::handle_add_location))
        .route(
            "/api/bloggers/:id/locations/generate",
            post(bloggers::handle_generate_location),
        )
        .route(
            "/api/bloggers/:id/locations/:index",
            delete(bloggers::handle_remove_location),
        )
        .route("/api/bloggers/:id/outfits", post(bloggers::handle_add_outfit))
        .route(
            "/api/bloggers/:id/outfits/generate",
            post(bloggers::handle_generate_outfit),
        )
        .route(
            "/api/bloggers/:id/outfits/:index",
            delete(bloggers::handle_remove_outfit),
        )
        // Tasks
        .route(
            "/api/tasks",
            get(tasks::handle_list_tasks).post(tasks::handle_create_task),
        )
        .route(
            "/api/tasks/:id",
            get(tasks::handle_get_task).delete(tasks::handle_delete_task),
        )
        .route("/api/tasks/:id/status", put(tasks::handle_update_status))
        .route("/api/tasks/:id/content", put(tasks::handle_update_content))
        .route("/api/tasks/:id/script", post(tasks::handle_generate_script))
        .route("/api/tasks/:id/generate", post(tasks::handle_generate_asset))
        .route("/api/tasks/:id/versions", get(tasks::handle_task_versions))
        // Fashion frames
        .route(
            "/api/tasks/:id/fashion/setup",
            patch(fashion::handle_fashion_setup),
        )
        .route(
            "/api/tasks/:id/fashion/generate-main-frame",
            post(fashion::handle_generate_main_frame),
        )
        .route(
            "/api/tasks/:id/fashion/approve-frame",
            post(fashion::handle_approve_frame),
        )
        .route(
            "/api/tasks/:id/fashion/generate-additional-frames",
            post(fashion::handle_generate_angle_frames),
        )
        // Planning
        .route("/api/plans/monthly", post(planning::handle_plan_month))
        // Assistant
        .route(
            "/api/assistant/meta/generate",
            post(assistant::handle_generate_meta),
        )
        .route(
            "/api/assistant/meta/:task_id",
            get(assistant::handle_latest_meta),
        )
        // Uploads
        .route("/api/upload/image", post(upload::handle_upload_image))
        .with_state(state)
}
