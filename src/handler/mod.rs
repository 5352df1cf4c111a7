//! Request handler module
//!
//! Responsible for request dispatch and the application endpoints:
//! demo pages, cookie/session demos, the notes API and static files.

mod cookies;
pub mod dispatch;
mod notes;
mod pages;
pub mod static_files;

use crate::routing::Router;

// Re-export main entry point
pub use dispatch::handle_request;

/// Everything the route table can point at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    Home,
    Health,
    Echo,
    Cookies,
    Visits,
    Login,
    Logout,
    Me,
    ListNotes,
    CreateNote,
    GetNote,
    UpdateNote,
    DeleteNote,
}

/// The application's route table
pub fn build_router() -> Router<Endpoint> {
    Router::new()
        .get("/", Endpoint::Home)
        .get("/healthz", Endpoint::Health)
        .post("/echo", Endpoint::Echo)
        .get("/cookies", Endpoint::Cookies)
        .get("/visits", Endpoint::Visits)
        .post("/login", Endpoint::Login)
        .post("/logout", Endpoint::Logout)
        .get("/me", Endpoint::Me)
        .get("/api/notes", Endpoint::ListNotes)
        .post("/api/notes", Endpoint::CreateNote)
        .get("/api/notes/:id", Endpoint::GetNote)
        .put("/api/notes/:id", Endpoint::UpdateNote)
        .delete("/api/notes/:id", Endpoint::DeleteNote)
}
