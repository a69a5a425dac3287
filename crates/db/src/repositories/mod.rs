mod generated_design_repo;
mod project_repo;
mod suggestion_repo;

pub use generated_design_repo::GeneratedDesignRepo;
pub use project_repo::ProjectRepo;
pub use suggestion_repo::{BatchInsert, SuggestionRepo};
