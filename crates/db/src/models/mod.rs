pub mod generated_design;
pub mod project;
pub mod suggestion;
