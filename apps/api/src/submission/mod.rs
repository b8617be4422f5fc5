pub mod form;
pub mod handlers;
pub mod orchestrator;
pub mod payload;
pub mod validation;
