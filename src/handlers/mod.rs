pub mod content_handlers;
pub mod health_handlers;
