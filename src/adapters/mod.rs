pub mod api_error;
pub mod chat_handler;
pub mod health_handler;
pub mod metrics_handler;
