pub mod handlers;
pub mod server;

pub use server::start_log_server;
