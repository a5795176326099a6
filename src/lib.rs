pub mod answer_client;
pub mod citations;
pub mod config;
pub mod history;
pub mod location;
pub mod models;
pub mod render;
pub mod server;
pub mod session;
pub mod storage;
pub mod suggestions;

pub use config::AppConfig;
pub use server::run_server;
pub use session::QuerySession;
