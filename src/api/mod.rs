pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;
pub mod types;
pub mod websocket;

pub use routes::routes;
pub use server::serve;
pub use state::AppState;
