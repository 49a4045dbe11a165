pub mod cancel;
pub mod dispatch;
pub mod probe;
pub mod registry;
pub mod routes;
pub mod state;
pub mod upload;
