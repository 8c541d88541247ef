pub mod errors;
pub mod models;
pub mod relay;
pub mod session;
pub mod upstream;
