pub mod config;
pub mod controller;
pub mod error;
pub mod handlers;
pub mod response;
pub mod server;
pub mod session;

pub use error::{AppError, ErrorKind};
pub use server::{Integration, Server};
