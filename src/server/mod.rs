//! # Módulo del Servidor HTTP
//! src/server/mod.rs
//!
//! El servidor:
//! 1. Escucha en un puerto
//! 2. Acepta conexiones entrantes y las pasa a un worker idle
//! 3. Si no hay workers idle crea uno adicional
//! 4. Cada worker lee la request line, enruta y responde

pub mod context;
pub mod pool;
pub mod tcp;
pub mod worker;

pub use context::ServerContext;
pub use pool::WorkerPool;
pub use tcp::Server;
