pub mod handle;
pub mod server;

pub use handle::GateServerHandle;
pub use server::start_gate_server;
