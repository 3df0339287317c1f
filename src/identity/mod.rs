//! Caller identity and the administrative gate for account commands.
//! Keep the public surface thin and split implementation across sub-modules.

mod caller;
mod admin_gate;

pub use caller::CallerIdentity;
pub use admin_gate::AdminGate;
