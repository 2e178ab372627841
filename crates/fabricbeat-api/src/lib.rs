// fabricbeat-api: Async Rust client for the Cisco APIC REST API

pub mod error;
pub mod mo;
pub mod session;
pub mod transport;

mod fetch;

pub use error::Error;
pub use mo::ManagedObject;
pub use session::ApicSession;
