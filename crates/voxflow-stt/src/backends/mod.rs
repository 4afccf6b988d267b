//! Concrete backend implementations

pub mod local;
pub mod mock;
pub mod remote;

pub use local::{LocalCliBackend, LocalCliConfig, LocalCliFactory};
pub use mock::{MockBackend, MockBackendConfig, MockBackendFactory};
pub use remote::{RemoteApiBackend, RemoteApiConfig, RemoteApiFactory};
