pub mod accounts;
pub mod admission;
pub mod errors;
pub mod gateway;
pub mod instance;
pub mod invitation;
pub mod lifecycle;
pub mod plugin;
pub mod registry;
pub mod service;
pub mod time;
pub mod websocket;

pub use accounts::{Account, AccountDirectory, Application, Session};
pub use admission::{admit, AdmissionError, Credentials, Principal, Rejection, RoutePolicy};
pub use errors::RegistryError;
pub use gateway::{Gateway, Route, RouteTable};
pub use instance::{Instance, InstanceKind};
pub use invitation::InvitationStatus;
pub use lifecycle::{Deployment, LifecycleError, LifecycleState, Registration};
pub use plugin::{Plugin, PluginError, PluginTable};
pub use registry::RegistryStore;
pub use service::Service;
pub use websocket::Websocket;
