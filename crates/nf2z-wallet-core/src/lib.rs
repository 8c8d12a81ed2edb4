pub mod context;
pub mod controller;
pub mod domain;
pub mod ports;
pub mod state_machine;
pub mod store;
pub mod subscriber;

pub use context::{short_address, SessionContext};
pub use controller::ConnectionController;
pub use domain::{ChainId, ProviderEvent, ProviderEventKind, SessionStatus, WalletSession};
pub use ports::{EventHandler, ProviderError, ProviderPort, SessionError, Subscription};
pub use state_machine::{session_transition, SessionAction, StateTransition, SubscriberState};
pub use store::{SessionStore, StoreSubscription};
pub use subscriber::ChangeSubscriber;
