pub mod error;
pub mod gateway;
pub mod initiator;
pub mod notice;
pub mod observer;
pub mod poller;
pub mod providers;
pub mod sales;
pub mod session;
pub mod types;
pub mod utils;
pub mod validation;
pub mod workflow;

pub use error::{PaymentError, PaymentResult};
pub use gateway::PaymentGateway;
pub use notice::PaymentNotice;
pub use observer::PaymentObserver;
pub use session::{FailureKind, PaymentSession, SessionState};
pub use types::PaymentRequest;
pub use workflow::{PaymentWorkflow, SessionHandle};
