//! M-Pesa STK-push payment workflow for the fuel-station back office.
//!
//! The sales form and the standalone payment page both drive a
//! [`payments::workflow::PaymentWorkflow`]: submit a request, then watch the
//! resulting [`payments::workflow::SessionHandle`] until it reaches a terminal
//! state.

pub mod config;
pub mod logging;
pub mod payments;
