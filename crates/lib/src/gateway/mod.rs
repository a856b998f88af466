//! Gateway: HTTP server for the WhatsApp webhook and the generate endpoint.
//!
//! Single port. `GET /webhook` answers the verification handshake, `POST /webhook` runs the
//! envelope → completion → reply pipeline, `POST /generate` exposes the completion client.

mod handler;
mod protocol;
mod server;
mod verify;

pub use handler::{handle_envelope, HandleOutcome};
pub use protocol::{ErrorResponse, GenerateRequest, GenerateResponse, VerifyQuery};
pub use server::{router, run_gateway, serve, GatewayState, WEBHOOK_ACK};
pub use verify::{verify_subscription, Verification, SUBSCRIBE_MODE, VERIFICATION_FAILED};
