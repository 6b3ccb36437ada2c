//! Infrastructure Layer
//!
//! Adapters for the ports defined in the application layer:
//!
//! - **Driven Adapters (Outbound)**
//!   - `persistence/`: option and commitment stores
//!   - `router/`: liquidity router and price oracle (HTTP client, mock)
//!   - `signing/`: Ed25519 signature verification
//!   - `clock`: system and manual clocks
//!
//! - **Driver Adapters (Inbound)**
//!   - `http/`: REST API controllers

pub mod clock;
pub mod http;
pub mod persistence;
pub mod router;
pub mod signing;
