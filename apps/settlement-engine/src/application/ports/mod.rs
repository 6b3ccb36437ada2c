//! Application Ports (Driven)
//!
//! Interfaces the engine uses to reach the outside world: the liquidity
//! router, the price oracle, signature recovery, time, event publishing and
//! the commitment book.

mod clock_port;
mod commitment_store_port;
mod event_publisher_port;
mod liquidity_router_port;
mod price_oracle_port;
mod signature_verifier_port;

pub use clock_port::Clock;
pub use commitment_store_port::{CommitmentStoreError, CommitmentStorePort};
pub use event_publisher_port::{
    EventPublishError, EventPublisherPort, LoggingEventPublisher, NoOpEventPublisher,
};
pub use liquidity_router_port::{LiquidityRouterPort, RouterError, SwapExecution};
pub use price_oracle_port::{OracleError, PriceOraclePort};
pub use signature_verifier_port::{SignatureError, SignatureVerifier};
