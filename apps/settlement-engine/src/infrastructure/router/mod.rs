//! Liquidity router and price oracle adapters.

pub mod http_client;
pub mod mock;
pub mod retry;

pub use http_client::{HttpLiquidityRouter, HttpRouterConfig};
pub use mock::MockLiquidityRouter;
pub use retry::RetryPolicy;
