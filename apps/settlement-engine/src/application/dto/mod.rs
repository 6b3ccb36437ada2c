//! Data Transfer Objects (DTOs)
//!
//! DTOs are used for API boundaries and use case inputs/outputs.

mod lifecycle_dto;

pub use lifecycle_dto::{
    ExerciseRequest, LiquidationParams, OptionDto, PremiumQuoteDto, SettlementReceipt,
    TakePublishedRequest, TakeReceipt, TakeRequest,
};
