pub mod client;
pub mod error;
pub mod types;

pub use client::OlxClient;
pub use error::OlxError;
pub use types::{
    AdDetail, AdPayload, BalanceInfo, CreateAdOutcome, CreateAdResponse, CreatedAd, ImportStatus,
    PublishedAd, TokenGrant,
};
