pub mod error;
pub mod lifecycle;
pub mod matcher;
pub mod payload;

pub use error::{ActionReport, SyncError};
pub use lifecycle::{
    bulk_clear, check_balance, check_token, publish_ad, refresh_ad_status, remove_ad,
    validate_token_permissions, PublishRequest, SyncSettings, TokenValidation,
};
pub use matcher::{
    best_match, migrate_unresolved, price_similarity, title_similarity, RemoteCandidate,
    MATCH_THRESHOLD,
};
pub use payload::{ad_title, build_payload, AdOverrides};
