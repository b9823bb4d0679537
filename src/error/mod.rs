//! Error handling for the gateway and realtime layers.
//!
//! - **Error Categories**: high-level classification for retry decisions
//! - **Gateway Errors**: one uniform type for every request failure
//!
//! | Kind | Status | Category |
//! |------|--------|----------|
//! | Network | 0 | Network |
//! | Timeout | 0 | Network |
//! | Http | 4xx/5xx | by status |
//! | Protocol | 4xx/5xx | Server |
//! | Decode | 2xx | Client |
//! | Encode | 0 | Client |

mod category;
mod gateway;

pub use category::ErrorCategory;
pub use gateway::{ErrorEnvelope, GatewayError, GatewayErrorKind};

/// Result alias for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;
