//! RPC errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`RpcError::SendFailed`] | `RPC_SEND_FAILED` | No |
//! | [`RpcError::ChannelClosed`] | `RPC_CHANNEL_CLOSED` | No |

use thiserror::Error;
use weft_types::{CorrelationId, ErrorCode};

/// Request/response correlation failure.
///
/// There is deliberately no timeout variant: the correlator never gives
/// up on a live peer. Callers that need a deadline wrap the call in
/// `tokio::time::timeout`.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    /// The outbound channel is closed.
    #[error("failed to send {0}: peer channel closed")]
    SendFailed(CorrelationId),

    /// The correlator was closed before a response arrived.
    #[error("channel closed before response to {0}")]
    ChannelClosed(CorrelationId),
}

impl ErrorCode for RpcError {
    fn code(&self) -> &'static str {
        match self {
            Self::SendFailed(_) => "RPC_SEND_FAILED",
            Self::ChannelClosed(_) => "RPC_CHANNEL_CLOSED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
