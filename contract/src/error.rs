use chainvote_types::TxHash;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ContractError {
    #[error("execution reverted: {reason}")]
    Revert { reason: String },

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to decode contract response: {0}")]
    Decode(String),

    #[error("transaction {0} failed on chain")]
    TransactionFailed(TxHash),

    #[error("no receipt for transaction {0} after {1} attempts")]
    Timeout(TxHash, u32),
}

impl ContractError {
    /// Classification of a revert, `None` for non-revert failures.
    pub fn revert_kind(&self) -> Option<RevertKind> {
        match self {
            Self::Revert { reason } => Some(RevertKind::classify(reason)),
            _ => None,
        }
    }

    /// Message suitable for showing to an end user.
    pub fn user_message(&self) -> String {
        match self.revert_kind() {
            Some(RevertKind::Other) => match self {
                Self::Revert { reason } if !reason.is_empty() => reason.clone(),
                _ => RevertKind::Other.user_message().to_string(),
            },
            Some(kind) => kind.user_message().to_string(),
            None => self.to_string(),
        }
    }
}

/// Known contract revert reasons, matched by substring.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RevertKind {
    OnlyAdmin,
    AlreadyActive,
    NotActive,
    AlreadyVoted,
    NotRegistered,
    InvalidCandidate,
    Other,
}

impl RevertKind {
    const PATTERNS: &'static [(&'static str, RevertKind)] = &[
        ("Only admin", RevertKind::OnlyAdmin),
        ("already active", RevertKind::AlreadyActive),
        ("not active", RevertKind::NotActive),
        ("already voted", RevertKind::AlreadyVoted),
        ("not registered", RevertKind::NotRegistered),
        ("Invalid candidate", RevertKind::InvalidCandidate),
    ];

    pub fn classify(reason: &str) -> Self {
        Self::PATTERNS
            .iter()
            .find(|(needle, _)| reason.contains(needle))
            .map(|(_, kind)| *kind)
            .unwrap_or(RevertKind::Other)
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::OnlyAdmin => "Only admin can perform this action",
            Self::AlreadyActive => "Voting is already active",
            Self::NotActive => "Voting is not currently active",
            Self::AlreadyVoted => "You have already voted",
            Self::NotRegistered => "You are not registered to vote",
            Self::InvalidCandidate => "Invalid candidate selection",
            Self::Other => "Transaction reverted by the contract",
        }
    }
}
