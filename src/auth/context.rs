use uuid::Uuid;

use crate::auth::Claims;
use crate::types::PrincipalKind;

/// Identity of the caller, resolved once from a verified token and passed
/// explicitly into every service operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessContext {
    Requester {
        id: Uuid,
    },
    /// Reviewers are identified by email when their record is read back
    Reviewer {
        id: Uuid,
        email: String,
        role_id: Option<Uuid>,
    },
}

impl AccessContext {
    pub fn from_claims(claims: Claims, kind: PrincipalKind) -> Self {
        match kind {
            PrincipalKind::Requester => AccessContext::Requester { id: claims.id },
            PrincipalKind::Reviewer => AccessContext::Reviewer {
                id: claims.id,
                email: claims.email,
                role_id: claims.role_id,
            },
        }
    }

    pub fn kind(&self) -> PrincipalKind {
        match self {
            AccessContext::Requester { .. } => PrincipalKind::Requester,
            AccessContext::Reviewer { .. } => PrincipalKind::Reviewer,
        }
    }

    /// `Some` only for requesters; reviewers are not restricted to own records
    pub fn requester_id(&self) -> Option<Uuid> {
        match self {
            AccessContext::Requester { id } => Some(*id),
            AccessContext::Reviewer { .. } => None,
        }
    }

    pub fn is_reviewer(&self) -> bool {
        matches!(self, AccessContext::Reviewer { .. })
    }
}
