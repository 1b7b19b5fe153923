/// Verification state of a webset item. Transitions are driven by the remote
/// service or an explicit verification mutation; this layer only ever
/// requests one, it never infers one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStatus {
    Verified,
    Pending,
    Failed,
}

impl VerificationStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            VerificationStatus::Verified => "verified",
            VerificationStatus::Pending => "pending",
            VerificationStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "verified" => Some(VerificationStatus::Verified),
            "pending" => Some(VerificationStatus::Pending),
            "failed" => Some(VerificationStatus::Failed),
            _ => None,
        }
    }
}
