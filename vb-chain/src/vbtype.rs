use std::fmt;

/// Tag enumeration of all known virtual blockchain types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VbType {
    Protocol = 0,
    Account = 1,
    ValidatorNode = 2,
    Organization = 3,
    Application = 4,
    ApplicationLedger = 5,
}

impl VbType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(VbType::Protocol),
            1 => Some(VbType::Account),
            2 => Some(VbType::ValidatorNode),
            3 => Some(VbType::Organization),
            4 => Some(VbType::Application),
            5 => Some(VbType::ApplicationLedger),
            _ => None,
        }
    }
}

impl fmt::Display for VbType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            VbType::Protocol => write!(f, "protocol"),
            VbType::Account => write!(f, "account"),
            VbType::ValidatorNode => write!(f, "validator node"),
            VbType::Organization => write!(f, "organization"),
            VbType::Application => write!(f, "application"),
            VbType::ApplicationLedger => write!(f, "application ledger"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_roundtrip() {
        for tag in 0u8..6 {
            assert_eq!(VbType::from_u8(tag).map(|t| t as u8), Some(tag));
        }
        assert_eq!(VbType::from_u8(6), None);
    }
}
