use crate::config::{FIXED_GAS_FEE, GAS_PER_BYTE};

/// Linear gas using the basic affine formula
/// `FIXED_GAS_FEE + GAS_PER_BYTE * bytes`, evaluated over the
/// serialized section bytes only (header bytes excluded).
#[derive(PartialEq, Eq, PartialOrd, Debug, Clone, Copy)]
pub struct LinearGas {
    pub constant: u64,
    pub per_byte: u64,
}

impl LinearGas {
    pub fn new(constant: u64, per_byte: u64) -> Self {
        LinearGas { constant, per_byte }
    }

    /// The parameters every node of the chain agrees on
    pub fn chain_default() -> Self {
        LinearGas::new(FIXED_GAS_FEE, GAS_PER_BYTE)
    }
}

pub trait GasAlgorithm {
    fn gas_for(&self, body_bytes: u64) -> u64;
}

impl GasAlgorithm for LinearGas {
    fn gas_for(&self, body_bytes: u64) -> u64 {
        self.per_byte
            .saturating_mul(body_bytes)
            .saturating_add(self.constant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;

    #[quickcheck]
    fn gas_is_monotone_in_size(a: u64, b: u64) -> bool {
        let gas = LinearGas::chain_default();
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        gas.gas_for(lo) <= gas.gas_for(hi)
    }

    #[test]
    fn gas_is_pure_in_body_size() {
        let gas = LinearGas::chain_default();
        assert_eq!(gas.gas_for(0), FIXED_GAS_FEE);
        assert_eq!(gas.gas_for(100), FIXED_GAS_FEE + 100 * GAS_PER_BYTE);
        assert_eq!(gas.gas_for(100), gas.gas_for(100));
    }

    #[test]
    fn gas_does_not_overflow() {
        let gas = LinearGas::chain_default();
        assert_eq!(gas.gas_for(u64::max_value()), u64::max_value());
    }
}
