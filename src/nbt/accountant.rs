use super::NbtError;

/// Budget applied to tags arriving from the network.
pub const NETWORK_BUDGET: u64 = 2 * 1024 * 1024;

/// Running resource budget consulted while decoding a tag tree.
///
/// Every decoder charges a fixed per-node cost before reading its
/// payload, and arrays/lists additionally charge in proportion to the
/// length they declare before allocating. Charges are given in bits;
/// the ceiling is in bytes.
#[derive(Debug, Clone)]
pub struct SizeAccountant {
    limit: u64,
    charged: u64,
}

impl SizeAccountant {
    pub fn new(limit_bytes: u64) -> Self {
        Self {
            limit: limit_bytes,
            charged: 0,
        }
    }

    /// Accountant for network input.
    pub fn network() -> Self {
        Self::new(NETWORK_BUDGET)
    }

    /// Accountant that never aborts. Only for data that is already
    /// bounded, such as local files or bytes this process encoded.
    pub fn unlimited() -> Self {
        Self::new(u64::MAX)
    }

    pub fn charge_bits(&mut self, bits: u64) -> Result<(), NbtError> {
        self.charged = self.charged.saturating_add(bits / 8);
        if self.charged > self.limit {
            return Err(NbtError::SizeLimit {
                charged: self.charged,
                limit: self.limit,
            });
        }
        Ok(())
    }

    /// Charges `per_element` bits for each of `count` elements.
    pub fn charge_elements(&mut self, per_element: u64, count: u64) -> Result<(), NbtError> {
        self.charge_bits(per_element.saturating_mul(count))
    }

    pub fn charged_bytes(&self) -> u64 {
        self.charged
    }

    pub fn limit_bytes(&self) -> u64 {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aborts_past_ceiling() {
        let mut accountant = SizeAccountant::new(16);
        accountant.charge_bits(128).unwrap();
        assert_eq!(accountant.charged_bytes(), 16);
        assert!(matches!(
            accountant.charge_bits(8),
            Err(NbtError::SizeLimit {
                charged: 17,
                limit: 16
            })
        ));
    }

    #[test]
    fn unlimited_saturates() {
        let mut accountant = SizeAccountant::unlimited();
        accountant.charge_elements(64, u64::MAX).unwrap();
        accountant.charge_bits(u64::MAX).unwrap();
    }
}
