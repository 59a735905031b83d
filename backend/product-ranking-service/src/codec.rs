//! Member codec for the live ranking set
//!
//! Product ids are stored in the ordered set as the decimal 9's complement of
//! the (zero-padded) id: every digit `d` becomes `9 - d`. Ascending
//! lexicographic order of encoded members is then descending numeric order of
//! the ids, so equal-score entries come back in a stable id order from a
//! single reverse-range call.
//!
//! Format (default width 19): `42` -> `0000000000000000042` -> `9999999999999999957`

use crate::error::{RankingError, Result};
use crate::models::ProductId;

/// Digits needed to render `i64::MAX`; the event writers pad to this width.
pub const DEFAULT_MEMBER_WIDTH: usize = 19;

/// Encodes product ids into ordered-set members and back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemberCodec {
    width: usize,
}

impl Default for MemberCodec {
    fn default() -> Self {
        Self {
            width: DEFAULT_MEMBER_WIDTH,
        }
    }
}

impl MemberCodec {
    /// `width` is the zero-padded digit count; `0` selects the legacy unpadded form.
    pub fn new(width: usize) -> Self {
        Self { width }
    }

    /// Codec that does not pad. Tie-break order is only correct between ids
    /// with the same digit count.
    pub fn unpadded() -> Self {
        Self { width: 0 }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn encode(&self, product_id: ProductId) -> Result<String> {
        if product_id < 0 {
            return Err(RankingError::InvalidArgument(format!(
                "product id must be non-negative, got {}",
                product_id
            )));
        }

        let digits = format!("{:0width$}", product_id, width = self.width);
        Ok(complement(&digits))
    }

    /// Decode a stored member. Accepts padded and unpadded members alike.
    pub fn decode(&self, member: &str) -> Result<ProductId> {
        if member.is_empty() {
            return Err(RankingError::malformed_member(member, "empty member"));
        }
        if let Some(bad) = member.chars().find(|c| !c.is_ascii_digit()) {
            return Err(RankingError::malformed_member(
                member,
                format!("non-digit character '{}'", bad),
            ));
        }

        complement(member)
            .parse::<ProductId>()
            .map_err(|e| RankingError::malformed_member(member, e.to_string()))
    }
}

/// Replace every ASCII digit `d` with `9 - d`. Callers guarantee the input is all digits.
fn complement(digits: &str) -> String {
    digits
        .bytes()
        .map(|b| char::from(b'9' - (b - b'0')))
        .collect()
}
