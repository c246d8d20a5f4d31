//! Weighted split of a single emission.
//!
//! Each recipient gets `floor(amount * weight / total_weight)`; whatever the
//! flooring leaves over goes to the last recipient so the shares always sum
//! to `amount` exactly.

use crate::errors::ParamsError;
use drip_types::{mul_div_u128, Recipient, TokenAmount};

pub fn split_emission(
    amount: TokenAmount,
    recipients: &[Recipient],
) -> Result<Vec<TokenAmount>, ParamsError> {
    let last = recipients.last().ok_or(ParamsError::NoRecipients)?;
    let total_weight: u128 = recipients.iter().map(|r| r.weight as u128).sum();
    if total_weight == 0 {
        return Err(ParamsError::ZeroWeight {
            account: last.account,
        });
    }

    let mut shares = Vec::with_capacity(recipients.len());
    let mut distributed: u128 = 0;
    for recipient in recipients {
        // share <= amount, so both the product and the narrowing are safe
        let share = mul_div_u128(amount as u128, recipient.weight as u128, total_weight)
            .unwrap_or(0);
        distributed += share;
        shares.push(share as TokenAmount);
    }

    let remainder = (amount as u128).saturating_sub(distributed) as TokenAmount;
    if let Some(tail) = shares.last_mut() {
        *tail += remainder;
    }
    Ok(shares)
}

#[cfg(test)]
mod tests {
    use super::*;
    use drip_types::Address;

    fn recipients(weights: &[u32]) -> Vec<Recipient> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| Recipient::new(Address([i as u8 + 1; 32]), *w))
            .collect()
    }

    #[test]
    fn test_equal_split_is_exact() {
        let shares = split_emission(1_000, &recipients(&[1, 1, 1, 1, 1])).unwrap();
        assert_eq!(shares, vec![200; 5]);
    }

    #[test]
    fn test_remainder_goes_to_last() {
        let shares = split_emission(1_000, &recipients(&[1, 1, 1])).unwrap();
        assert_eq!(shares, vec![333, 333, 334]);

        let shares = split_emission(10, &recipients(&[3, 1])).unwrap();
        assert_eq!(shares, vec![7, 3]);
    }

    #[test]
    fn test_tiny_amount_goes_to_last() {
        let shares = split_emission(1, &recipients(&[1, 1, 1, 1])).unwrap();
        assert_eq!(shares, vec![0, 0, 0, 1]);
    }

    #[test]
    fn test_large_values_do_not_overflow() {
        let shares = split_emission(u64::MAX, &recipients(&[u32::MAX, u32::MAX, 1])).unwrap();
        assert_eq!(shares.iter().map(|s| *s as u128).sum::<u128>(), u64::MAX as u128);
    }

    #[test]
    fn test_rejects_empty_and_weightless() {
        assert_eq!(split_emission(10, &[]), Err(ParamsError::NoRecipients));
        assert!(matches!(
            split_emission(10, &recipients(&[0, 0])),
            Err(ParamsError::ZeroWeight { .. })
        ));
    }
}
