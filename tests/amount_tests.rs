/// Wei amount tests.
///
/// The store keeps every amount as a fixed-width base-10 string so that
/// lexicographic order matches numeric order; these tests pin that encoding
/// and the integer-only USD formatting.

#[cfg(test)]
mod padding_tests {
    use fid_marketplace_backend::amount::{Wei, PAD_WIDTH};

    #[test]
    fn padded_is_fixed_width() {
        assert_eq!(Wei::from_u64(0).padded().len(), PAD_WIDTH);
        assert_eq!(Wei::from_u64(1).padded().len(), PAD_WIDTH);
        assert_eq!(Wei::from_eth(100_000).padded().len(), PAD_WIDTH);
    }

    #[test]
    fn padded_zero_is_all_zeros() {
        assert_eq!(Wei::ZERO.padded(), "0".repeat(PAD_WIDTH));
    }

    #[test]
    fn padded_preserves_digits() {
        let wei = Wei::from_u64(123_456_789);
        assert!(wei.padded().ends_with("123456789"));
    }

    #[test]
    fn lexicographic_order_matches_numeric_order() {
        let amounts = [
            Wei::from_u64(9),
            Wei::from_u64(10),
            Wei::from_u64(5_000),
            Wei::from_eth(1),
            Wei::from_eth(20),
        ];
        for pair in amounts.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].padded() < pair[1].padded());
        }
    }

    #[test]
    fn display_trims_padding() {
        let wei: Wei = "00000000000000000000000000001500".parse().unwrap();
        assert_eq!(wei.to_string(), "1500");
    }
}

#[cfg(test)]
mod parsing_tests {
    use fid_marketplace_backend::amount::Wei;

    #[test]
    fn parses_padded_and_unpadded() {
        let padded: Wei = "00000000000000000000000000000042".parse().unwrap();
        let plain: Wei = "42".parse().unwrap();
        assert_eq!(padded, plain);
    }

    #[test]
    fn all_zeros_parses_to_zero() {
        let wei: Wei = "00000000000000000000000000000000".parse().unwrap();
        assert!(wei.is_zero());
    }

    #[test]
    fn round_trips_through_padded_form() {
        let original = Wei::from_eth(3);
        let parsed: Wei = original.padded().parse().unwrap();
        assert_eq!(parsed, original);
    }

    #[test]
    fn rejects_garbage() {
        assert!("not-a-number".parse::<Wei>().is_err());
        assert!("0x1234".parse::<Wei>().is_err());
    }

    #[test]
    fn serde_uses_trimmed_string() {
        let wei = Wei::from_u64(777);
        let json = serde_json::to_string(&wei).unwrap();
        assert_eq!(json, "\"777\"");
        let back: Wei = serde_json::from_str(&json).unwrap();
        assert_eq!(back, wei);
    }
}

#[cfg(test)]
mod arithmetic_tests {
    use fid_marketplace_backend::amount::Wei;

    #[test]
    fn from_eth_is_ten_to_the_eighteenth() {
        assert_eq!(Wei::from_eth(1).to_string(), "1000000000000000000");
    }

    #[test]
    fn checked_add_accumulates() {
        let total = Wei::from_eth(1).checked_add(Wei::from_eth(2)).unwrap();
        assert_eq!(total, Wei::from_eth(3));
    }

    #[test]
    fn saturating_add_matches_checked_add_in_range() {
        let a = Wei::from_eth(5);
        let b = Wei::from_u64(123);
        assert_eq!(a.saturating_add(b), a.checked_add(b).unwrap());
    }

    #[test]
    fn usd_formatting_keeps_two_decimals() {
        // 1.5 ETH at $2000/ETH = $3000.00
        let usd = Wei::from_u64(1_500_000_000_000_000_000).mul_rate(2000);
        assert_eq!(usd.format_usd(), "$3000.00");
    }

    #[test]
    fn usd_formatting_of_fractional_cents() {
        // 0.001 ETH at $2345/ETH = $2.345, truncated to cents
        let usd = Wei::from_u64(1_000_000_000_000_000).mul_rate(2345);
        assert_eq!(usd.format_usd(), "$2.34");
    }

    #[test]
    fn zero_rate_formats_to_zero_dollars() {
        assert_eq!(Wei::from_eth(10).mul_rate(0).format_usd(), "$0.00");
    }
}
