/// Receipt log decoding tests.
///
/// Logs are built synthetically with the same ABI encoding the contracts
/// emit, so these tests cover the real decode path without an RPC endpoint.

#[cfg(test)]
mod fid_decoding_tests {
    use alloy::primitives::{Address, Bytes, LogData, B256, U256};
    use alloy::rpc::types::Log;
    use alloy::sol_types::SolEvent;

    use fid_marketplace_backend::amount::Wei;
    use fid_marketplace_backend::chain::events::{
        decode_fid_logs, find_referrer, FidMarketplace, MarketEvent, TargetId,
    };
    use fid_marketplace_backend::types::EventType;

    fn log_at(address: Address, data: LogData) -> Log {
        Log {
            inner: alloy::primitives::Log { address, data },
            ..Default::default()
        }
    }

    fn seller() -> Address {
        Address::repeat_byte(0x11)
    }

    fn buyer() -> Address {
        Address::repeat_byte(0x22)
    }

    #[test]
    fn decodes_listed_event() {
        let log = log_at(
            Address::repeat_byte(0x99),
            FidMarketplace::Listed {
                fid: U256::from(42),
                owner: seller(),
                amount: U256::from(1_000_000u64),
                deadline: U256::from(1_999_999_999u64),
            }
            .encode_log_data(),
        );

        let events = decode_fid_logs(&[log]);
        assert_eq!(events.len(), 1);
        match &events[0] {
            MarketEvent::Listed {
                target,
                owner,
                amount,
                deadline,
            } => {
                assert_eq!(*target, TargetId::Fid(42));
                assert_eq!(*owner, seller());
                assert_eq!(*amount, Wei::from_u64(1_000_000));
                assert_eq!(*deadline, 1_999_999_999);
            }
            other => panic!("expected Listed, got {other:?}"),
        }
    }

    #[test]
    fn decodes_bought_with_referral() {
        let referrer = Address::repeat_byte(0x33);
        let logs = vec![
            log_at(
                Address::repeat_byte(0x99),
                FidMarketplace::Bought {
                    fid: U256::from(7),
                    buyer: buyer(),
                    amount: U256::from(5_000u64),
                }
                .encode_log_data(),
            ),
            log_at(
                Address::repeat_byte(0x99),
                FidMarketplace::Referred { referrer }.encode_log_data(),
            ),
        ];

        let events = decode_fid_logs(&logs);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[0],
            MarketEvent::Bought {
                target: TargetId::Fid(7),
                ..
            }
        ));
        assert_eq!(events[0].event_type(), Some(EventType::Bought));
        // Referred annotates the sale; it never forms a ledger entry itself
        assert_eq!(events[1].event_type(), None);
        assert_eq!(find_referrer(&events), Some(referrer));
    }

    #[test]
    fn fid_offer_approved_has_no_amount() {
        let log = log_at(
            Address::repeat_byte(0x99),
            FidMarketplace::OfferApproved {
                fid: U256::from(9),
                buyer: buyer(),
            }
            .encode_log_data(),
        );

        let events = decode_fid_logs(&[log]);
        match &events[0] {
            MarketEvent::OfferApproved { amount, .. } => assert!(amount.is_none()),
            other => panic!("expected OfferApproved, got {other:?}"),
        }
    }

    #[test]
    fn skips_unrelated_logs() {
        // A log with a foreign topic0, like an ERC-20 transfer
        let foreign = log_at(
            Address::repeat_byte(0x44),
            LogData::new_unchecked(vec![B256::repeat_byte(0xab)], Bytes::new()),
        );
        let listed = log_at(
            Address::repeat_byte(0x99),
            FidMarketplace::Listed {
                fid: U256::from(1),
                owner: seller(),
                amount: U256::from(10u64),
                deadline: U256::from(100u64),
            }
            .encode_log_data(),
        );

        let events = decode_fid_logs(&[foreign, listed]);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], MarketEvent::Listed { .. }));
    }

    #[test]
    fn no_matching_event_yields_empty() {
        assert!(decode_fid_logs(&[]).is_empty());
    }

    #[test]
    fn oversized_fid_is_skipped() {
        // Any contract can emit a log with a matching signature; a fid wider
        // than 64 bits must be skipped, not crash the decode.
        let logs = vec![
            log_at(
                Address::repeat_byte(0x44),
                FidMarketplace::Listed {
                    fid: U256::MAX,
                    owner: seller(),
                    amount: U256::from(10u64),
                    deadline: U256::from(100u64),
                }
                .encode_log_data(),
            ),
            log_at(
                Address::repeat_byte(0x99),
                FidMarketplace::Bought {
                    fid: U256::from(7),
                    buyer: buyer(),
                    amount: U256::from(5u64),
                }
                .encode_log_data(),
            ),
        ];

        let events = decode_fid_logs(&logs);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], MarketEvent::Bought { .. }));
    }

    #[test]
    fn oversized_deadline_is_skipped() {
        let log = log_at(
            Address::repeat_byte(0x99),
            FidMarketplace::Listed {
                fid: U256::from(42),
                owner: seller(),
                amount: U256::from(10u64),
                deadline: U256::MAX,
            }
            .encode_log_data(),
        );

        assert!(decode_fid_logs(&[log]).is_empty());
    }
}

#[cfg(test)]
mod nft_decoding_tests {
    use alloy::primitives::{Address, LogData, U256};
    use alloy::rpc::types::Log;
    use alloy::sol_types::SolEvent;

    use fid_marketplace_backend::amount::Wei;
    use fid_marketplace_backend::chain::events::{
        decode_nft_logs, format_address, MarketEvent, NftMarketplace, TargetId,
    };

    fn marketplace() -> Address {
        Address::repeat_byte(0x55)
    }

    fn log_at(address: Address, data: LogData) -> Log {
        Log {
            inner: alloy::primitives::Log { address, data },
            ..Default::default()
        }
    }

    #[test]
    fn decodes_token_listing() {
        let log = log_at(
            marketplace(),
            NftMarketplace::Listed {
                tokenId: U256::from(1234),
                owner: Address::repeat_byte(0x66),
                price: U256::from(777u64),
                deadline: U256::from(2_000_000_000u64),
            }
            .encode_log_data(),
        );

        let events = decode_nft_logs(&[log], marketplace());
        assert_eq!(events.len(), 1);
        match &events[0] {
            MarketEvent::Listed { target, amount, .. } => {
                assert_eq!(*target, TargetId::Token("1234".to_string()));
                assert_eq!(*amount, Wei::from_u64(777));
            }
            other => panic!("expected Listed, got {other:?}"),
        }
    }

    #[test]
    fn ignores_logs_from_other_contracts() {
        let log = log_at(
            Address::repeat_byte(0x77),
            NftMarketplace::Listed {
                tokenId: U256::from(1),
                owner: Address::repeat_byte(0x66),
                price: U256::from(1u64),
                deadline: U256::from(1u64),
            }
            .encode_log_data(),
        );

        assert!(decode_nft_logs(&[log], marketplace()).is_empty());
    }

    #[test]
    fn nft_offer_approved_carries_amount() {
        let log = log_at(
            marketplace(),
            NftMarketplace::OfferApproved {
                tokenId: U256::from(8),
                buyer: Address::repeat_byte(0x88),
                amount: U256::from(4_200u64),
            }
            .encode_log_data(),
        );

        let events = decode_nft_logs(&[log], marketplace());
        match &events[0] {
            MarketEvent::OfferApproved { amount, .. } => {
                assert_eq!(*amount, Some(Wei::from_u64(4_200)));
            }
            other => panic!("expected OfferApproved, got {other:?}"),
        }
    }

    #[test]
    fn canceled_carries_the_seller() {
        let seller = Address::repeat_byte(0x99);
        let log = log_at(
            marketplace(),
            NftMarketplace::Canceled {
                tokenId: U256::from(3),
                seller,
            }
            .encode_log_data(),
        );

        let events = decode_nft_logs(&[log], marketplace());
        match &events[0] {
            MarketEvent::Canceled { seller: s, .. } => assert_eq!(*s, Some(seller)),
            other => panic!("expected Canceled, got {other:?}"),
        }
    }

    #[test]
    fn oversized_deadline_is_skipped() {
        let log = log_at(
            marketplace(),
            NftMarketplace::Listed {
                tokenId: U256::from(1),
                owner: Address::repeat_byte(0x66),
                price: U256::from(1u64),
                deadline: U256::MAX,
            }
            .encode_log_data(),
        );

        assert!(decode_nft_logs(&[log], marketplace()).is_empty());
    }

    #[test]
    fn addresses_format_lowercase() {
        let formatted = format_address(Address::repeat_byte(0xAB));
        assert_eq!(formatted, format!("0x{}", "ab".repeat(20)));
    }
}
