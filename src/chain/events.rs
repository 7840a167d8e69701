use alloy::primitives::Address;
use alloy::rpc::types::Log;
use alloy::sol;
use alloy::sol_types::SolEvent;

use crate::amount::Wei;
use crate::types::EventType;

sol! {
    /// FID marketplace contract events (identity listings keyed by fid).
    #[derive(Debug)]
    contract FidMarketplace {
        event Listed(uint256 indexed fid, address indexed owner, uint256 amount, uint256 deadline);
        event Bought(uint256 indexed fid, address indexed buyer, uint256 amount);
        event Canceled(uint256 indexed fid);
        event OfferMade(uint256 indexed fid, address indexed buyer, uint256 amount, uint256 deadline);
        event OfferCanceled(uint256 indexed fid, address indexed buyer);
        event OfferApproved(uint256 indexed fid, address indexed buyer);
        event Referred(address indexed referrer);
    }

    /// NFT marketplace contract events (ERC-721 listings keyed by token id).
    #[derive(Debug)]
    contract NftMarketplace {
        event Listed(uint256 indexed tokenId, address indexed owner, uint256 price, uint256 deadline);
        event Bought(uint256 indexed tokenId, address indexed buyer, uint256 price);
        event Canceled(uint256 indexed tokenId, address indexed seller);
        event OfferMade(uint256 indexed tokenId, address indexed buyer, uint256 amount, uint256 deadline);
        event OfferCanceled(uint256 indexed tokenId, address indexed buyer);
        event OfferApproved(uint256 indexed tokenId, address indexed buyer, uint256 amount);
        event Referred(address indexed referrer);
    }
}

/// What a decoded event is about: a FID or a (token, chain) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetId {
    Fid(i64),
    Token(String),
}

/// A marketplace event decoded from a receipt log, normalized across the
/// FID and NFT contract ABIs.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    Listed {
        target: TargetId,
        owner: Address,
        amount: Wei,
        deadline: u64,
    },
    Bought {
        target: TargetId,
        buyer: Address,
        amount: Wei,
    },
    Canceled {
        target: TargetId,
        seller: Option<Address>,
    },
    OfferMade {
        target: TargetId,
        buyer: Address,
        amount: Wei,
        deadline: u64,
    },
    OfferCanceled {
        target: TargetId,
        buyer: Address,
    },
    OfferApproved {
        target: TargetId,
        buyer: Address,
        /// Present only on the NFT contract; the FID contract does not emit
        /// the approved amount, it is read from the stored offer.
        amount: Option<Wei>,
    },
    Referred {
        referrer: Address,
    },
}

impl MarketEvent {
    /// Ledger name for this event, or None for Referred, which only ever
    /// annotates a sale and never forms a ledger entry of its own.
    pub fn event_type(&self) -> Option<EventType> {
        match self {
            MarketEvent::Listed { .. } => Some(EventType::Listed),
            MarketEvent::Bought { .. } => Some(EventType::Bought),
            MarketEvent::Canceled { .. } => Some(EventType::Canceled),
            MarketEvent::OfferMade { .. } => Some(EventType::OfferMade),
            MarketEvent::OfferCanceled { .. } => Some(EventType::OfferCanceled),
            MarketEvent::OfferApproved { .. } => Some(EventType::OfferApproved),
            MarketEvent::Referred { .. } => None,
        }
    }
}

/// Lowercase 0x-prefixed form used everywhere addresses are stored.
pub fn format_address(address: Address) -> String {
    format!("{:#x}", address)
}

/// FID targets must fit the store's signed 64-bit column. Anything wider is
/// not a real FID; the caller skips the log.
fn fid_target(fid: alloy::primitives::U256) -> Option<TargetId> {
    u64::try_from(fid)
        .ok()
        .and_then(|fid| i64::try_from(fid).ok())
        .map(TargetId::Fid)
}

fn token_target(token_id: alloy::primitives::U256) -> TargetId {
    TargetId::Token(token_id.to_string())
}

/// Unix-seconds deadline. A value wider than 64 bits is garbage; the caller
/// skips the log.
fn unix_deadline(deadline: alloy::primitives::U256) -> Option<u64> {
    u64::try_from(deadline).ok()
}

/// Decode all FID marketplace events out of a receipt's logs.
///
/// Logs that do not match any known event signature are skipped, as are logs
/// whose numeric fields overflow the engine's types; receipts routinely carry
/// transfer and approval logs from other contracts, and any contract can emit
/// a log with a matching signature and absurd values.
pub fn decode_fid_logs(logs: &[Log]) -> Vec<MarketEvent> {
    let mut events = Vec::new();

    for log in logs {
        let Some(topic0) = log.topic0() else {
            continue;
        };

        let event = if *topic0 == FidMarketplace::Listed::SIGNATURE_HASH {
            log.log_decode::<FidMarketplace::Listed>()
                .ok()
                .and_then(|d| {
                    Some(MarketEvent::Listed {
                        target: fid_target(d.inner.data.fid)?,
                        owner: d.inner.data.owner,
                        amount: Wei::new(d.inner.data.amount),
                        deadline: unix_deadline(d.inner.data.deadline)?,
                    })
                })
        } else if *topic0 == FidMarketplace::Bought::SIGNATURE_HASH {
            log.log_decode::<FidMarketplace::Bought>()
                .ok()
                .and_then(|d| {
                    Some(MarketEvent::Bought {
                        target: fid_target(d.inner.data.fid)?,
                        buyer: d.inner.data.buyer,
                        amount: Wei::new(d.inner.data.amount),
                    })
                })
        } else if *topic0 == FidMarketplace::Canceled::SIGNATURE_HASH {
            log.log_decode::<FidMarketplace::Canceled>()
                .ok()
                .and_then(|d| {
                    Some(MarketEvent::Canceled {
                        target: fid_target(d.inner.data.fid)?,
                        seller: None,
                    })
                })
        } else if *topic0 == FidMarketplace::OfferMade::SIGNATURE_HASH {
            log.log_decode::<FidMarketplace::OfferMade>()
                .ok()
                .and_then(|d| {
                    Some(MarketEvent::OfferMade {
                        target: fid_target(d.inner.data.fid)?,
                        buyer: d.inner.data.buyer,
                        amount: Wei::new(d.inner.data.amount),
                        deadline: unix_deadline(d.inner.data.deadline)?,
                    })
                })
        } else if *topic0 == FidMarketplace::OfferCanceled::SIGNATURE_HASH {
            log.log_decode::<FidMarketplace::OfferCanceled>()
                .ok()
                .and_then(|d| {
                    Some(MarketEvent::OfferCanceled {
                        target: fid_target(d.inner.data.fid)?,
                        buyer: d.inner.data.buyer,
                    })
                })
        } else if *topic0 == FidMarketplace::OfferApproved::SIGNATURE_HASH {
            log.log_decode::<FidMarketplace::OfferApproved>()
                .ok()
                .and_then(|d| {
                    Some(MarketEvent::OfferApproved {
                        target: fid_target(d.inner.data.fid)?,
                        buyer: d.inner.data.buyer,
                        amount: None,
                    })
                })
        } else if *topic0 == FidMarketplace::Referred::SIGNATURE_HASH {
            log.log_decode::<FidMarketplace::Referred>()
                .ok()
                .map(|d| MarketEvent::Referred {
                    referrer: d.inner.data.referrer,
                })
        } else {
            None
        };

        if let Some(event) = event {
            events.push(event);
        }
    }

    events
}

/// Decode all NFT marketplace events out of a receipt's logs, accepting only
/// logs emitted by the given marketplace contract.
pub fn decode_nft_logs(logs: &[Log], marketplace: Address) -> Vec<MarketEvent> {
    let mut events = Vec::new();

    for log in logs {
        if log.address() != marketplace {
            continue;
        }
        let Some(topic0) = log.topic0() else {
            continue;
        };

        let event = if *topic0 == NftMarketplace::Listed::SIGNATURE_HASH {
            log.log_decode::<NftMarketplace::Listed>()
                .ok()
                .and_then(|d| {
                    Some(MarketEvent::Listed {
                        target: token_target(d.inner.data.tokenId),
                        owner: d.inner.data.owner,
                        amount: Wei::new(d.inner.data.price),
                        deadline: unix_deadline(d.inner.data.deadline)?,
                    })
                })
        } else if *topic0 == NftMarketplace::Bought::SIGNATURE_HASH {
            log.log_decode::<NftMarketplace::Bought>()
                .ok()
                .map(|d| MarketEvent::Bought {
                    target: token_target(d.inner.data.tokenId),
                    buyer: d.inner.data.buyer,
                    amount: Wei::new(d.inner.data.price),
                })
        } else if *topic0 == NftMarketplace::Canceled::SIGNATURE_HASH {
            log.log_decode::<NftMarketplace::Canceled>()
                .ok()
                .map(|d| MarketEvent::Canceled {
                    target: token_target(d.inner.data.tokenId),
                    seller: Some(d.inner.data.seller),
                })
        } else if *topic0 == NftMarketplace::OfferMade::SIGNATURE_HASH {
            log.log_decode::<NftMarketplace::OfferMade>()
                .ok()
                .and_then(|d| {
                    Some(MarketEvent::OfferMade {
                        target: token_target(d.inner.data.tokenId),
                        buyer: d.inner.data.buyer,
                        amount: Wei::new(d.inner.data.amount),
                        deadline: unix_deadline(d.inner.data.deadline)?,
                    })
                })
        } else if *topic0 == NftMarketplace::OfferCanceled::SIGNATURE_HASH {
            log.log_decode::<NftMarketplace::OfferCanceled>()
                .ok()
                .map(|d| MarketEvent::OfferCanceled {
                    target: token_target(d.inner.data.tokenId),
                    buyer: d.inner.data.buyer,
                })
        } else if *topic0 == NftMarketplace::OfferApproved::SIGNATURE_HASH {
            log.log_decode::<NftMarketplace::OfferApproved>()
                .ok()
                .map(|d| MarketEvent::OfferApproved {
                    target: token_target(d.inner.data.tokenId),
                    buyer: d.inner.data.buyer,
                    amount: Some(Wei::new(d.inner.data.amount)),
                })
        } else if *topic0 == NftMarketplace::Referred::SIGNATURE_HASH {
            log.log_decode::<NftMarketplace::Referred>()
                .ok()
                .map(|d| MarketEvent::Referred {
                    referrer: d.inner.data.referrer,
                })
        } else {
            None
        };

        if let Some(event) = event {
            events.push(event);
        }
    }

    events
}

/// First Referred event in a batch, if any. A sale receipt carries at most
/// one referral.
pub fn find_referrer(events: &[MarketEvent]) -> Option<Address> {
    events.iter().find_map(|e| match e {
        MarketEvent::Referred { referrer } => Some(*referrer),
        _ => None,
    })
}
