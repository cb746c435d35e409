use std::fmt;

use serde::{Deserialize, Serialize};

/// Directional classifier output. There is no neutral value: a classifier
/// always answers up or down, and "no signal yet" is modelled as `Option::None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
}

impl Signal {
    pub fn from_up(up: bool) -> Self {
        if up {
            Signal::Buy
        } else {
            Signal::Sell
        }
    }

    pub fn is_buy(self) -> bool {
        self == Signal::Buy
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Signal::Buy => "BUY",
            Signal::Sell => "SELL",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tradable status of one instrument.
///
/// `NoSignal -> HasSignal` once the first valid feature row produced a
/// candidate, then `BuyHeld <-> SellHeld` on confirmed placements only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TradeStatus {
    #[default]
    NoSignal,
    HasSignal,
    BuyHeld,
    SellHeld,
}

impl TradeStatus {
    pub fn held(self) -> Option<Signal> {
        match self {
            TradeStatus::BuyHeld => Some(Signal::Buy),
            TradeStatus::SellHeld => Some(Signal::Sell),
            TradeStatus::NoSignal | TradeStatus::HasSignal => None,
        }
    }

    pub fn holding(signal: Signal) -> Self {
        match signal {
            Signal::Buy => TradeStatus::BuyHeld,
            Signal::Sell => TradeStatus::SellHeld,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn held_signal_only_in_held_states() {
        assert_eq!(TradeStatus::NoSignal.held(), None);
        assert_eq!(TradeStatus::HasSignal.held(), None);
        assert_eq!(TradeStatus::BuyHeld.held(), Some(Signal::Buy));
        assert_eq!(TradeStatus::holding(Signal::Sell), TradeStatus::SellHeld);
    }

    #[test]
    fn serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Signal::Buy).unwrap(), "\"BUY\"");
        assert_eq!(Signal::from_up(false).to_string(), "SELL");
    }
}
