//! Fixed allow-list of ledgers the provider serves.

use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Network {
    Btc,
    Ltc,
    Doge,
}

pub const SUPPORTED_NETWORKS: [Network; 3] = [Network::Btc, Network::Ltc, Network::Doge];

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Btc => "BTC",
            Network::Ltc => "LTC",
            Network::Doge => "DOGE",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exact, case-sensitive match against [`SUPPORTED_NETWORKS`]. No trimming.
impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SUPPORTED_NETWORKS
            .iter()
            .copied()
            .find(|n| n.as_str() == s)
            .ok_or_else(|| s.to_string())
    }
}

/// True iff `network` names a supported ledger.
pub fn supports(network: &str) -> bool {
    network.parse::<Network>().is_ok()
}
