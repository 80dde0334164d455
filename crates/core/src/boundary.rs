//! Chain boundary: decides whether a connected wallet may act on the expected network.
//!
//! The decision is a pure function of the wallet state; prompting the user and
//! actually switching networks belong to the wallet layer.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::ChainId;

/// Wallet and network state observed before an on-chain action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryInput {
    /// Connected account, if any.
    pub account: Option<Address>,
    /// Chain the wallet is currently on.
    pub actual_chain_id: ChainId,
    /// Chain the action needs.
    pub expected_chain_id: ChainId,
    /// Whether the active network plugin is the EVM one.
    pub plugin_is_evm: bool,
    /// Whether the expected chain is valid under the current testnet policy.
    pub expected_chain_valid: bool,
    /// Whether the wallet provider supports switching networks.
    pub provider_can_switch: bool,
    /// Caller-supplied override accepting the actual chain even on mismatch.
    pub accept_actual_chain: bool,
}

/// Outcome of evaluating a [`BoundaryInput`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum BoundaryState {
    /// No wallet connected.
    ConnectWallet,
    /// Wallet is on the right chain and plugin; the action may proceed.
    Ready,
    /// The wallet cannot be guided to the expected chain.
    Unavailable {
        /// Chain the wallet is stuck on.
        #[serde(rename = "actualChainId")]
        actual_chain_id: ChainId,
    },
    /// The network plugin must change (and possibly the chain too).
    SwitchPlugin {
        /// Whether the chain must also change.
        #[serde(rename = "switchChain")]
        switch_chain: bool,
    },
    /// Only the chain must change.
    SwitchChain {
        /// Current chain.
        from: ChainId,
        /// Required chain.
        to: ChainId,
    },
}

impl BoundaryInput {
    /// Whether the actual chain matches the expected one.
    pub fn chain_matched(&self) -> bool {
        self.actual_chain_id == self.expected_chain_id
    }

    /// Whether the user can be guided to switch at all.
    pub fn switch_allowed(&self) -> bool {
        self.expected_chain_valid && self.account.is_some() && self.provider_can_switch
    }

    /// Evaluate the boundary.
    ///
    /// Checks run in a fixed order: connected account, match (or override),
    /// switch permission, plugin, chain.
    pub fn evaluate(&self) -> BoundaryState {
        if self.account.is_none() {
            return BoundaryState::ConnectWallet;
        }

        if (self.chain_matched() && self.plugin_is_evm) || self.accept_actual_chain {
            return BoundaryState::Ready;
        }

        if !self.switch_allowed() {
            return BoundaryState::Unavailable {
                actual_chain_id: self.actual_chain_id,
            };
        }

        if !self.plugin_is_evm {
            return BoundaryState::SwitchPlugin {
                switch_chain: !self.chain_matched(),
            };
        }

        BoundaryState::SwitchChain {
            from: self.actual_chain_id,
            to: self.expected_chain_id,
        }
    }
}

/// Check the chain id a wallet reports after a switch request.
///
/// Wallets report chain ids as `0x`-prefixed hex quantities.
pub fn confirm_switch(expected: ChainId, reported_hex: &str) -> Result<(), CoreError> {
    let raw = reported_hex.trim();
    let raw = raw.strip_prefix("0x").unwrap_or(raw);
    let actual = u64::from_str_radix(raw, 16).map_err(|_| CoreError::InvalidHex)?;

    if actual != expected {
        return Err(CoreError::ChainMismatch { expected, actual });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> BoundaryInput {
        BoundaryInput {
            account: Some(Address::repeat_byte(0x01)),
            actual_chain_id: 1,
            expected_chain_id: 1,
            plugin_is_evm: true,
            expected_chain_valid: true,
            provider_can_switch: true,
            accept_actual_chain: false,
        }
    }

    #[test]
    fn test_no_account_needs_connect() {
        let input = BoundaryInput {
            account: None,
            ..connected()
        };
        assert_eq!(input.evaluate(), BoundaryState::ConnectWallet);
    }

    #[test]
    fn test_matched_is_ready() {
        assert_eq!(connected().evaluate(), BoundaryState::Ready);
    }

    #[test]
    fn test_override_accepts_mismatch() {
        let input = BoundaryInput {
            actual_chain_id: 137,
            accept_actual_chain: true,
            ..connected()
        };
        assert_eq!(input.evaluate(), BoundaryState::Ready);
    }

    #[test]
    fn test_mismatch_switches_chain() {
        let input = BoundaryInput {
            actual_chain_id: 137,
            ..connected()
        };
        assert_eq!(
            input.evaluate(),
            BoundaryState::SwitchChain { from: 137, to: 1 }
        );
    }

    #[test]
    fn test_provider_without_switch_is_unavailable() {
        let input = BoundaryInput {
            actual_chain_id: 56,
            provider_can_switch: false,
            ..connected()
        };
        assert_eq!(
            input.evaluate(),
            BoundaryState::Unavailable { actual_chain_id: 56 }
        );
    }

    #[test]
    fn test_invalid_expected_chain_is_unavailable() {
        let input = BoundaryInput {
            actual_chain_id: 56,
            expected_chain_valid: false,
            ..connected()
        };
        assert!(matches!(input.evaluate(), BoundaryState::Unavailable { .. }));
    }

    #[test]
    fn test_plugin_mismatch_switches_plugin() {
        let same_chain = BoundaryInput {
            plugin_is_evm: false,
            ..connected()
        };
        assert_eq!(
            same_chain.evaluate(),
            BoundaryState::SwitchPlugin { switch_chain: false }
        );

        let other_chain = BoundaryInput {
            plugin_is_evm: false,
            actual_chain_id: 10,
            ..connected()
        };
        assert_eq!(
            other_chain.evaluate(),
            BoundaryState::SwitchPlugin { switch_chain: true }
        );
    }

    #[test]
    fn test_confirm_switch() {
        assert!(confirm_switch(137, "0x89").is_ok());
        assert_eq!(
            confirm_switch(137, "0x1"),
            Err(CoreError::ChainMismatch {
                expected: 137,
                actual: 1
            })
        );
        assert_eq!(confirm_switch(1, "0xnope"), Err(CoreError::InvalidHex));
    }
}
