use alloy::primitives::Address;
use anyhow::Result;
use clap::Args;
use farmscope_core::boundary::confirm_switch;
use farmscope_core::{BoundaryInput, BoundaryState, ChainId};
use serde::Serialize;

#[derive(Debug, Args)]
pub struct BoundaryArgs {
    /// Connected account; omit when no wallet is connected
    #[arg(long)]
    account: Option<Address>,

    /// Chain the wallet is on
    #[arg(long)]
    actual_chain: ChainId,

    /// Chain the action needs
    #[arg(long)]
    expected_chain: ChainId,

    /// The active network plugin is not the EVM one
    #[arg(long)]
    non_evm_plugin: bool,

    /// The expected chain is a testnet that is currently disabled
    #[arg(long)]
    expected_chain_invalid: bool,

    /// The wallet provider cannot switch networks
    #[arg(long)]
    no_switch: bool,

    /// Proceed on the actual chain even if it differs
    #[arg(long)]
    accept_actual_chain: bool,

    /// Hex chain id the wallet reported after a switch request
    #[arg(long)]
    reported_chain: Option<String>,
}

impl From<&BoundaryArgs> for BoundaryInput {
    fn from(args: &BoundaryArgs) -> Self {
        BoundaryInput {
            account: args.account,
            actual_chain_id: args.actual_chain,
            expected_chain_id: args.expected_chain,
            plugin_is_evm: !args.non_evm_plugin,
            expected_chain_valid: !args.expected_chain_invalid,
            provider_can_switch: !args.no_switch,
            accept_actual_chain: args.accept_actual_chain,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BoundaryReport {
    #[serde(flatten)]
    state: BoundaryState,
    #[serde(skip_serializing_if = "Option::is_none")]
    switch_confirmed: Option<bool>,
}

fn report(args: &BoundaryArgs) -> BoundaryReport {
    let state = BoundaryInput::from(args).evaluate();
    let switch_confirmed = args.reported_chain.as_deref().map(|reported| {
        match confirm_switch(args.expected_chain, reported) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Network switch not confirmed");
                false
            }
        }
    });
    BoundaryReport {
        state,
        switch_confirmed,
    }
}

pub fn run(args: BoundaryArgs) -> Result<()> {
    super::print_json(&report(&args))
}
