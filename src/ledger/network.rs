// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Flow network configuration and well-known contract addresses.

use super::Address;

/// Addresses of the contracts imported by the transaction templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
    pub fungible_token: Address,
    pub flow_token: Address,
    pub non_fungible_token: Address,
    pub metadata_views: Address,
    /// Deployment of the event-ticket NFT contract (`FooBarV4`).
    pub ticket_nft: Address,
}

/// Flow network configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// Access node REST endpoint
    pub access_url: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
    pub contracts: ContractAddresses,
}

impl NetworkConfig {
    /// Resolve a network by its short name (`testnet`, `mainnet`, `emulator`).
    pub fn by_name(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "testnet" => Some(FLOW_TESTNET),
            "mainnet" => Some(FLOW_MAINNET),
            "emulator" => Some(FLOW_EMULATOR),
            _ => None,
        }
    }

    pub fn explorer_tx_url(&self, tx_id: &str) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_id)
    }
}

/// Flow Testnet configuration.
pub const FLOW_TESTNET: NetworkConfig = NetworkConfig {
    name: "Flow Testnet",
    access_url: "https://rest-testnet.onflow.org",
    explorer_url: "https://testnet.flowscan.io",
    contracts: ContractAddresses {
        fungible_token: Address::new([0x9a, 0x07, 0x66, 0xd9, 0x3b, 0x66, 0x08, 0xb7]),
        flow_token: Address::new([0x7e, 0x60, 0xdf, 0x04, 0x2a, 0x9c, 0x08, 0x68]),
        non_fungible_token: Address::new([0x63, 0x1e, 0x88, 0xae, 0x7f, 0x1d, 0x7c, 0x20]),
        metadata_views: Address::new([0x63, 0x1e, 0x88, 0xae, 0x7f, 0x1d, 0x7c, 0x20]),
        ticket_nft: Address::new([0x4a, 0xc0, 0xee, 0x1c, 0x90, 0x3b, 0xf3, 0x62]),
    },
};

/// Flow Mainnet configuration.
///
/// The ticket contract has not been deployed to mainnet; it resolves to the
/// zero address and any transaction importing it fails remotely.
pub const FLOW_MAINNET: NetworkConfig = NetworkConfig {
    name: "Flow Mainnet",
    access_url: "https://rest-mainnet.onflow.org",
    explorer_url: "https://flowscan.io",
    contracts: ContractAddresses {
        fungible_token: Address::new([0xf2, 0x33, 0xdc, 0xee, 0x88, 0xfe, 0x0a, 0xbe]),
        flow_token: Address::new([0x16, 0x54, 0x65, 0x33, 0x99, 0x04, 0x0a, 0x61]),
        non_fungible_token: Address::new([0x1d, 0x7e, 0x57, 0xaa, 0x55, 0x81, 0x74, 0x48]),
        metadata_views: Address::new([0x1d, 0x7e, 0x57, 0xaa, 0x55, 0x81, 0x74, 0x48]),
        ticket_nft: Address::new([0; 8]),
    },
};

/// Local Flow emulator configuration.
pub const FLOW_EMULATOR: NetworkConfig = NetworkConfig {
    name: "Flow Emulator",
    access_url: "http://127.0.0.1:8888",
    explorer_url: "http://127.0.0.1:8888",
    contracts: ContractAddresses {
        fungible_token: Address::new([0xee, 0x82, 0x85, 0x6b, 0xf2, 0x0e, 0x2a, 0xa6]),
        flow_token: Address::new([0x0a, 0xe5, 0x3c, 0xb6, 0xe3, 0xf4, 0x2a, 0x79]),
        non_fungible_token: Address::new([0xf8, 0xd6, 0xe0, 0x58, 0x6b, 0x0a, 0x20, 0xc7]),
        metadata_views: Address::new([0xf8, 0xd6, 0xe0, 0x58, 0x6b, 0x0a, 0x20, 0xc7]),
        ticket_nft: Address::new([0xf8, 0xd6, 0xe0, 0x58, 0x6b, 0x0a, 0x20, 0xc7]),
    },
};
