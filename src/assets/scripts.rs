// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cadence templates for the ticket NFT and FlowToken operations.
//!
//! Templates import contracts from placeholder addresses (`0xNonFungibleToken`
//! and friends) that [`render`] resolves against the configured network.

use crate::ledger::ContractAddresses;

pub const MINT_GAS_LIMIT: u64 = 300;
pub const SETUP_COLLECTION_GAS_LIMIT: u64 = 200;
pub const TRANSFER_GAS_LIMIT: u64 = 100;

pub const MINT_NFT: &str = r#"
import NonFungibleToken from 0xNonFungibleToken
import FooBarV4 from 0xTicketNFT

transaction(recipient: Address, name: String, description: String, url: String, role: Bool) {
    let minter: &FooBarV4.NFTMinter
    let receiver: &{NonFungibleToken.Receiver}

    prepare(signer: auth(BorrowValue) &Account) {
        self.minter = signer.storage.borrow<&FooBarV4.NFTMinter>(from: FooBarV4.MinterStoragePath)
            ?? panic("Signer does not store a FooBarV4 minter")
        self.receiver = getAccount(recipient)
            .capabilities.borrow<&{NonFungibleToken.Receiver}>(FooBarV4.CollectionPublicPath)
            ?? panic("Recipient has no FooBarV4 collection")
    }

    execute {
        let nft <- self.minter.createNFT(
            name: name,
            description: description,
            url: url,
            organizerBool: role
        )
        self.receiver.deposit(token: <-nft)
    }
}
"#;

pub const SETUP_COLLECTION: &str = r#"
import NonFungibleToken from 0xNonFungibleToken
import FooBarV4 from 0xTicketNFT

transaction {
    prepare(signer: auth(BorrowValue, SaveValue, IssueStorageCapabilityController, PublishCapability) &Account) {
        if signer.storage.borrow<&FooBarV4.Collection>(from: FooBarV4.CollectionStoragePath) != nil {
            return
        }

        let collection <- FooBarV4.createEmptyCollection(nftType: Type<@FooBarV4.NFT>())
        signer.storage.save(<-collection, to: FooBarV4.CollectionStoragePath)

        let cap = signer.capabilities.storage.issue<&FooBarV4.Collection>(FooBarV4.CollectionStoragePath)
        signer.capabilities.publish(cap, at: FooBarV4.CollectionPublicPath)
    }
}
"#;

pub const TRANSFER_FLOW: &str = r#"
import FungibleToken from 0xFungibleToken
import FlowToken from 0xFlowToken
import FungibleTokenMetadataViews from 0xFungibleToken

transaction(amount: UFix64, to: Address) {
    let sentVault: @{FungibleToken.Vault}

    prepare(signer: auth(BorrowValue) &Account) {
        let vaultData = FlowToken.resolveContractView(
            resourceType: nil,
            viewType: Type<FungibleTokenMetadataViews.FTVaultData>()
        ) as! FungibleTokenMetadataViews.FTVaultData?
            ?? panic("Could not resolve FTVaultData view")

        let vault = signer.storage.borrow<auth(FungibleToken.Withdraw) &FlowToken.Vault>(
            from: vaultData.storagePath
        ) ?? panic("Signer has no FlowToken vault")

        self.sentVault <- vault.withdraw(amount: amount)
    }

    execute {
        let receiver = getAccount(to)
            .capabilities.borrow<&{FungibleToken.Receiver}>(/public/flowTokenReceiver)
            ?? panic("Recipient has no FlowToken receiver")
        receiver.deposit(from: <-self.sentVault)
    }
}
"#;

pub const GET_NFTS: &str = r#"
import MetadataViews from 0xMetadataViews
import FooBarV4 from 0xTicketNFT

access(all) fun main(address: Address): [[AnyStruct]] {
    let collection = getAccount(address)
        .capabilities.borrow<&FooBarV4.Collection>(FooBarV4.CollectionPublicPath)
        ?? panic("Account has no FooBarV4 collection")

    let records: [[AnyStruct]] = []
    for id in collection.getIDs() {
        let ticket = collection.borrowFooBarV4(id: id)!
        let display = ticket.resolveView(Type<MetadataViews.Display>())! as! MetadataViews.Display
        records.append([id, display, ticket.organizerBool])
    }
    return records
}
"#;

pub const GET_NFT_DISPLAYS: &str = r#"
import MetadataViews from 0xMetadataViews
import FooBarV4 from 0xTicketNFT

access(all) fun main(address: Address): [MetadataViews.Display] {
    let collection = getAccount(address)
        .capabilities.borrow<&FooBarV4.Collection>(FooBarV4.CollectionPublicPath)
        ?? panic("Account has no FooBarV4 collection")

    let displays: [MetadataViews.Display] = []
    for id in collection.getIDs() {
        let ticket = collection.borrowFooBarV4(id: id)!
        displays.append(ticket.resolveView(Type<MetadataViews.Display>())! as! MetadataViews.Display)
    }
    return displays
}
"#;

/// Substitute contract placeholders with `contracts`.
pub fn render(template: &str, contracts: &ContractAddresses) -> String {
    [
        ("0xNonFungibleToken", contracts.non_fungible_token),
        ("0xFungibleToken", contracts.fungible_token),
        ("0xFlowToken", contracts.flow_token),
        ("0xMetadataViews", contracts.metadata_views),
        ("0xTicketNFT", contracts.ticket_nft),
    ]
    .iter()
    .fold(template.to_string(), |script, &(placeholder, address)| {
        script.replace(placeholder, &address.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::FLOW_TESTNET;

    #[test]
    fn render_resolves_every_placeholder() {
        for template in [MINT_NFT, SETUP_COLLECTION, TRANSFER_FLOW, GET_NFTS, GET_NFT_DISPLAYS] {
            let script = render(template, &FLOW_TESTNET.contracts);
            for line in script.lines().filter(|l| l.starts_with("import")) {
                let address = line.rsplit(' ').next().unwrap();
                assert!(
                    address.len() == 18 && hex::decode(&address[2..]).is_ok(),
                    "unresolved import: {line}"
                );
            }
        }
    }

    #[test]
    fn render_uses_network_addresses() {
        let script = render(MINT_NFT, &FLOW_TESTNET.contracts);
        assert!(script.contains("import NonFungibleToken from 0x631e88ae7f1d7c20"));
        assert!(script.contains("import FooBarV4 from 0x4ac0ee1c903bf362"));

        let script = render(TRANSFER_FLOW, &FLOW_TESTNET.contracts);
        assert!(script.contains("import FungibleTokenMetadataViews from 0x9a0766d93b6608b7"));
        assert!(script.contains("import FlowToken from 0x7e60df042a9c0868"));
    }
}
