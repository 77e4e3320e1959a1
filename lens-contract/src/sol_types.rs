//! Solidity interfaces the tooling calls into.

use alloy::{primitives::Address, sol, sol_types::SolCall};

sol! {
    /// Lens transparent proxy, upgraded by its admin.
    interface ITransparentUpgradeableProxy {
        function upgradeTo(address newImplementation) external;
    }

    /// Versioned beacon shared by the primitive instances.
    interface IBeacon {
        function owner() external view returns (address);
        function implementation() external view returns (address);
        function setImplementationForVersion(uint256 implementationVersion, address implementation) external;
        function setDefaultVersion(uint256 implementationVersion) external;
    }

    interface ILensCreate2 {
        function owner() external view returns (address);
        function getAddress(bytes32 salt) external view returns (address);
        function createTransparentUpgradeableProxy(
            bytes32 salt,
            address implementation,
            address proxyAdmin,
            bytes initializerCall,
            address expectedAddress
        ) external returns (address);
    }

    /// Read-side of rules and actions, used by the verification pass.
    interface IMetadataBased {
        function owner() external view returns (address);
        function getMetadataURI() external view returns (string);
    }

    interface IInitializable {
        function initialize(address owner) external;
    }

    interface IInitializableWithMetadata {
        function initialize(address owner, string metadataURI) external;
    }

    /// zkSync system contract deriving nonce-based addresses.
    interface IContractDeployer {
        function getNewAddressCreate(address sender, uint256 senderNonce) external view returns (address);
    }
}

/// Calldata of `initialize(owner, metadataURI)`.
pub fn initialize_with_metadata_call(owner: Address, metadata_uri: &str) -> Vec<u8> {
    IInitializableWithMetadata::initializeCall {
        owner,
        metadataURI: metadata_uri.to_string(),
    }
    .abi_encode()
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;

    #[test]
    fn initializer_calldata() {
        let owner = address!("0x00000000000000000000000000000000000000aa");
        let b = initialize_with_metadata_call(owner, "");
        assert_eq!(b[..4], IInitializableWithMetadata::initializeCall::SELECTOR);
        let decoded = IInitializableWithMetadata::initializeCall::abi_decode(&b).unwrap();
        assert_eq!(decoded.owner, owner);
        assert_eq!(decoded.metadataURI, "");
    }
}
