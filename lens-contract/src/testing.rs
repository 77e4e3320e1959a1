//! In-memory [`Chain`] for tests.
//!
//! Besides plain accounts, code and storage it emulates the contracts the
//! tooling talks to: transparent proxies (recognised by their bytecode),
//! versioned beacons, the CREATE2 factory and initialized rules/actions that
//! answer `owner()` and `getMetadataURI()`. Deployed code is the submitted
//! bytecode itself, as on zkSync, which is also the default derivation.

use std::collections::HashMap;

use alloy::{
    primitives::{Address, B256, Bytes, TxHash, U256, keccak256},
    sol_types::{SolCall, SolValue},
};
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{
    chain::{AddressDerivation, Chain, ChainError},
    onchain::{BEACON_DEFAULT_VERSION_SLOT, EIP1967_ADMIN_SLOT, EIP1967_IMPLEMENTATION_SLOT},
    sol_types::{
        IBeacon, IInitializable, IInitializableWithMetadata, ILensCreate2, IMetadataBased,
        ITransparentUpgradeableProxy,
    },
};

#[derive(Debug, Clone)]
enum Kind {
    Proxy,
    Beacon {
        owner: Address,
        versions: HashMap<U256, Address>,
    },
    Create2Factory {
        owner: Address,
    },
}

#[derive(Debug, Default)]
struct State {
    balances: HashMap<Address, U256>,
    nonces: HashMap<Address, u64>,
    code: HashMap<Address, Bytes>,
    storage: HashMap<(Address, B256), B256>,
    kinds: HashMap<Address, Kind>,
    initialized: HashMap<Address, (Address, String)>,
    proxy_bytecode: Bytes,
    derivation: AddressDerivation,
    deployments: usize,
    transactions: usize,
}

impl State {
    fn slot(&self, at: Address, slot: B256) -> B256 {
        self.storage.get(&(at, slot)).copied().unwrap_or_default()
    }

    fn next_nonce(&mut self, from: Address) -> u64 {
        let n = self.nonces.entry(from).or_default();
        *n += 1;
        *n - 1
    }

    fn tx_hash(&self) -> TxHash {
        keccak256(self.transactions.to_be_bytes())
    }

    fn create2_address(&self, factory: Address, salt: B256) -> Address {
        factory.create2(salt, keccak256(&self.proxy_bytecode))
    }

    fn install_proxy(&mut self, at: Address, implementation: Address, admin: Address, init: &[u8]) {
        self.code.insert(at, self.proxy_bytecode.clone());
        self.storage
            .insert((at, EIP1967_IMPLEMENTATION_SLOT), implementation.into_word());
        self.storage.insert((at, EIP1967_ADMIN_SLOT), admin.into_word());
        self.kinds.insert(at, Kind::Proxy);
        if let Ok(c) = IInitializableWithMetadata::initializeCall::abi_decode(init) {
            self.initialized.insert(at, (c.owner, c.metadataURI));
        } else if let Ok(c) = IInitializable::initializeCall::abi_decode(init) {
            self.initialized.insert(at, (c.owner, String::new()));
        }
    }
}

fn revert(msg: &str) -> ChainError {
    ChainError::CallReverted(msg.to_string())
}

fn selector(input: &[u8]) -> Result<[u8; 4], ChainError> {
    input
        .get(..4)
        .and_then(|s| s.try_into().ok())
        .ok_or_else(|| revert("missing selector"))
}

#[derive(Debug)]
pub struct MemoryChain {
    sender: Address,
    state: Mutex<State>,
}

impl Default for MemoryChain {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryChain {
    /// A chain whose default sender holds 1000 ether.
    pub fn new() -> Self {
        let sender = Address::with_last_byte(0xd0);
        let chain = Self {
            sender,
            state: Mutex::new(State {
                derivation: AddressDerivation::Zksync,
                ..State::default()
            }),
        };
        chain.fund(sender, U256::from(10).pow(U256::from(21)));
        chain
    }

    /// Deployments of exactly this bytecode are treated as transparent
    /// proxies.
    pub fn set_proxy_bytecode(&self, code: Bytes) {
        self.state.lock().proxy_bytecode = code;
    }

    /// Report `derivation` to the tooling. Addresses are derived the EVM
    /// way either way.
    pub fn set_derivation(&self, derivation: AddressDerivation) {
        self.state.lock().derivation = derivation;
    }

    pub fn fund(&self, who: Address, amount: U256) {
        self.state.lock().balances.insert(who, amount);
    }

    pub fn set_code(&self, at: Address, code: Bytes) {
        self.state.lock().code.insert(at, code);
    }

    /// Install a beacon at `at` serving `implementation` as `version`, which
    /// is also the default version.
    pub fn install_beacon(&self, at: Address, owner: Address, version: U256, implementation: Address) {
        let mut s = self.state.lock();
        s.code.insert(at, Bytes::from_static(b"beacon"));
        s.storage
            .insert((at, BEACON_DEFAULT_VERSION_SLOT), B256::from(version));
        s.kinds.insert(
            at,
            Kind::Beacon {
                owner,
                versions: HashMap::from([(version, implementation)]),
            },
        );
    }

    pub fn install_create2_factory(&self, at: Address, owner: Address) {
        let mut s = self.state.lock();
        s.code.insert(at, Bytes::from_static(b"create2"));
        s.kinds.insert(at, Kind::Create2Factory { owner });
    }

    /// Number of contracts created so far.
    pub fn deployments(&self) -> usize {
        self.state.lock().deployments
    }

    /// Number of state-changing transactions, deployments included.
    pub fn transactions(&self) -> usize {
        self.state.lock().transactions
    }
}

#[async_trait]
impl Chain for MemoryChain {
    fn sender(&self) -> Address {
        self.sender
    }

    fn derivation(&self) -> AddressDerivation {
        self.state.lock().derivation
    }

    async fn balance(&self, who: Address) -> Result<U256, ChainError> {
        Ok(self.state.lock().balances.get(&who).copied().unwrap_or_default())
    }

    async fn nonce(&self, who: Address) -> Result<u64, ChainError> {
        Ok(self.state.lock().nonces.get(&who).copied().unwrap_or_default())
    }

    async fn code_at(&self, at: Address) -> Result<Bytes, ChainError> {
        Ok(self.state.lock().code.get(&at).cloned().unwrap_or_default())
    }

    async fn storage_at(&self, at: Address, slot: B256) -> Result<B256, ChainError> {
        Ok(self.state.lock().slot(at, slot))
    }

    async fn call(&self, from: Address, to: Address, input: Bytes) -> Result<Bytes, ChainError> {
        let s = self.state.lock();
        let sel = selector(&input)?;
        let out = match s.kinds.get(&to) {
            Some(Kind::Beacon { owner, versions }) => match sel {
                IBeacon::ownerCall::SELECTOR => (*owner,).abi_encode_params(),
                IBeacon::implementationCall::SELECTOR => {
                    let default = U256::from_be_bytes(s.slot(to, BEACON_DEFAULT_VERSION_SLOT).0);
                    let imp = versions.get(&default).copied().unwrap_or_default();
                    (imp,).abi_encode_params()
                }
                _ => return Err(revert("unknown beacon function")),
            },
            Some(Kind::Create2Factory { owner }) => match sel {
                ILensCreate2::ownerCall::SELECTOR => (*owner,).abi_encode_params(),
                ILensCreate2::getAddressCall::SELECTOR => {
                    let c = ILensCreate2::getAddressCall::abi_decode(&input)?;
                    (s.create2_address(to, c.salt),).abi_encode_params()
                }
                ILensCreate2::createTransparentUpgradeableProxyCall::SELECTOR => {
                    if from != *owner {
                        return Err(revert("caller is not the owner"));
                    }
                    let c = ILensCreate2::createTransparentUpgradeableProxyCall::abi_decode(&input)?;
                    let addr = s.create2_address(to, c.salt);
                    if addr != c.expectedAddress {
                        return Err(revert("unexpected address"));
                    }
                    (addr,).abi_encode_params()
                }
                _ => return Err(revert("unknown factory function")),
            },
            _ => {
                let Some((owner, uri)) = s.initialized.get(&to) else {
                    return Err(revert("not an initialized contract"));
                };
                match sel {
                    IMetadataBased::ownerCall::SELECTOR => (*owner,).abi_encode_params(),
                    IMetadataBased::getMetadataURICall::SELECTOR => {
                        (uri.clone(),).abi_encode_params()
                    }
                    _ => return Err(revert("unknown function")),
                }
            }
        };
        Ok(out.into())
    }

    async fn deploy(
        &self,
        from: Address,
        bytecode: Bytes,
        args: Bytes,
    ) -> Result<Address, ChainError> {
        let mut s = self.state.lock();
        s.transactions += 1;
        let nonce = s.next_nonce(from);
        let addr = from.create(nonce);
        if !s.proxy_bytecode.is_empty() && bytecode == s.proxy_bytecode {
            let (implementation, admin, init) =
                <(Address, Address, Bytes)>::abi_decode_params(&args)?;
            s.install_proxy(addr, implementation, admin, &init);
        } else {
            s.code.insert(addr, bytecode);
        }
        s.deployments += 1;
        Ok(addr)
    }

    async fn send(&self, from: Address, to: Address, input: Bytes) -> Result<TxHash, ChainError> {
        let mut s = self.state.lock();
        s.transactions += 1;
        s.next_nonce(from);
        let hash = s.tx_hash();
        let sel = selector(&input)?;
        match s.kinds.get(&to).cloned() {
            Some(Kind::Proxy) if sel == ITransparentUpgradeableProxy::upgradeToCall::SELECTOR => {
                if from != Address::from_word(s.slot(to, EIP1967_ADMIN_SLOT)) {
                    return Err(revert("caller is not the proxy admin"));
                }
                let c = ITransparentUpgradeableProxy::upgradeToCall::abi_decode(&input)?;
                s.storage
                    .insert((to, EIP1967_IMPLEMENTATION_SLOT), c.newImplementation.into_word());
            }
            Some(Kind::Beacon { owner, mut versions }) => {
                if from != owner {
                    return Err(revert("caller is not the beacon owner"));
                }
                match sel {
                    IBeacon::setImplementationForVersionCall::SELECTOR => {
                        let c = IBeacon::setImplementationForVersionCall::abi_decode(&input)?;
                        versions.insert(c.implementationVersion, c.implementation);
                        s.kinds.insert(to, Kind::Beacon { owner, versions });
                    }
                    IBeacon::setDefaultVersionCall::SELECTOR => {
                        let c = IBeacon::setDefaultVersionCall::abi_decode(&input)?;
                        if !versions.contains_key(&c.implementationVersion) {
                            return Err(revert("unknown version"));
                        }
                        s.storage.insert(
                            (to, BEACON_DEFAULT_VERSION_SLOT),
                            B256::from(c.implementationVersion),
                        );
                    }
                    _ => return Err(revert("unknown beacon function")),
                }
            }
            Some(Kind::Create2Factory { owner })
                if sel == ILensCreate2::createTransparentUpgradeableProxyCall::SELECTOR =>
            {
                if from != owner {
                    return Err(revert("caller is not the owner"));
                }
                let c = ILensCreate2::createTransparentUpgradeableProxyCall::abi_decode(&input)?;
                let addr = s.create2_address(to, c.salt);
                if addr != c.expectedAddress || s.code.contains_key(&addr) {
                    return Err(revert("create2 address unavailable"));
                }
                s.install_proxy(addr, c.implementation, c.proxyAdmin, &c.initializerCall);
                s.deployments += 1;
            }
            _ => return Err(revert("unsupported transaction")),
        }
        Ok(hash)
    }

    async fn predict_create_address(
        &self,
        deployer: Address,
        nonce: u64,
    ) -> Result<Address, ChainError> {
        Ok(deployer.create(nonce))
    }
}
