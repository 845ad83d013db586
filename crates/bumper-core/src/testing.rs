//! In-memory chain and engine harness for tests.

use crate::{BatchExecutor, EngineSettings, EventBus, OrderManager};
use alloy::primitives::{address, keccak256, utils::parse_ether};
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use bumper_account::implementations::local::LocalCustody;
use bumper_account::{AccountInterface, AccountService};
use bumper_delivery::{DeliveryError, DeliveryInterface, DeliveryService};
use bumper_exchange::implementations::{uniswap_v2::UniswapV2, uniswap_v3::UniswapV3};
use bumper_exchange::ExchangeService;
use bumper_funding::implementations::disperse::{disperseEthCall, DisperseFunding};
use bumper_funding::FundingService;
use bumper_storage::implementations::memory::MemoryStorage;
use bumper_storage::{StorageError, StorageInterface, StorageService};
use bumper_types::{
	Address, ConfigSchema, OrderStatusView, Schema, Transaction, TransactionHash,
	TransactionReceipt, ValidationError, U256,
};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

pub const TREASURY: Address = address!("1111111111111111111111111111111111111111");
pub const DISPERSER: Address = address!("D152f549545093347A162Dce210e7293f1452150");
pub const V3_ROUTER: Address = address!("E592427A0AEce92De3Edee1F18E0157C05861564");
pub const V2_ROUTER: Address = address!("7a250d5630B4cF539739dF2C5dAcb4c659F2488D");
pub const V2_FACTORY: Address = address!("5C69bEe701ef814a2B6a3EDD4B1652CB9cc5aA6f");
pub const V2_PAIR: Address = address!("2222222222222222222222222222222222222222");
pub const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");
pub const TOKEN: Address = address!("3333333333333333333333333333333333333333");

pub fn eth(value: &str) -> U256 {
	parse_ether(value).unwrap()
}

#[derive(Default)]
pub struct ChainState {
	pub balances: HashMap<Address, U256>,
	pub fail_funding: bool,
	/// Plain value transfers (the treasury fee) revert.
	pub fail_transfers: bool,
	/// Every V3 swap reverts.
	pub primary_down: bool,
	/// Number of swapping accounts (first come) whose swaps all revert.
	pub failing_swap_budget: usize,
	failing_accounts: HashSet<Address>,
	seen_swappers: HashSet<Address>,
	/// (account, router) of each successful swap.
	pub swaps: Vec<(Address, Address)>,
	pub liquid_tokens: HashSet<Address>,
	next_hash: u64,
}

/// Ledger of native balances that understands transfers, `disperseEth`, router
/// swaps and the V2 factory/pair reads.
#[derive(Clone, Default)]
pub struct MockChain {
	state: Arc<Mutex<ChainState>>,
}

impl MockChain {
	pub fn new() -> Self {
		let chain = Self::default();
		chain.state().liquid_tokens.insert(TOKEN);
		chain
	}

	pub fn state(&self) -> MutexGuard<'_, ChainState> {
		self.state.lock().unwrap()
	}

	pub fn set_balance(&self, address: Address, amount: U256) {
		self.state().balances.insert(address, amount);
	}

	pub fn balance(&self, address: Address) -> U256 {
		self.state().balances.get(&address).copied().unwrap_or_default()
	}
}

impl ChainState {
	fn hash(&mut self) -> TransactionHash {
		self.next_hash += 1;
		TransactionHash(U256::from(self.next_hash).to_be_bytes::<32>().to_vec())
	}

	fn debit(&mut self, from: Address, amount: U256) -> Result<(), DeliveryError> {
		let balance = self.balances.entry(from).or_default();
		if *balance < amount {
			return Err(DeliveryError::Network("insufficient funds for transfer".into()));
		}
		*balance -= amount;
		Ok(())
	}

	fn credit(&mut self, to: Address, amount: U256) {
		*self.balances.entry(to).or_default() += amount;
	}

	fn swap_fails(&mut self, from: Address, router: Address) -> bool {
		if !self.seen_swappers.contains(&from) && self.failing_swap_budget > 0 {
			self.failing_swap_budget -= 1;
			self.failing_accounts.insert(from);
		}
		self.seen_swappers.insert(from);
		self.failing_accounts.contains(&from) || (router == V3_ROUTER && self.primary_down)
	}
}

fn selector(signature: &str) -> [u8; 4] {
	let hash = keccak256(signature.as_bytes());
	[hash[0], hash[1], hash[2], hash[3]]
}

fn word(value: U256) -> Vec<u8> {
	value.to_be_bytes::<32>().to_vec()
}

fn address_word(address: Address) -> Vec<u8> {
	let mut out = vec![0u8; 12];
	out.extend_from_slice(address.as_slice());
	out
}

struct NoSchema;

impl ConfigSchema for NoSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

#[async_trait]
impl DeliveryInterface for MockChain {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoSchema)
	}

	async fn get_balance(&self, address: Address) -> Result<U256, DeliveryError> {
		tokio::task::yield_now().await;
		Ok(self.balance(address))
	}

	async fn submit(
		&self,
		mut tx: Transaction,
		signer: &dyn AccountInterface,
	) -> Result<TransactionHash, DeliveryError> {
		tx.chain_id = 31337;
		tx.nonce = Some(0);
		tx.gas_price = Some(1);
		tx.gas_limit = tx.gas_limit.or(Some(100_000));
		signer.sign_transaction(&tx).await?;

		let from = signer.address();
		let mut state = self.state();
		let hash = state.hash();

		if tx.to == DISPERSER {
			if state.fail_funding {
				return Err(DeliveryError::Reverted(hash));
			}
			let call = disperseEthCall::abi_decode(&tx.data)
				.map_err(|e| DeliveryError::Network(e.to_string()))?;
			state.debit(from, tx.value)?;
			for (recipient, amount) in call.recipients.iter().zip(call.values.iter()) {
				state.credit(*recipient, *amount);
			}
		} else if tx.to == V3_ROUTER || tx.to == V2_ROUTER {
			if state.swap_fails(from, tx.to) {
				return Err(DeliveryError::Reverted(hash));
			}
			state.debit(from, tx.value)?;
			state.swaps.push((from, tx.to));
		} else {
			if state.fail_transfers {
				return Err(DeliveryError::Reverted(hash));
			}
			state.debit(from, tx.value)?;
			state.credit(tx.to, tx.value);
		}

		Ok(hash)
	}

	async fn call(&self, tx: Transaction) -> Result<Vec<u8>, DeliveryError> {
		let state = self.state();
		let sel = tx.data.get(..4).unwrap_or_default();

		if tx.to == V2_FACTORY && sel == selector("getPair(address,address)").as_slice() {
			let token = Address::from_slice(&tx.data[16..36]);
			let pair = if state.liquid_tokens.contains(&token) {
				V2_PAIR
			} else {
				Address::ZERO
			};
			return Ok(address_word(pair));
		}
		if tx.to == V2_PAIR && sel == selector("getReserves()").as_slice() {
			let mut out = word(eth("100"));
			out.extend(word(eth("5")));
			out.extend(word(U256::ZERO));
			return Ok(out);
		}
		if tx.to == V2_PAIR && sel == selector("token0()").as_slice() {
			return Ok(address_word(TOKEN));
		}

		Err(DeliveryError::Network("execution reverted".into()))
	}

	async fn wait_for_confirmation(
		&self,
		hash: &TransactionHash,
		_confirmations: u64,
	) -> Result<TransactionReceipt, DeliveryError> {
		Ok(TransactionReceipt {
			hash: hash.clone(),
			block_number: 1,
			success: true,
		})
	}
}

/// Fixed values used across engine tests: 5 bumps of 0.002 per batch, so a
/// batch needs 0.0105 and a 0.02 deposit plans exactly one batch.
pub fn test_settings() -> EngineSettings {
	EngineSettings {
		treasury: TREASURY,
		treasury_fee: eth("0.009"),
		min_balance: eth("0.01"),
		bump_amount: eth("0.002"),
		batch_size: 5,
		gas_buffer: eth("0.0001"),
		inter_batch_delay: Duration::ZERO,
		max_jitter: Duration::ZERO,
		order_timeout: None,
	}
}

/// Memory storage whose order reads can be switched to fail.
#[derive(Clone, Default)]
pub struct FlakyStorage {
	inner: Arc<MemoryStorage>,
	fail_order_reads: Arc<AtomicBool>,
}

impl FlakyStorage {
	pub fn set_fail_order_reads(&self, fail: bool) {
		self.fail_order_reads.store(fail, Ordering::SeqCst);
	}
}

#[async_trait]
impl StorageInterface for FlakyStorage {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(NoSchema)
	}

	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		if key.starts_with("orders:") && self.fail_order_reads.load(Ordering::SeqCst) {
			return Err(StorageError::Backend("read failed".into()));
		}
		self.inner.get_bytes(key).await
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		self.inner.set_bytes(key, value).await
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		self.inner.delete(key).await
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		self.inner.exists(key).await
	}

	async fn keys(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
		self.inner.keys(namespace).await
	}
}

pub fn manager(chain: &MockChain, settings: EngineSettings) -> OrderManager {
	manager_with_storage(chain, settings, Box::new(MemoryStorage::new()))
}

pub fn manager_with_storage(
	chain: &MockChain,
	settings: EngineSettings,
	backend: Box<dyn StorageInterface>,
) -> OrderManager {
	let storage = Arc::new(StorageService::new(backend));
	let delivery = Arc::new(DeliveryService::new(Box::new(chain.clone()), 1));
	let account = Arc::new(AccountService::new(Box::new(LocalCustody)));
	let exchange = Arc::new(ExchangeService::new(
		Box::new(UniswapV3::new(V3_ROUTER, WETH, 3000, 300_000)),
		Some(Box::new(UniswapV2::new(
			V2_ROUTER,
			Some(V2_FACTORY),
			WETH,
			300_000,
		))),
		delivery.clone(),
		Duration::from_secs(1200),
	));
	let funding = Arc::new(FundingService::new(
		Box::new(DisperseFunding::new(DISPERSER, None)),
		delivery.clone(),
	));
	let event_bus = EventBus::new(256);
	let settings = Arc::new(settings);
	let executor = Arc::new(BatchExecutor::new(
		account.clone(),
		funding,
		exchange.clone(),
		storage.clone(),
		event_bus.clone(),
		settings.clone(),
	));

	OrderManager::new(
		storage, delivery, account, exchange, executor, event_bus, settings,
	)
}

/// Polls until the order is terminal and its loop has released the lease.
pub async fn wait_for_finish(manager: &OrderManager, order_id: &str) -> OrderStatusView {
	tokio::time::timeout(Duration::from_secs(10), async {
		loop {
			let view = manager.status(order_id).await.unwrap();
			if view.status.is_terminal() && !view.running {
				return view;
			}
			tokio::time::sleep(Duration::from_millis(5)).await;
		}
	})
	.await
	.expect("order did not finish")
}
