use crate::config::DashboardConfig;
use crate::contracts::{
    Contracts, MockRouterContract, MockSaleContract, MockTokenContract, MockVestingContract,
    TokenContract, VestingContract,
};
use crate::dashboard::template::DashboardTemplate;
use crate::dashboard::{
    ActionError, ConnectionState, Dashboard, DashboardEvent, DashboardView, Field, RefreshPolicy,
};
use crate::eth_rpc::TransactionReceipt;
use crate::gateway::{GatewayError, RpcError};
use crate::guard::ActionKind;
use crate::numeric::one_token;
use crate::session::{Account, AccountSession};
use crate::test_fixtures::{
    active_round, confirmed_receipt, ether, schedule, BUYER, OWNER, SALE, TX_HASH, VESTING,
};
use crate::vesting::VestingSchedule;
use crate::wallet::MockWalletProvider;
use alloy_primitives::{Address, U256};
use askama::Template;
use assert_matches::assert_matches;
use async_trait::async_trait;
use mockall::predicate::eq;
use mockall::Sequence;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

const PRICE: u64 = 1_250_000;

fn transport_error() -> GatewayError {
    GatewayError::Rpc(RpcError::Transport("connection reset".to_string()))
}

fn wallet_for(account: Address) -> MockWalletProvider {
    let mut wallet = MockWalletProvider::new();
    wallet
        .expect_request()
        .withf(|method, _| method == "eth_requestAccounts")
        .returning(move |_, _| Ok(json!([account])));
    wallet
}

struct Chain {
    sale: MockSaleContract,
    vesting: MockVestingContract,
    token: MockTokenContract,
    router: MockRouterContract,
}

impl Chain {
    fn new() -> Self {
        let mut sale = MockSaleContract::new();
        sale.expect_address().return_const(SALE);
        let mut vesting = MockVestingContract::new();
        vesting.expect_address().return_const(VESTING);
        Self {
            sale,
            vesting,
            token: MockTokenContract::new(),
            router: MockRouterContract::new(),
        }
    }

    /// Exactly one successful read of every field, as done when connecting.
    fn with_initial_reads(mut self, owner: Address, balance: U256) -> Self {
        self.router
            .expect_amounts_out()
            .times(1)
            .returning(|amount_in, _| Ok(vec![amount_in, U256::from(PRICE)]));
        self.token
            .expect_balance_of()
            .times(1)
            .returning(move |_| Ok(balance));
        self.vesting
            .expect_claimable_amount()
            .times(1)
            .returning(|_| Ok(ether(100)));
        self.vesting
            .expect_schedule()
            .times(1)
            .returning(|_| Ok(schedule()));
        self.sale
            .expect_current_round()
            .times(1)
            .returning(|| Ok(active_round()));
        self.sale.expect_owner().times(1).returning(move || Ok(owner));
        self
    }

    fn into_contracts(self) -> Contracts {
        Contracts {
            sale: Arc::new(self.sale),
            vesting: Arc::new(self.vesting),
            token: Arc::new(self.token),
            router: Arc::new(self.router),
        }
    }
}

fn dashboard(account: Address, contracts: Contracts) -> Dashboard {
    Dashboard::new(
        DashboardConfig::default(),
        AccountSession::new(Some(Arc::new(wallet_for(account)))),
        contracts,
    )
}

/// Holds the first call routed through it until released.
#[derive(Default)]
struct Gate {
    calls: AtomicUsize,
    started: Notify,
    release: Notify,
}

impl Gate {
    /// Returns the index of the call, after blocking if it is the gated one.
    async fn pass(&self, gated_call: usize) -> usize {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == gated_call {
            self.started.notify_one();
            self.release.notified().await;
        }
        call
    }
}

struct GatedToken {
    gate: Gate,
    gated_call: usize,
    balances: Vec<U256>,
}

#[async_trait]
impl TokenContract for GatedToken {
    fn address(&self) -> Address {
        Address::ZERO
    }

    async fn balance_of(&self, _account: Address) -> Result<U256, GatewayError> {
        let call = self.gate.pass(self.gated_call).await;
        Ok(self.balances[call.min(self.balances.len() - 1)])
    }
}

struct GatedVesting {
    gate: Gate,
}

#[async_trait]
impl VestingContract for GatedVesting {
    fn address(&self) -> Address {
        VESTING
    }

    async fn schedule(&self, _beneficiary: Address) -> Result<VestingSchedule, GatewayError> {
        Ok(schedule())
    }

    async fn claimable_amount(&self, _beneficiary: Address) -> Result<U256, GatewayError> {
        Ok(ether(100))
    }

    async fn claim(&self, _from: Address) -> Result<TransactionReceipt, GatewayError> {
        self.gate.pass(0).await;
        Ok(confirmed_receipt())
    }
}

/// Mocks answering any number of reads, for tests that swap one contract
/// for a fake.
fn unlimited_reads(owner: Address) -> Chain {
    let mut chain = Chain::new();
    chain
        .router
        .expect_amounts_out()
        .returning(|amount_in, _| Ok(vec![amount_in, U256::from(PRICE)]));
    chain
        .token
        .expect_balance_of()
        .returning(|_| Ok(ether(5)));
    chain
        .vesting
        .expect_claimable_amount()
        .returning(|_| Ok(ether(100)));
    chain.vesting.expect_schedule().returning(|_| Ok(schedule()));
    chain
        .sale
        .expect_current_round()
        .returning(|| Ok(active_round()));
    chain.sale.expect_owner().returning(move || Ok(owner));
    chain
}

mod connect {
    use super::*;

    #[tokio::test]
    async fn should_start_disconnected_without_reads() {
        let dashboard = dashboard(OWNER, Chain::new().into_contracts());

        let view = dashboard.view();

        assert_eq!(view, DashboardView::default());
        assert_eq!(view.state, ConnectionState::Disconnected);
        assert_eq!(dashboard.refresh().await, Err(ActionError::NotConnected));
    }

    #[tokio::test]
    async fn should_complete_refresh_after_connecting() {
        let chain = Chain::new().with_initial_reads(OWNER, ether(5));
        let dashboard = dashboard(OWNER, chain.into_contracts());
        let mut events = dashboard.subscribe();

        let account = dashboard.connect().await.unwrap();

        assert_eq!(account.address, OWNER);
        let view = dashboard.view();
        assert_eq!(view.state, ConnectionState::ConnectedComplete);
        assert_eq!(
            view.account,
            Some(Account {
                address: OWNER,
                is_owner: Some(true)
            })
        );
        assert_eq!(view.price, Some(U256::from(PRICE)));
        assert_eq!(view.balance, Some(ether(5)));
        assert_eq!(view.claimable, Some(ether(100)));
        assert_eq!(view.schedule, Some(schedule()));
        assert_eq!(view.round, Some(active_round()));
        assert_eq!(view.last_error, None);

        assert_eq!(
            events.try_recv().unwrap(),
            DashboardEvent::Connected(Account {
                address: OWNER,
                is_owner: None
            })
        );
        assert_eq!(events.try_recv().unwrap(), DashboardEvent::RefreshCompleted);
    }

    #[tokio::test]
    async fn should_return_to_disconnected_on_failure() {
        let mut wallet = MockWalletProvider::new();
        wallet.expect_request().returning(|_, _| {
            Err(crate::wallet::ProviderError::JsonRpc {
                code: 4001,
                message: "User rejected the request.".to_string(),
            })
        });
        let dashboard = Dashboard::new(
            DashboardConfig::default(),
            AccountSession::new(Some(Arc::new(wallet))),
            Chain::new().into_contracts(),
        );
        let mut events = dashboard.subscribe();

        assert!(dashboard.connect().await.is_err());

        let view = dashboard.view();
        assert_eq!(view.state, ConnectionState::Disconnected);
        assert_eq!(view.account, None);
        assert_matches!(view.last_error, Some(error) if error.contains("rejected"));
        assert_matches!(events.try_recv(), Ok(DashboardEvent::ConnectFailed(_)));
    }

    #[tokio::test]
    async fn should_drop_previous_account_when_reconnect_is_rejected() {
        let mut chain = Chain::new().with_initial_reads(BUYER, ether(5));
        chain.vesting.expect_claim().never();
        let mut wallet = MockWalletProvider::new();
        wallet
            .expect_request()
            .times(1)
            .returning(|_, _| Ok(json!([BUYER])));
        wallet.expect_request().times(1).returning(|_, _| {
            Err(crate::wallet::ProviderError::JsonRpc {
                code: 4001,
                message: "User rejected the request.".to_string(),
            })
        });
        let dashboard = Dashboard::new(
            DashboardConfig::default(),
            AccountSession::new(Some(Arc::new(wallet))),
            chain.into_contracts(),
        );
        dashboard.connect().await.unwrap();
        assert_eq!(dashboard.view().state, ConnectionState::ConnectedComplete);

        assert!(dashboard.connect().await.is_err());

        let view = dashboard.view();
        assert_eq!(view.state, ConnectionState::Disconnected);
        assert_eq!(view.account, None);
        assert_eq!(view.available_actions(), vec![]);
        assert_eq!(dashboard.claim().await, Err(ActionError::NotConnected));
        assert_eq!(dashboard.refresh().await, Err(ActionError::NotConnected));
        assert_eq!(dashboard.view().state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn should_fail_without_wallet() {
        let dashboard = Dashboard::new(
            DashboardConfig::default(),
            AccountSession::new(None),
            Chain::new().into_contracts(),
        );

        assert!(dashboard.connect().await.is_err());
        assert_eq!(dashboard.view().state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn should_clear_fields_on_disconnect() {
        let chain = Chain::new().with_initial_reads(OWNER, ether(5));
        let dashboard = dashboard(OWNER, chain.into_contracts());
        dashboard.connect().await.unwrap();

        dashboard.disconnect();

        let view = dashboard.view();
        assert_eq!(view.state, ConnectionState::Disconnected);
        assert_eq!(view.account, None);
        assert_eq!(view.balance, None);
        assert_eq!(view.round, None);
        assert_eq!(view.available_actions(), vec![]);
    }

    #[tokio::test]
    async fn should_rederive_role_on_every_connect() {
        let mut chain = Chain::new().with_initial_reads(OWNER, ether(5));
        chain
            .router
            .expect_amounts_out()
            .returning(|amount_in, _| Ok(vec![amount_in, U256::from(PRICE)]));
        chain.token.expect_balance_of().returning(|_| Ok(ether(5)));
        chain
            .vesting
            .expect_claimable_amount()
            .returning(|_| Ok(ether(100)));
        chain.vesting.expect_schedule().returning(|_| Ok(schedule()));
        chain
            .sale
            .expect_current_round()
            .returning(|| Ok(active_round()));
        // Ownership was transferred between the two connects.
        chain.sale.expect_owner().returning(|| Ok(BUYER));
        let dashboard = dashboard(OWNER, chain.into_contracts());

        dashboard.connect().await.unwrap();
        assert!(dashboard.view().admin_actions_available());

        dashboard.connect().await.unwrap();
        assert!(!dashboard.view().admin_actions_available());
        assert_eq!(dashboard.view().account.unwrap().is_owner, Some(false));
    }
}

mod refresh {
    use super::*;

    #[tokio::test]
    async fn should_not_block_other_fields_on_failed_price() {
        let mut chain = Chain::new();
        chain
            .router
            .expect_amounts_out()
            .returning(|_, _| Err(transport_error()));
        chain.token.expect_balance_of().returning(|_| Ok(ether(5)));
        chain
            .vesting
            .expect_claimable_amount()
            .returning(|_| Ok(ether(100)));
        chain.vesting.expect_schedule().returning(|_| Ok(schedule()));
        chain
            .sale
            .expect_current_round()
            .returning(|| Ok(active_round()));
        chain.sale.expect_owner().returning(|| Ok(OWNER));
        let dashboard = dashboard(OWNER, chain.into_contracts());

        dashboard.connect().await.unwrap();

        let view = dashboard.view();
        assert_eq!(view.state, ConnectionState::ConnectedComplete);
        assert_eq!(view.price, None);
        assert_eq!(view.balance, Some(ether(5)));
        assert_eq!(view.claimable, Some(ether(100)));
    }

    #[tokio::test]
    async fn should_quote_one_whole_token_along_price_path() {
        let config = DashboardConfig::default();
        let path = config.contracts.price_path();
        let mut chain = unlimited_reads(OWNER);
        chain.router = MockRouterContract::new();
        chain
            .router
            .expect_amounts_out()
            .with(eq(one_token(18)), eq(path))
            .returning(|_, _| Ok(vec![one_token(18), U256::from(3_u8), U256::from(PRICE)]));
        let dashboard = dashboard(OWNER, chain.into_contracts());

        dashboard.connect().await.unwrap();

        assert_eq!(dashboard.view().price, Some(U256::from(PRICE)));
    }

    #[tokio::test]
    async fn should_treat_empty_quote_as_unknown_price() {
        let mut chain = unlimited_reads(OWNER);
        chain.router = MockRouterContract::new();
        chain.router.expect_amounts_out().returning(|_, _| Ok(vec![]));
        let dashboard = dashboard(OWNER, chain.into_contracts());

        dashboard.connect().await.unwrap();

        assert_eq!(dashboard.view().price, None);
    }

    #[tokio::test]
    async fn should_clear_field_when_newer_read_fails() {
        let mut chain = Chain::new().with_initial_reads(OWNER, ether(5));
        chain
            .router
            .expect_amounts_out()
            .returning(|amount_in, _| Ok(vec![amount_in, U256::from(PRICE)]));
        chain
            .token
            .expect_balance_of()
            .returning(|_| Err(transport_error()));
        chain
            .vesting
            .expect_claimable_amount()
            .returning(|_| Ok(ether(100)));
        chain.vesting.expect_schedule().returning(|_| Ok(schedule()));
        chain
            .sale
            .expect_current_round()
            .returning(|| Ok(active_round()));
        chain.sale.expect_owner().returning(|| Ok(OWNER));
        let dashboard = dashboard(OWNER, chain.into_contracts());
        dashboard.connect().await.unwrap();
        assert_eq!(dashboard.view().balance, Some(ether(5)));

        dashboard.refresh().await.unwrap();

        assert_eq!(dashboard.view().balance, None);
        assert_eq!(dashboard.view().claimable, Some(ether(100)));
    }

    #[tokio::test]
    async fn should_discard_superseded_result() {
        let token = Arc::new(GatedToken {
            gate: Gate::default(),
            gated_call: 1,
            balances: vec![ether(5), ether(1), ether(7)],
        });
        let mut contracts = unlimited_reads(OWNER).into_contracts();
        contracts.token = token.clone();
        let dashboard = dashboard(OWNER, contracts);
        dashboard.connect().await.unwrap();

        let (first, second) = futures::join!(dashboard.refresh(), async {
            token.gate.started.notified().await;
            let result = dashboard.refresh().await;
            assert_eq!(dashboard.view().balance, Some(ether(7)));
            token.gate.release.notify_one();
            result
        });

        assert_eq!(first, Ok(()));
        assert_eq!(second, Ok(()));
        assert_eq!(dashboard.view().balance, Some(ether(7)));
    }

    #[tokio::test]
    async fn should_discard_reads_started_before_disconnect() {
        let token = Arc::new(GatedToken {
            gate: Gate::default(),
            gated_call: 1,
            balances: vec![ether(5), ether(6)],
        });
        let mut contracts = unlimited_reads(OWNER).into_contracts();
        contracts.token = token.clone();
        let dashboard = dashboard(OWNER, contracts);
        dashboard.connect().await.unwrap();

        let (result, ()) = futures::join!(dashboard.refresh(), async {
            token.gate.started.notified().await;
            dashboard.disconnect();
            token.gate.release.notify_one();
        });

        assert_eq!(result, Ok(()));
        let view = dashboard.view();
        assert_eq!(view.state, ConnectionState::Disconnected);
        assert_eq!(view.account, None);
        assert_eq!(view.balance, None);
        assert_eq!(view.price, None);
    }
}

mod actions {
    use super::*;

    #[test]
    fn should_refetch_affected_fields() {
        assert_eq!(
            RefreshPolicy::fields_after(ActionKind::Buy),
            &[Field::Balance, Field::Round]
        );
        assert_eq!(
            RefreshPolicy::fields_after(ActionKind::Claim),
            &[Field::Balance, Field::Claimable, Field::Schedule]
        );
        for kind in [
            ActionKind::ConfigureRound,
            ActionKind::ActivateRound,
            ActionKind::UpdateRate,
            ActionKind::ToggleSale,
        ] {
            assert_eq!(RefreshPolicy::fields_after(kind), &[Field::Round]);
        }
        assert_eq!(
            RefreshPolicy::fields_after(ActionKind::WithdrawUnsoldTokens),
            &[Field::Round, Field::Balance]
        );
    }

    #[tokio::test]
    async fn should_refetch_balance_once_after_buy() {
        let mut chain = Chain::new().with_initial_reads(BUYER, ether(5));
        let mut seq = Sequence::new();
        chain
            .sale
            .expect_buy_tokens()
            .with(eq(BUYER), eq(ether(1) / U256::from(10_u8)))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(confirmed_receipt()));
        chain
            .token
            .expect_balance_of()
            .with(eq(BUYER))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ether(105)));
        chain
            .sale
            .expect_current_round()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| {
                Ok(crate::sale::SaleRound {
                    raised: ether(100) + ether(1) / U256::from(10_u8),
                    ..active_round()
                })
            });
        let dashboard = dashboard(BUYER, chain.into_contracts());
        dashboard.connect().await.unwrap();
        let balance_before = dashboard.view().balance.unwrap();
        let mut events = dashboard.subscribe();

        let receipt = dashboard.buy("0.1").await.unwrap();

        assert_eq!(receipt.transaction_hash, TX_HASH);
        let balance_after = dashboard.view().balance.unwrap();
        assert!(balance_after >= balance_before);
        assert_eq!(
            events.try_recv().unwrap(),
            DashboardEvent::ActionConfirmed {
                kind: ActionKind::Buy,
                transaction_hash: TX_HASH
            }
        );
        assert_eq!(dashboard.view().pending_action, None);
    }

    #[tokio::test]
    async fn should_reject_invalid_amount_before_network_call() {
        let mut chain = Chain::new().with_initial_reads(BUYER, ether(5));
        chain.sale.expect_buy_tokens().never();
        let dashboard = dashboard(BUYER, chain.into_contracts());
        dashboard.connect().await.unwrap();

        for amount in ["abc", "-1", "-0.5", "", "1e3"] {
            assert_matches!(
                dashboard.buy(amount).await,
                Err(ActionError::Validation(_)),
                "amount {amount:?} should be rejected"
            );
        }
        assert!(dashboard.view().last_error.is_some());
    }

    #[tokio::test]
    async fn should_not_buy_while_round_unknown() {
        let mut chain = unlimited_reads(BUYER);
        chain.sale = MockSaleContract::new();
        chain.sale.expect_address().return_const(SALE);
        chain
            .sale
            .expect_current_round()
            .returning(|| Err(transport_error()));
        chain.sale.expect_owner().returning(|| Ok(OWNER));
        chain.sale.expect_buy_tokens().never();
        let dashboard = dashboard(BUYER, chain.into_contracts());
        dashboard.connect().await.unwrap();

        assert_eq!(dashboard.view().round, None);
        assert!(!dashboard.view().purchase_permitted());
        assert_eq!(
            dashboard.buy("1").await,
            Err(ActionError::PurchaseNotPermitted)
        );
    }

    #[tokio::test]
    async fn should_refetch_balance_then_claimable_then_schedule_after_claim() {
        let mut chain = Chain::new().with_initial_reads(BUYER, ether(5));
        let mut seq = Sequence::new();
        chain
            .vesting
            .expect_claim()
            .with(eq(BUYER))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(confirmed_receipt()));
        chain
            .token
            .expect_balance_of()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ether(105)));
        chain
            .vesting
            .expect_claimable_amount()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(U256::ZERO));
        chain
            .vesting
            .expect_schedule()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| {
                Ok(VestingSchedule {
                    released_amount: ether(350),
                    ..schedule()
                })
            });
        let dashboard = dashboard(BUYER, chain.into_contracts());
        dashboard.connect().await.unwrap();
        let before = dashboard.view().schedule.unwrap();

        dashboard.claim().await.unwrap();

        let view = dashboard.view();
        let after = view.schedule.unwrap();
        assert!(after.released_amount >= before.released_amount);
        assert!(view.claimable.unwrap() <= after.total_amount - after.released_amount);
        assert_eq!(view.balance, Some(ether(105)));
    }

    #[tokio::test]
    async fn should_reject_second_claim_while_first_pending() {
        let vesting = Arc::new(GatedVesting {
            gate: Gate::default(),
        });
        let mut contracts = unlimited_reads(BUYER).into_contracts();
        contracts.vesting = vesting.clone();
        let dashboard = dashboard(BUYER, contracts);
        dashboard.connect().await.unwrap();

        let (first, second) = futures::join!(dashboard.claim(), async {
            vesting.gate.started.notified().await;
            assert_eq!(dashboard.view().pending_action, Some(ActionKind::Claim));
            let second = dashboard.claim().await;
            vesting.gate.release.notify_one();
            second
        });

        assert_eq!(first, Ok(confirmed_receipt()));
        assert_eq!(second, Err(ActionError::PendingAction(ActionKind::Claim)));
        assert_eq!(dashboard.view().pending_action, None);
        assert_eq!(dashboard.claim().await, Ok(confirmed_receipt()));
    }

    #[tokio::test]
    async fn should_surface_rejected_write_without_refresh() {
        let mut chain = Chain::new().with_initial_reads(BUYER, ether(5));
        chain
            .vesting
            .expect_claim()
            .times(1)
            .returning(|_| Err(GatewayError::TransactionRejected));
        let dashboard = dashboard(BUYER, chain.into_contracts());
        dashboard.connect().await.unwrap();
        let mut events = dashboard.subscribe();

        assert_eq!(
            dashboard.claim().await,
            Err(ActionError::Gateway(GatewayError::TransactionRejected))
        );

        assert_eq!(
            dashboard.view().last_error,
            Some("transaction was rejected in the wallet".to_string())
        );
        assert_eq!(
            events.try_recv().unwrap(),
            DashboardEvent::ActionFailed {
                kind: ActionKind::Claim,
                error: "transaction was rejected in the wallet".to_string()
            }
        );
    }

    #[tokio::test]
    async fn should_require_connected_account() {
        let mut chain = Chain::new();
        chain.vesting.expect_claim().never();
        let dashboard = dashboard(BUYER, chain.into_contracts());

        assert_eq!(dashboard.claim().await, Err(ActionError::NotConnected));
    }
}

mod admin {
    use super::*;

    #[tokio::test]
    async fn should_offer_admin_actions_to_owner_only() {
        let owner_dashboard = dashboard(OWNER, unlimited_reads(OWNER).into_contracts());
        let buyer_dashboard = dashboard(BUYER, unlimited_reads(OWNER).into_contracts());

        owner_dashboard.connect().await.unwrap();
        buyer_dashboard.connect().await.unwrap();

        assert!(owner_dashboard.view().admin_actions_available());
        assert!(owner_dashboard
            .view()
            .available_actions()
            .contains(&ActionKind::ToggleSale));
        assert!(!buyer_dashboard.view().admin_actions_available());
        assert_eq!(
            buyer_dashboard.view().available_actions(),
            vec![ActionKind::Buy, ActionKind::Claim]
        );
    }

    #[tokio::test]
    async fn should_reject_admin_action_from_non_owner_without_network_call() {
        let mut chain = unlimited_reads(OWNER);
        chain.sale.expect_toggle_sale().never();
        chain.sale.expect_withdraw_unsold_tokens().never();
        chain.sale.expect_update_rate().never();
        let dashboard = dashboard(BUYER, chain.into_contracts());
        dashboard.connect().await.unwrap();

        assert_eq!(dashboard.toggle_sale().await, Err(ActionError::NotOwner));
        assert_eq!(
            dashboard.withdraw_unsold_tokens().await,
            Err(ActionError::NotOwner)
        );
        assert_eq!(dashboard.update_rate("5").await, Err(ActionError::NotOwner));
    }

    #[tokio::test]
    async fn should_reject_admin_action_while_role_unknown() {
        let mut chain = unlimited_reads(OWNER);
        chain.sale = MockSaleContract::new();
        chain.sale.expect_address().return_const(SALE);
        chain
            .sale
            .expect_current_round()
            .returning(|| Ok(active_round()));
        chain.sale.expect_owner().returning(|| Err(transport_error()));
        chain.sale.expect_toggle_sale().never();
        let dashboard = dashboard(OWNER, chain.into_contracts());
        dashboard.connect().await.unwrap();

        assert_eq!(dashboard.view().account.unwrap().is_owner, None);
        assert_eq!(dashboard.toggle_sale().await, Err(ActionError::NotOwner));
    }

    #[tokio::test]
    async fn should_refetch_round_after_toggle() {
        let mut chain = Chain::new().with_initial_reads(OWNER, ether(5));
        let mut seq = Sequence::new();
        chain
            .sale
            .expect_toggle_sale()
            .with(eq(OWNER))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(confirmed_receipt()));
        chain
            .sale
            .expect_current_round()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| {
                Ok(crate::sale::SaleRound {
                    active: false,
                    ..active_round()
                })
            });
        let dashboard = dashboard(OWNER, chain.into_contracts());
        dashboard.connect().await.unwrap();
        assert!(dashboard.view().purchase_permitted());

        dashboard.toggle_sale().await.unwrap();

        assert!(!dashboard.view().purchase_permitted());
        assert_eq!(dashboard.view().balance, Some(ether(5)));
    }

    #[tokio::test]
    async fn should_validate_rate_before_network_call() {
        let mut chain = unlimited_reads(OWNER);
        chain.sale.expect_update_rate().never();
        chain.sale.expect_activate_round().never();
        let dashboard = dashboard(OWNER, chain.into_contracts());
        dashboard.connect().await.unwrap();

        assert_matches!(
            dashboard.update_rate("-3").await,
            Err(ActionError::Validation(_))
        );
        assert_matches!(
            dashboard.activate_round("first").await,
            Err(ActionError::Validation(_))
        );
    }

    #[tokio::test]
    async fn should_refetch_round_and_balance_after_withdrawal() {
        let mut chain = Chain::new().with_initial_reads(OWNER, ether(5));
        let mut seq = Sequence::new();
        chain
            .sale
            .expect_withdraw_unsold_tokens()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(confirmed_receipt()));
        chain
            .sale
            .expect_current_round()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(active_round()));
        chain
            .token
            .expect_balance_of()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(ether(905)));
        let dashboard = dashboard(OWNER, chain.into_contracts());
        dashboard.connect().await.unwrap();

        dashboard.withdraw_unsold_tokens().await.unwrap();

        assert_eq!(dashboard.view().balance, Some(ether(905)));
    }
}

mod template {
    use super::*;

    #[test]
    fn should_render_unknown_fields_as_placeholder() {
        let view = DashboardView {
            state: ConnectionState::ConnectedPartial,
            account: Some(Account {
                address: BUYER,
                is_owner: None,
            }),
            ..DashboardView::default()
        };

        let rendered = DashboardTemplate::from_view(&view, &DashboardConfig::default())
            .render()
            .unwrap();

        assert!(rendered.contains("Token sale dashboard [ConnectedPartial]"));
        assert!(rendered.contains("Price:       ... USDC per IHRAM"));
        assert!(rendered.contains("Balance:     ... IHRAM"));
        assert!(rendered.contains("Claimable:   ... IHRAM"));
        assert!(!rendered.contains(" 0 "));
    }

    #[test]
    fn should_render_known_fields() {
        let view = DashboardView {
            state: ConnectionState::ConnectedComplete,
            account: Some(Account {
                address: OWNER,
                is_owner: Some(true),
            }),
            price: Some(one_token(18) + one_token(18) / U256::from(4_u8)),
            balance: Some(ether(1) + ether(1) / U256::from(2_u8)),
            claimable: Some(U256::ZERO),
            schedule: Some(schedule()),
            round: Some(active_round()),
            pending_action: Some(ActionKind::Claim),
            last_error: Some("transaction was rejected in the wallet".to_string()),
        };

        let rendered = DashboardTemplate::from_view(&view, &DashboardConfig::default())
            .render()
            .unwrap();

        assert!(rendered.contains("(owner)"));
        assert!(rendered.contains("Price:       1.25 USDC per IHRAM"));
        assert!(rendered.contains("Balance:     1.5 IHRAM"));
        assert!(rendered.contains("Claimable:   0 IHRAM"));
        assert!(rendered.contains("Released:    250 IHRAM"));
        assert!(rendered.contains("Start:       2023-11-14T22:13:20+00:00"));
        assert!(rendered.contains("Cliff end:   2023-12-14T22:13:20+00:00"));
        assert!(rendered.contains("Vesting end: 2024-11-13T22:13:20+00:00"));
        assert!(rendered.contains("Round:       1 (active)"));
        assert!(rendered.contains("Raised:      100 / 1000 ETH"));
        assert!(rendered.contains("Remaining:   900 ETH"));
        assert!(rendered.contains("  - toggle_sale"));
        assert!(rendered.contains("Pending:     claim"));
        assert!(rendered.contains("Last error:  transaction was rejected in the wallet"));
    }

    #[test]
    fn should_render_unrepresentable_dates_as_unknown() {
        let view = DashboardView {
            state: ConnectionState::ConnectedComplete,
            schedule: Some(VestingSchedule {
                start_time: u64::MAX,
                ..schedule()
            }),
            ..DashboardView::default()
        };

        let rendered = DashboardTemplate::from_view(&view, &DashboardConfig::default())
            .render()
            .unwrap();

        assert!(rendered.contains("Start:       ...\n"));
        assert!(rendered.contains("Cliff end:   ...\n"));
        assert!(rendered.contains("Vesting end: ...\n"));
        assert!(rendered.contains("Released:    250 IHRAM"));
    }
}
