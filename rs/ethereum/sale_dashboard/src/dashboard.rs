//! The dashboard aggregator: owns the view model, keeps it consistent with
//! on-chain state and routes user actions to the contracts.

#[cfg(test)]
mod tests;

pub mod template;
pub mod view;

use crate::config::DashboardConfig;
use crate::contracts::Contracts;
use crate::eth_rpc::TransactionReceipt;
use crate::gateway::{GatewayError, RpcError};
use crate::guard::{ActionKind, ActionLock};
use crate::numeric::one_token;
use crate::sale::{self, RoundParams, SaleError};
use crate::session::{Account, AccountSession, SessionError};
use crate::validation::{parse_base_amount, parse_non_negative_integer, ValidationError};
use crate::vesting;
use alloy_primitives::{Address, B256, U256};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::future::Future;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

pub use view::{ConnectionState, DashboardView, Field};

const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),
    #[error("no account is connected")]
    NotConnected,
    #[error("only the owner of the sale contract can do this")]
    NotOwner,
    #[error("no active sale round")]
    PurchaseNotPermitted,
    #[error("{0} is already pending")]
    PendingAction(ActionKind),
    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl From<SaleError> for ActionError {
    fn from(error: SaleError) -> Self {
        match error {
            SaleError::Validation(e) => ActionError::Validation(e),
            SaleError::Gateway(e) => ActionError::Gateway(e),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DashboardEvent {
    Connected(Account),
    ConnectFailed(String),
    Disconnected,
    RefreshCompleted,
    ActionConfirmed {
        kind: ActionKind,
        transaction_hash: B256,
    },
    ActionFailed {
        kind: ActionKind,
        error: String,
    },
}

/// Fields to refetch once an action is confirmed, in the order they are
/// refetched.
pub struct RefreshPolicy;

impl RefreshPolicy {
    pub fn fields_after(kind: ActionKind) -> &'static [Field] {
        match kind {
            ActionKind::Buy => &[Field::Balance, Field::Round],
            ActionKind::Claim => &[Field::Balance, Field::Claimable, Field::Schedule],
            ActionKind::ConfigureRound
            | ActionKind::ActivateRound
            | ActionKind::UpdateRate
            | ActionKind::ToggleSale => &[Field::Round],
            ActionKind::WithdrawUnsoldTokens => &[Field::Round, Field::Balance],
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct Generation {
    requested: u64,
    applied: u64,
}

/// Identifies one read of one field.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct Ticket {
    field: Field,
    epoch: u64,
    generation: u64,
}

#[derive(Default)]
struct Model {
    view: DashboardView,
    /// Bumped on connect and disconnect: every ticket issued before is stale.
    epoch: u64,
    generations: BTreeMap<Field, Generation>,
}

impl Model {
    fn issue(&mut self, field: Field, epoch: u64) -> Ticket {
        let generation = self.generations.entry(field).or_default();
        generation.requested += 1;
        Ticket {
            field,
            epoch,
            generation: generation.requested,
        }
    }

    /// Records `ticket` as applied if it is newer than anything applied so
    /// far for its field in the current epoch.
    fn accept(&mut self, ticket: Ticket) -> bool {
        if ticket.epoch != self.epoch {
            return false;
        }
        let generation = self.generations.entry(ticket.field).or_default();
        if ticket.generation <= generation.applied {
            return false;
        }
        generation.applied = ticket.generation;
        true
    }

    fn reset(&mut self, state: ConnectionState) {
        self.epoch += 1;
        self.view = DashboardView {
            state,
            last_error: self.view.last_error.take(),
            ..DashboardView::default()
        };
    }
}

pub struct Dashboard {
    config: DashboardConfig,
    session: AccountSession,
    contracts: Contracts,
    actions: ActionLock,
    model: RwLock<Model>,
    events: broadcast::Sender<DashboardEvent>,
}

impl Dashboard {
    pub fn new(config: DashboardConfig, session: AccountSession, contracts: Contracts) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            config,
            session,
            contracts,
            actions: ActionLock::new(),
            model: RwLock::new(Model::default()),
            events,
        }
    }

    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DashboardEvent> {
        self.events.subscribe()
    }

    pub fn view(&self) -> DashboardView {
        let mut view = self.model.read().view.clone();
        view.account = self.session.account();
        view.pending_action = self.actions.pending();
        view
    }

    fn emit(&self, event: DashboardEvent) {
        // No subscriber is fine.
        let _ = self.events.send(event);
    }

    /// Connects the wallet's account and runs a full refresh for it.
    pub async fn connect(&self) -> Result<Account, SessionError> {
        {
            let mut model = self.model.write();
            model.reset(ConnectionState::Connecting);
            model.view.last_error = None;
        }
        match self.session.connect().await {
            Ok(account) => {
                self.model.write().reset(ConnectionState::ConnectedPartial);
                self.emit(DashboardEvent::Connected(account.clone()));
                if let Err(e) = self.refresh().await {
                    warn!("Refresh after connecting {} did not run: {e}", account.address);
                }
                Ok(account)
            }
            Err(e) => {
                warn!("Failed to connect wallet: {e}");
                {
                    let mut model = self.model.write();
                    model.reset(ConnectionState::Disconnected);
                    model.view.last_error = Some(e.to_string());
                }
                self.emit(DashboardEvent::ConnectFailed(e.to_string()));
                Err(e)
            }
        }
    }

    pub fn disconnect(&self) {
        self.session.disconnect();
        self.model.write().reset(ConnectionState::Disconnected);
        self.emit(DashboardEvent::Disconnected);
    }

    /// Re-reads every field and the account's role concurrently. A failed
    /// read leaves its field unknown without affecting the others.
    pub async fn refresh(&self) -> Result<(), ActionError> {
        let address = self
            .connected_account()
            .ok_or(ActionError::NotConnected)?
            .address;
        let epoch = self.model.read().epoch;
        futures::join!(
            self.refresh_field(Field::Price, address, epoch),
            self.refresh_field(Field::Balance, address, epoch),
            self.refresh_field(Field::Claimable, address, epoch),
            self.refresh_field(Field::Schedule, address, epoch),
            self.refresh_field(Field::Round, address, epoch),
            self.refresh_ownership(),
        );
        self.check_vesting_consistency(address);
        {
            let mut model = self.model.write();
            if model.epoch != epoch {
                debug!("Session changed during refresh for {address}");
                return Ok(());
            }
            model.view.state = ConnectionState::ConnectedComplete;
        }
        self.emit(DashboardEvent::RefreshCompleted);
        Ok(())
    }

    /// The session's account, as long as the dashboard is in a connected
    /// state.
    fn connected_account(&self) -> Option<Account> {
        if !self.model.read().view.state.is_connected() {
            return None;
        }
        self.session.account()
    }

    async fn refresh_ownership(&self) {
        if let Err(e) = self.session.refresh_ownership(&*self.contracts.sale).await {
            warn!("Failed to check ownership of the sale contract: {e}");
        }
    }

    async fn refresh_field(&self, field: Field, address: Address, epoch: u64) {
        let ticket = self.model.write().issue(field, epoch);
        match field {
            Field::Price => {
                let result = self.fetch_price().await;
                self.apply(ticket, result, |view| &mut view.price);
            }
            Field::Balance => {
                let result = self.contracts.token.balance_of(address).await;
                self.apply(ticket, result, |view| &mut view.balance);
            }
            Field::Claimable => {
                let result = vesting::fetch_claimable(&*self.contracts.vesting, address).await;
                self.apply(ticket, result, |view| &mut view.claimable);
            }
            Field::Schedule => {
                let result = vesting::fetch_schedule(&*self.contracts.vesting, address).await;
                self.apply(ticket, result, |view| &mut view.schedule);
            }
            Field::Round => {
                let result = sale::fetch_current_round(&*self.contracts.sale).await;
                self.apply(ticket, result, |view| &mut view.round);
            }
        }
    }

    async fn fetch_price(&self) -> Result<U256, GatewayError> {
        let amounts = self
            .contracts
            .router
            .amounts_out(
                one_token(self.config.token_decimals),
                self.config.contracts.price_path(),
            )
            .await?;
        amounts.last().copied().ok_or_else(|| {
            GatewayError::Rpc(RpcError::InvalidResponse(
                "getAmountsOut returned no amounts".to_string(),
            ))
        })
    }

    fn apply<T>(
        &self,
        ticket: Ticket,
        result: Result<T, GatewayError>,
        slot: impl FnOnce(&mut DashboardView) -> &mut Option<T>,
    ) {
        let mut model = self.model.write();
        if !model.accept(ticket) {
            debug!(
                "Discarding superseded {} result (generation {})",
                ticket.field, ticket.generation
            );
            return;
        }
        *slot(&mut model.view) = match result {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Failed to fetch {}: {e}", ticket.field);
                None
            }
        };
    }

    fn check_vesting_consistency(&self, address: Address) {
        let model = self.model.read();
        if let Some(schedule) = &model.view.schedule {
            vesting::report_anomalies(address, schedule, model.view.claimable);
        }
    }

    /// Buys tokens for `amount` units of the base currency.
    pub async fn buy(&self, amount: &str) -> Result<TransactionReceipt, ActionError> {
        let kind = ActionKind::Buy;
        if let Err(e) = parse_base_amount(amount) {
            return Err(self.fail(kind, e.into()));
        }
        if !sale::purchase_permitted(self.model.read().view.round.as_ref()) {
            return Err(self.fail(kind, ActionError::PurchaseNotPermitted));
        }
        self.submit(kind, |from| async move {
            sale::buy(&*self.contracts.sale, from, amount)
                .await
                .map_err(ActionError::from)
        })
        .await
    }

    pub async fn claim(&self) -> Result<TransactionReceipt, ActionError> {
        self.submit(ActionKind::Claim, |from| async move {
            vesting::claim(&*self.contracts.vesting, from)
                .await
                .map_err(ActionError::from)
        })
        .await
    }

    pub async fn configure_round(
        &self,
        params: RoundParams,
    ) -> Result<TransactionReceipt, ActionError> {
        self.submit(ActionKind::ConfigureRound, |from| async move {
            sale::configure_round(&*self.contracts.sale, from, params)
                .await
                .map_err(ActionError::from)
        })
        .await
    }

    pub async fn activate_round(&self, round_id: &str) -> Result<TransactionReceipt, ActionError> {
        let kind = ActionKind::ActivateRound;
        if let Err(e) = parse_non_negative_integer("round id", round_id) {
            return Err(self.fail(kind, e.into()));
        }
        self.submit(kind, |from| async move {
            sale::activate_round(&*self.contracts.sale, from, round_id)
                .await
                .map_err(ActionError::from)
        })
        .await
    }

    pub async fn update_rate(&self, rate: &str) -> Result<TransactionReceipt, ActionError> {
        let kind = ActionKind::UpdateRate;
        if let Err(e) = parse_non_negative_integer("rate", rate) {
            return Err(self.fail(kind, e.into()));
        }
        self.submit(kind, |from| async move {
            sale::update_rate(&*self.contracts.sale, from, rate)
                .await
                .map_err(ActionError::from)
        })
        .await
    }

    pub async fn toggle_sale(&self) -> Result<TransactionReceipt, ActionError> {
        self.submit(ActionKind::ToggleSale, |from| async move {
            sale::toggle_sale(&*self.contracts.sale, from)
                .await
                .map_err(ActionError::from)
        })
        .await
    }

    pub async fn withdraw_unsold_tokens(&self) -> Result<TransactionReceipt, ActionError> {
        self.submit(ActionKind::WithdrawUnsoldTokens, |from| async move {
            sale::withdraw_unsold_tokens(&*self.contracts.sale, from)
                .await
                .map_err(ActionError::from)
        })
        .await
    }

    /// Runs a write for the connected account while holding the action lock,
    /// then refetches the fields the action affects.
    async fn submit<F, Fut>(&self, kind: ActionKind, write: F) -> Result<TransactionReceipt, ActionError>
    where
        F: FnOnce(Address) -> Fut,
        Fut: Future<Output = Result<TransactionReceipt, ActionError>>,
    {
        let account = match self.connected_account() {
            Some(account) => account,
            None => return Err(self.fail(kind, ActionError::NotConnected)),
        };
        if kind.requires_owner() && !account.is_known_owner() {
            return Err(self.fail(kind, ActionError::NotOwner));
        }
        let guard = match self.actions.try_acquire(kind) {
            Ok(guard) => guard,
            Err(e) => return Err(self.fail(kind, ActionError::PendingAction(e.pending))),
        };
        let epoch = self.model.read().epoch;

        let result = write(account.address).await;
        drop(guard);

        match result {
            Ok(receipt) => {
                info!(
                    "{kind} confirmed for {} in transaction {}",
                    account.address, receipt.transaction_hash
                );
                self.model.write().view.last_error = None;
                self.emit(DashboardEvent::ActionConfirmed {
                    kind,
                    transaction_hash: receipt.transaction_hash,
                });
                self.refresh_after(kind, account.address, epoch).await;
                Ok(receipt)
            }
            Err(e) => Err(self.fail(kind, e)),
        }
    }

    async fn refresh_after(&self, kind: ActionKind, address: Address, epoch: u64) {
        for field in RefreshPolicy::fields_after(kind) {
            self.refresh_field(*field, address, epoch).await;
        }
        if kind == ActionKind::Claim {
            self.check_vesting_consistency(address);
        }
    }

    fn fail(&self, kind: ActionKind, error: ActionError) -> ActionError {
        error!("{kind} failed: {error}");
        self.model.write().view.last_error = Some(error.to_string());
        self.emit(DashboardEvent::ActionFailed {
            kind,
            error: error.to_string(),
        });
        error
    }
}
