use crate::guard::ActionKind;
use crate::sale::{purchase_permitted, SaleRound};
use crate::session::Account;
use crate::vesting::VestingSchedule;
use alloy_primitives::U256;
use serde::Serialize;
use strum::IntoEnumIterator;
use strum_macros::Display;

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Display, Serialize)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    /// Connected but not every field was fetched yet.
    ConnectedPartial,
    /// The refresh sequence completed at least once since connecting.
    /// Individual fields may still be unknown if their read failed.
    ConnectedComplete,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(
            self,
            ConnectionState::ConnectedPartial | ConnectionState::ConnectedComplete
        )
    }
}

/// A field of the view model that is read from a contract.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Field {
    Price,
    Balance,
    Claimable,
    Schedule,
    Round,
}

/// Snapshot of everything the presentation layer shows. A `None` field is
/// unknown: either not fetched yet or its last read failed.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    pub state: ConnectionState,
    pub account: Option<Account>,
    /// Amount of quote token for one whole token.
    pub price: Option<U256>,
    pub balance: Option<U256>,
    pub claimable: Option<U256>,
    pub schedule: Option<VestingSchedule>,
    pub round: Option<SaleRound>,
    pub pending_action: Option<ActionKind>,
    pub last_error: Option<String>,
}

impl DashboardView {
    pub fn purchase_permitted(&self) -> bool {
        self.state.is_connected() && purchase_permitted(self.round.as_ref())
    }

    /// Admin actions are only offered when the account is known to own the
    /// Sale contract.
    pub fn admin_actions_available(&self) -> bool {
        self.account
            .as_ref()
            .is_some_and(|account| account.is_known_owner())
    }

    /// Actions currently offered to the user.
    pub fn available_actions(&self) -> Vec<ActionKind> {
        if !self.state.is_connected() {
            return vec![];
        }
        ActionKind::iter()
            .filter(|kind| match kind {
                ActionKind::Buy => self.purchase_permitted(),
                ActionKind::Claim => true,
                _ => self.admin_actions_available(),
            })
            .collect()
    }
}
