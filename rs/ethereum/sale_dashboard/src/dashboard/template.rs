use crate::config::DashboardConfig;
use crate::dashboard::view::{ConnectionState, DashboardView};
use crate::guard::ActionKind;
use crate::numeric::{format_amount, BASE_CURRENCY_DECIMALS};
use crate::UNKNOWN_PLACEHOLDER;
use alloy_primitives::U256;
use askama::Template;
use chrono::{DateTime, Utc};

pub struct DashboardSchedule {
    pub total: String,
    pub released: String,
    pub remaining: String,
    pub start: String,
    pub cliff_end: String,
    pub vesting_end: String,
}

pub struct DashboardRound {
    pub round_id: U256,
    pub active: bool,
    pub rate: U256,
    pub min_contribution: String,
    pub max_contribution: String,
    pub raised: String,
    pub cap: String,
    pub remaining: String,
}

#[derive(Template)]
#[template(path = "dashboard.txt")]
pub struct DashboardTemplate {
    pub state: ConnectionState,
    pub account: String,
    pub role: &'static str,
    pub token_symbol: String,
    pub quote_symbol: String,
    pub base_currency_symbol: String,
    pub price: String,
    pub balance: String,
    pub claimable: String,
    pub schedule: Option<DashboardSchedule>,
    pub round: Option<DashboardRound>,
    pub actions: Vec<ActionKind>,
    pub pending_action: Option<ActionKind>,
    pub last_error: Option<String>,
}

impl DashboardTemplate {
    pub fn from_view(view: &DashboardView, config: &DashboardConfig) -> Self {
        let token = |amount: Option<U256>| display_amount(amount, config.token_decimals);
        let base = |amount: U256| display_amount(Some(amount), BASE_CURRENCY_DECIMALS);
        Self {
            state: view.state,
            account: view
                .account
                .as_ref()
                .map(|account| account.address.to_string())
                .unwrap_or_else(|| "not connected".to_string()),
            role: match view.account.as_ref().map(|account| account.is_owner) {
                None => "",
                Some(None) => UNKNOWN_PLACEHOLDER,
                Some(Some(true)) => "owner",
                Some(Some(false)) => "participant",
            },
            token_symbol: config.token_symbol.clone(),
            quote_symbol: config.quote_symbol.clone(),
            base_currency_symbol: config.base_currency_symbol.clone(),
            price: display_amount(view.price, config.quote_decimals),
            balance: token(view.balance),
            claimable: token(view.claimable),
            schedule: view.schedule.as_ref().map(|schedule| DashboardSchedule {
                total: token(Some(schedule.total_amount)),
                released: token(Some(schedule.released_amount)),
                remaining: token(Some(schedule.remaining())),
                start: display_datetime(schedule.start()),
                cliff_end: display_datetime(schedule.cliff_end()),
                vesting_end: display_datetime(schedule.vesting_end()),
            }),
            round: view.round.as_ref().map(|round| DashboardRound {
                round_id: round.round_id,
                active: round.active,
                rate: round.rate,
                min_contribution: base(round.min_contribution),
                max_contribution: base(round.max_contribution),
                raised: base(round.raised),
                cap: base(round.cap),
                remaining: base(round.remaining()),
            }),
            actions: view.available_actions(),
            pending_action: view.pending_action,
            last_error: view.last_error.clone(),
        }
    }
}

/// Unknown amounts, and amounts that cannot be formatted, are shown as the
/// placeholder, never as zero.
fn display_amount(amount: Option<U256>, decimals: u8) -> String {
    amount
        .and_then(|amount| format_amount(amount, decimals).ok())
        .unwrap_or_else(|| UNKNOWN_PLACEHOLDER.to_string())
}

fn display_datetime(datetime: Option<DateTime<Utc>>) -> String {
    // 2020-12-09T17:25:40+00:00
    datetime
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S+00:00").to_string())
        .unwrap_or_else(|| UNKNOWN_PLACEHOLDER.to_string())
}
