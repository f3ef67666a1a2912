//! Vesting schedule of the connected account and its claims.
//!
//! The claimable amount is always the one reported by
//! `getClaimableAmount`: it is never derived from the schedule, whose release
//! curve is a property of the contract.

use crate::contracts::VestingContract;
use crate::eth_rpc::TransactionReceipt;
use crate::gateway::GatewayError;
use alloy_primitives::{Address, U256};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};


/// The schedule returned by `schedules(beneficiary)`. Times are Unix seconds
/// and durations are in seconds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VestingSchedule {
    pub total_amount: U256,
    pub released_amount: U256,
    pub start_time: u64,
    pub cliff_duration: u64,
    pub vesting_duration: u64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScheduleAnomaly {
    ReleasedAboveTotal,
    ClaimableAboveRemaining,
}

impl VestingSchedule {
    /// Amount not released yet.
    pub fn remaining(&self) -> U256 {
        self.total_amount.saturating_sub(self.released_amount)
    }

    pub fn start(&self) -> Option<DateTime<Utc>> {
        timestamp(self.start_time)
    }

    pub fn cliff_end(&self) -> Option<DateTime<Utc>> {
        timestamp(self.start_time.checked_add(self.cliff_duration)?)
    }

    /// End of the vesting period. The cliff is part of the vesting duration.
    pub fn vesting_end(&self) -> Option<DateTime<Utc>> {
        timestamp(self.start_time.checked_add(self.vesting_duration)?)
    }

    /// Relations the Vesting contract is expected to maintain. `claimable`
    /// is only checked when known.
    pub fn anomalies(&self, claimable: Option<U256>) -> Vec<ScheduleAnomaly> {
        let mut anomalies = Vec::new();
        if self.released_amount > self.total_amount {
            anomalies.push(ScheduleAnomaly::ReleasedAboveTotal);
        }
        if claimable.is_some_and(|claimable| claimable > self.remaining()) {
            anomalies.push(ScheduleAnomaly::ClaimableAboveRemaining);
        }
        anomalies
    }
}

fn timestamp(seconds: u64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(i64::try_from(seconds).ok()?, 0)
}

/// Logs every anomaly of `schedule`. Values are reported as the contract
/// returned them.
pub fn report_anomalies(beneficiary: Address, schedule: &VestingSchedule, claimable: Option<U256>) {
    for anomaly in schedule.anomalies(claimable) {
        warn!(
            "Vesting contract reported an inconsistent schedule for {beneficiary}: {anomaly:?} \
            (total {}, released {}, claimable {claimable:?})",
            schedule.total_amount, schedule.released_amount
        );
    }
}

pub async fn fetch_schedule(
    vesting: &dyn VestingContract,
    beneficiary: Address,
) -> Result<VestingSchedule, GatewayError> {
    vesting.schedule(beneficiary).await
}

pub async fn fetch_claimable(
    vesting: &dyn VestingContract,
    beneficiary: Address,
) -> Result<U256, GatewayError> {
    vesting.claimable_amount(beneficiary).await
}

pub async fn claim(
    vesting: &dyn VestingContract,
    from: Address,
) -> Result<TransactionReceipt, GatewayError> {
    info!("Claiming vested tokens from {} for {from}", vesting.address());
    vesting.claim(from).await
}
