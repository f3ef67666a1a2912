use crate::eth_rpc::{TransactionReceipt, TransactionStatus};
use crate::sale::SaleRound;
use crate::vesting::VestingSchedule;
use alloy_primitives::{address, b256, Address, B256, U256, U64};

pub const SALE: Address = address!("dB2D5EaC33846FC5Cf85C3c597C723079C0eB68D");
pub const VESTING: Address = address!("c126489BA66D7b0Dc06F5a4962778e25d2912Ba4");
pub const OWNER: Address = address!("1789f79e95324a47c5fd6693071188e82e9a3558");
pub const BUYER: Address = address!("b44b5e756a894775fc32eddf3314bb1b1944dc34");
pub const TX_HASH: B256 =
    b256!("0e59bd032b9b22aca5e2784e4cf114783512db00988c716cf17a1cc755a0a93d");

pub fn ether(amount: u64) -> U256 {
    U256::from(amount) * U256::from(1_000_000_000_000_000_000_u128)
}

pub fn confirmed_receipt() -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: TX_HASH,
        block_number: U64::from(4_272_876_u64),
        gas_used: U256::from(21_000_u64),
        status: TransactionStatus::Success,
    }
}

pub fn active_round() -> SaleRound {
    SaleRound {
        round_id: U256::from(1_u8),
        active: true,
        rate: U256::from(1_000_u64),
        min_contribution: ether(1) / U256::from(100_u8),
        max_contribution: ether(10),
        cap: ether(1_000),
        raised: ether(100),
        vesting_address: VESTING,
    }
}

pub fn schedule() -> VestingSchedule {
    VestingSchedule {
        total_amount: ether(1_000),
        released_amount: ether(250),
        start_time: 1_700_000_000,
        cliff_duration: 30 * 24 * 3600,
        vesting_duration: 365 * 24 * 3600,
    }
}
