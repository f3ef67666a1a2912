//! Typed capability interfaces for the four external contracts the dashboard
//! talks to, and their implementations on top of the [`ChainGateway`].

use crate::eth_rpc::TransactionReceipt;
use crate::gateway::{ChainGateway, GatewayError, RpcError};
use crate::sale::{RoundParams, SaleRound};
use crate::vesting::VestingSchedule;
use alloy_primitives::{Address, U256};
use alloy_sol_types::sol;
use async_trait::async_trait;
use mockall::automock;
use std::sync::Arc;


sol! {
    interface ITokenSale {
        function buyTokens() external payable;
        function configureRound(
            uint256 roundId,
            uint256 rate,
            uint256 minContribution,
            uint256 maxContribution,
            uint256 cap,
            address vestingAddress
        ) external;
        function activateRound(uint256 roundId) external;
        function updateRate(uint256 newRate) external;
        function toggleSale() external;
        function withdrawUnsoldTokens() external;
        function owner() external view returns (address);
        function getCurrentRound() external view returns (
            uint256 roundId,
            bool active,
            uint256 rate,
            uint256 minContribution,
            uint256 maxContribution,
            uint256 cap,
            uint256 raised,
            address vestingAddress
        );
    }

    interface IVesting {
        function claim() external;
        function getClaimableAmount(address beneficiary) external view returns (uint256);
        function schedules(address beneficiary) external view returns (
            uint256 totalAmount,
            uint256 releasedAmount,
            uint256 startTime,
            uint256 cliffDuration,
            uint256 vestingDuration
        );
    }

    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }

    interface IRouter {
        function getAmountsOut(uint256 amountIn, address[] calldata path)
            external
            view
            returns (uint256[] memory amounts);
    }
}

/// A trait defining the calls the dashboard makes on the Sale contract.
#[automock]
#[async_trait]
pub trait SaleContract: Send + Sync {
    fn address(&self) -> Address;

    async fn owner(&self) -> Result<Address, GatewayError>;

    async fn current_round(&self) -> Result<SaleRound, GatewayError>;

    /// Buys tokens for `value` units of the base currency.
    async fn buy_tokens(
        &self,
        from: Address,
        value: U256,
    ) -> Result<TransactionReceipt, GatewayError>;

    async fn configure_round(
        &self,
        from: Address,
        params: RoundParams,
    ) -> Result<TransactionReceipt, GatewayError>;

    async fn activate_round(
        &self,
        from: Address,
        round_id: U256,
    ) -> Result<TransactionReceipt, GatewayError>;

    async fn update_rate(&self, from: Address, rate: U256)
        -> Result<TransactionReceipt, GatewayError>;

    async fn toggle_sale(&self, from: Address) -> Result<TransactionReceipt, GatewayError>;

    async fn withdraw_unsold_tokens(
        &self,
        from: Address,
    ) -> Result<TransactionReceipt, GatewayError>;
}

/// A trait defining the calls the dashboard makes on the Vesting contract.
#[automock]
#[async_trait]
pub trait VestingContract: Send + Sync {
    fn address(&self) -> Address;

    async fn schedule(&self, beneficiary: Address) -> Result<VestingSchedule, GatewayError>;

    /// Amount the contract currently allows `beneficiary` to claim.
    async fn claimable_amount(&self, beneficiary: Address) -> Result<U256, GatewayError>;

    async fn claim(&self, from: Address) -> Result<TransactionReceipt, GatewayError>;
}

#[automock]
#[async_trait]
pub trait TokenContract: Send + Sync {
    fn address(&self) -> Address;

    async fn balance_of(&self, account: Address) -> Result<U256, GatewayError>;
}

#[automock]
#[async_trait]
pub trait RouterContract: Send + Sync {
    fn address(&self) -> Address;

    /// Output amounts for each hop of `path` when swapping `amount_in`.
    async fn amounts_out(
        &self,
        amount_in: U256,
        path: Vec<Address>,
    ) -> Result<Vec<U256>, GatewayError>;
}

/// The four contracts, as seen by the dashboard.
#[derive(Clone)]
pub struct Contracts {
    pub sale: Arc<dyn SaleContract>,
    pub vesting: Arc<dyn VestingContract>,
    pub token: Arc<dyn TokenContract>,
    pub router: Arc<dyn RouterContract>,
}

impl Contracts {
    pub fn evm(gateway: Arc<ChainGateway>, addresses: &crate::config::ContractAddresses) -> Self {
        Self {
            sale: Arc::new(EvmContract::new(gateway.clone(), addresses.sale)),
            vesting: Arc::new(EvmContract::new(gateway.clone(), addresses.vesting)),
            token: Arc::new(EvmContract::new(gateway.clone(), addresses.token)),
            router: Arc::new(EvmContract::new(gateway, addresses.router)),
        }
    }
}

/// A deployed contract reached through the gateway.
pub struct EvmContract {
    gateway: Arc<ChainGateway>,
    address: Address,
}

impl EvmContract {
    pub fn new(gateway: Arc<ChainGateway>, address: Address) -> Self {
        Self { gateway, address }
    }
}

fn to_seconds(field: &str, value: U256) -> Result<u64, GatewayError> {
    u64::try_from(value).map_err(|_| {
        GatewayError::Rpc(RpcError::InvalidResponse(format!(
            "{field} does not fit in 64 bits: {value}"
        )))
    })
}

#[async_trait]
impl SaleContract for EvmContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn owner(&self) -> Result<Address, GatewayError> {
        let owner = self
            .gateway
            .read_call(self.address, &ITokenSale::ownerCall {})
            .await?;
        Ok(owner._0)
    }

    async fn current_round(&self) -> Result<SaleRound, GatewayError> {
        let round = self
            .gateway
            .read_call(self.address, &ITokenSale::getCurrentRoundCall {})
            .await?;
        Ok(SaleRound {
            round_id: round.roundId,
            active: round.active,
            rate: round.rate,
            min_contribution: round.minContribution,
            max_contribution: round.maxContribution,
            cap: round.cap,
            raised: round.raised,
            vesting_address: round.vestingAddress,
        })
    }

    async fn buy_tokens(
        &self,
        from: Address,
        value: U256,
    ) -> Result<TransactionReceipt, GatewayError> {
        self.gateway
            .write_call(from, self.address, &ITokenSale::buyTokensCall {}, value)
            .await
    }

    async fn configure_round(
        &self,
        from: Address,
        params: RoundParams,
    ) -> Result<TransactionReceipt, GatewayError> {
        let call = ITokenSale::configureRoundCall {
            roundId: params.round_id,
            rate: params.rate,
            minContribution: params.min_contribution,
            maxContribution: params.max_contribution,
            cap: params.cap,
            vestingAddress: params.vesting_address,
        };
        self.gateway
            .write_call(from, self.address, &call, U256::ZERO)
            .await
    }

    async fn activate_round(
        &self,
        from: Address,
        round_id: U256,
    ) -> Result<TransactionReceipt, GatewayError> {
        let call = ITokenSale::activateRoundCall { roundId: round_id };
        self.gateway
            .write_call(from, self.address, &call, U256::ZERO)
            .await
    }

    async fn update_rate(
        &self,
        from: Address,
        rate: U256,
    ) -> Result<TransactionReceipt, GatewayError> {
        let call = ITokenSale::updateRateCall { newRate: rate };
        self.gateway
            .write_call(from, self.address, &call, U256::ZERO)
            .await
    }

    async fn toggle_sale(&self, from: Address) -> Result<TransactionReceipt, GatewayError> {
        self.gateway
            .write_call(from, self.address, &ITokenSale::toggleSaleCall {}, U256::ZERO)
            .await
    }

    async fn withdraw_unsold_tokens(
        &self,
        from: Address,
    ) -> Result<TransactionReceipt, GatewayError> {
        self.gateway
            .write_call(
                from,
                self.address,
                &ITokenSale::withdrawUnsoldTokensCall {},
                U256::ZERO,
            )
            .await
    }
}

#[async_trait]
impl VestingContract for EvmContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn schedule(&self, beneficiary: Address) -> Result<VestingSchedule, GatewayError> {
        let schedule = self
            .gateway
            .read_call(self.address, &IVesting::schedulesCall { beneficiary })
            .await?;
        Ok(VestingSchedule {
            total_amount: schedule.totalAmount,
            released_amount: schedule.releasedAmount,
            start_time: to_seconds("startTime", schedule.startTime)?,
            cliff_duration: to_seconds("cliffDuration", schedule.cliffDuration)?,
            vesting_duration: to_seconds("vestingDuration", schedule.vestingDuration)?,
        })
    }

    async fn claimable_amount(&self, beneficiary: Address) -> Result<U256, GatewayError> {
        let claimable = self
            .gateway
            .read_call(self.address, &IVesting::getClaimableAmountCall { beneficiary })
            .await?;
        Ok(claimable._0)
    }

    async fn claim(&self, from: Address) -> Result<TransactionReceipt, GatewayError> {
        self.gateway
            .write_call(from, self.address, &IVesting::claimCall {}, U256::ZERO)
            .await
    }
}

#[async_trait]
impl TokenContract for EvmContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn balance_of(&self, account: Address) -> Result<U256, GatewayError> {
        let balance = self
            .gateway
            .read_call(self.address, &IERC20::balanceOfCall { account })
            .await?;
        Ok(balance._0)
    }
}

#[async_trait]
impl RouterContract for EvmContract {
    fn address(&self) -> Address {
        self.address
    }

    async fn amounts_out(
        &self,
        amount_in: U256,
        path: Vec<Address>,
    ) -> Result<Vec<U256>, GatewayError> {
        let call = IRouter::getAmountsOutCall {
            amountIn: amount_in,
            path,
        };
        let amounts = self.gateway.read_call(self.address, &call).await?;
        Ok(amounts.amounts)
    }
}
