//! Contract bindings for all on-chain interactions.
//!
//! Uses alloy's `sol!` macro to generate type-safe ABI encoders/decoders
//! for the vault system contracts.

use alloy::sol;

sol! {
    #[sol(rpc)]
    interface IYieldVault {
        function totalAssets() external view returns (uint256);
        function totalSupply() external view returns (uint256);
        function totalManagedAssets() external view returns (uint256);
        function balanceOf(address owner) external view returns (uint256);
        function convertToAssets(uint256 shares) external view returns (uint256);
        function convertToShares(uint256 assets) external view returns (uint256);
        function deposit(uint256 assets) external returns (uint256 shares);
        function withdraw(uint256 shares) external returns (uint256 assets);
    }

    #[sol(rpc)]
    interface ILeverageStrategy {
        function deposited() external view returns (uint256);
        function borrowedWETH() external view returns (uint256);
        function paused() external view returns (bool);
        function setPaused(bool state) external;
    }

    #[sol(rpc)]
    interface IAaveStrategy {
        function strategyBalance() external view returns (uint256);
        function harvest() external;
    }

    #[sol(rpc)]
    interface IStrategyRouter {
        function rebalance() external;
        function triggerDeleverage(address strategy, uint256 steps) external;
    }

    #[sol(rpc)]
    interface IYieldPool {
        function accrue(address asset) external;
    }

    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}
