//! Definitions of Solidity functions called during deployment

use alloy::sol;

sol! {
    /// The OpenZeppelin v5 `ProxyAdmin`, deployed by each `TransparentUpgradeableProxy`
    #[sol(rpc)]
    interface ProxyAdmin {
        function owner() external view returns (address);
        function upgradeAndCall(address proxy, address implementation, bytes memory data) external payable;
    }
}
