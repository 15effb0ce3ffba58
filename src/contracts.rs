//! ELA minter bridging contract ABI definition
//!
//! Uses alloy's sol! macro to generate type-safe bindings for the contract
//! deployed at the side chain's reserved bridge address.

use alloy::sol;

sol! {
    /// Bridging contract interface: recharge minting, withdrawals and the
    /// completion ledger shared by both directions
    #[sol(rpc)]
    contract ELAMinter {
        /// One mint funded by a main-chain recharge transaction
        struct RechargeData {
            address targetAddress;
            uint256 targetAmount;
            uint256 fee;
            bytes targetData;
        }

        /// Mint the recharge identified by `elaHash`.
        /// `smallRechargeData` carries the signed payload of a small cross-chain transfer.
        function Recharge(bytes32 elaHash, bytes smallRechargeData) external;

        /// Completion ledger keyed by main-chain recharge hash or side-chain withdraw id
        function completed(bytes32) external view returns (bool);

        function decodeRechargeData(bytes data) external pure returns (RechargeData[] memory);

        function getRechargeData(bytes32 elaHash) external view returns (RechargeData[] memory);

        /// Withdraw target, amount and arbiter signatures
        function getWithdrawData(bytes32 withdrwTxID) external view returns (address, uint256, bytes memory);

        /// Refund a withdrawal that failed on the main chain
        function refundWithdraw(bytes32 withdrwTxID) external;

        /// Redeem to a main-chain address
        function withdraw(string _addr, uint256 _amount, uint256 _fee) external;
    }
}
