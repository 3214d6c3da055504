//! Minimal calldata encoders for the two contracts the engine talks to
//!
//! The engine only needs three calls (ERC-20 `approve`/`balanceOf` and the
//! pool's `deposit`), so these are hand-encoded with the abi crate rather
//! than generated bindings.

use ethers::abi::{encode, Token};
use ethers::types::{Address, Bytes, U256};
use ethers::utils::id;

/// Selector + ABI-encoded arguments
fn encode_call(signature: &str, args: &[Token]) -> Bytes {
    let mut data = id(signature).to_vec();
    data.extend_from_slice(&encode(args));
    data.into()
}

/// ERC-20 token call encoder
#[derive(Debug, Clone, Copy)]
pub struct Erc20 {
    pub address: Address,
}

impl Erc20 {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// `approve(address spender, uint256 value)`
    pub fn approve(&self, spender: Address, value: U256) -> Bytes {
        encode_call(
            "approve(address,uint256)",
            &[Token::Address(spender), Token::Uint(value)],
        )
    }

    /// `balanceOf(address account)`
    pub fn balance_of(&self, account: Address) -> Bytes {
        encode_call("balanceOf(address)", &[Token::Address(account)])
    }
}

/// Aave v3 pool call encoder
#[derive(Debug, Clone, Copy)]
pub struct LendingPool {
    pub address: Address,
}

impl LendingPool {
    pub fn new(address: Address) -> Self {
        Self { address }
    }

    /// `deposit(address asset, uint256 amount, address onBehalfOf, uint16 referralCode)`
    pub fn deposit(
        &self,
        asset: Address,
        amount: U256,
        on_behalf_of: Address,
        referral_code: u16,
    ) -> Bytes {
        encode_call(
            "deposit(address,uint256,address,uint16)",
            &[
                Token::Address(asset),
                Token::Uint(amount),
                Token::Address(on_behalf_of),
                Token::Uint(U256::from(referral_code)),
            ],
        )
    }
}
