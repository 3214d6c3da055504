//! Transaction submission module: pricing, sequencing, building, signing,
//! broadcasting, and confirmation

mod builder;
mod confirm;
mod gas;
mod nonce;
mod sender;

pub use builder::{SignedTransaction, TxBuilder, TxSigner};
pub use confirm::ConfirmationPoller;
pub use gas::GasEstimator;
pub use nonce::NonceManager;
pub use sender::Broadcaster;
