//! Swap-module ledger (C5): per-module token balances, LP balances, pool
//! reserves, and the approve / withdraw / conditional-approve lifecycles
//! layered on top of [`crate::token::TokenLedger`]. The pure constant-product
//! AMM math for the seven commit functions lives in [`pool`].

pub mod ledger;
pub mod pool;
pub mod state;

pub use ledger::{ModuleLedger, ModuleOpOutcome};
pub use state::{
    ConditionalApproveState, Module, ModuleOpKind, ModuleTokenBalance, PendingModuleOp,
    PoolBalance,
};
