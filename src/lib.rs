// Allow some clippy lints for the straightforward numeric/state-machine code below.
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]
#![allow(clippy::module_inception)]

//! Deterministic indexer for a BRC20-style meta-protocol and its layered
//! constant-product swap module.
//!
//! The crate consumes an ordered stream of inscription-create and
//! inscription-move events and produces: per-ticker deploy metadata and
//! holder balances ([`token`]), a swap-module AMM ledger layered on the
//! same tokens ([`module`]), a signed off-chain commit-batch verification
//! engine ([`commit`]), and the single-threaded dispatcher that wires all
//! three together ([`dispatcher`]).
//!
//! Ordering is the correctness guarantee: every subsystem here assumes it
//! is driven strictly in stream order by [`dispatcher::Dispatcher`].

pub mod cond_approve;
pub mod config;
pub mod context;
pub mod decimal;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod ids;
pub mod io;
pub mod module;
pub mod script;
pub mod token;

pub mod commit;

pub use context::IndexerContext;
pub use error::IndexerError;
