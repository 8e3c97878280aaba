//! Typed errors.
//!
//! Each subsystem gets its own small `thiserror` enum; [`IndexerError`]
//! nests them for call sites that need to match broadly (the dispatcher)
//! while letting individual components match narrowly. None of these are
//! panics: scale mismatches and other conditions some reference
//! implementations treat as panics are statically unreachable here or
//! surface as [`CommitError::InvariantViolation`], which is fatal only to
//! the commit *batch*, never to the process.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdError {
    #[error("inscription reference must be 32..36 bytes, got {0}")]
    BadInscriptionRefLength(usize),
    #[error("malformed inscription id string `{0}`")]
    BadDisplayFormat(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecimalError {
    #[error("empty numeric string")]
    Empty,
    #[error("leading '+' is not allowed")]
    LeadingPlus,
    #[error("leading or trailing whitespace is not allowed")]
    Whitespace,
    #[error("integer part is empty")]
    EmptyIntegerPart,
    #[error("fractional part is empty")]
    EmptyFractionalPart,
    #[error("multiple decimal points")]
    MultipleDots,
    #[error("fractional precision {actual} exceeds maximum {max}")]
    PrecisionExceeded { actual: usize, max: u8 },
    #[error("invalid digit in numeric string")]
    InvalidDigit,
    #[error("scale mismatch: {a} vs {b}")]
    ScaleMismatch { a: u8, b: u8 },
    #[error("division by zero")]
    DivisionByZero,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PayloadError {
    #[error("malformed JSON body: {0}")]
    Malformed(String),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("unexpected protocol `{0}`")]
    UnknownProtocol(String),
    #[error("unexpected operation `{0}`")]
    UnknownOperation(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("ticker must be 4 or 5 printable ASCII bytes, got length {0}")]
    BadTickerLength(usize),
    #[error("ticker `{0}` is not deployed")]
    UnknownTicker(String),
    #[error("ticker `{0}` is already deployed")]
    DuplicateDeploy(String),
    #[error("5-byte ticker `{0}` requires self_mint at height >= {1}")]
    SelfMintNotAllowed(String, u32),
    #[error("decimal {0} out of range [0,18]")]
    BadDecimal(u8),
    #[error("amount `{0}` failed to parse or is out of range")]
    BadAmount(String),
    #[error(transparent)]
    Decimal(#[from] DecimalError),
    #[error("mint has already reached max supply")]
    MintExhausted,
    #[error("insufficient available balance: need {need}, have {have}")]
    InsufficientBalance { need: String, have: String },
    #[error("self-mint parent inscription does not match deploy")]
    SelfMintParentMismatch,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModuleError {
    #[error("module `{0}` is not deployed")]
    UnknownModule(String),
    #[error("module's gas_tick `{0}` is not a deployed ticker")]
    UnknownGasTick(String),
    #[error("module deploy `source` must equal the configured swap-source inscription id")]
    BadSource,
    #[error("swap withdraw is not enabled before height {0}")]
    WithdrawNotEnabled(u32),
    #[error("self-mint tokens bypass the module ledger")]
    SelfMintBypassesModule,
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("insufficient module balance: need {need}, have {have}")]
    InsufficientBalance { need: String, have: String },
    #[error("pool `{0}` already exists")]
    DuplicatePool(String),
    #[error("pool `{0}` does not exist")]
    UnknownPool(String),
    #[error("slippage check failed")]
    SlippageExceeded,
    #[error("initial liquidity below MINIMUM_LIQUIDITY floor")]
    InitialLiquidityTooLow,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("commit body unavailable for inscription {0}")]
    MissingCommitBody(String),
    #[error("commit function signature is invalid")]
    BadSignature,
    #[error("commit parent chain is invalid or already consumed")]
    BadParent,
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error("insufficient gas balance to cover batch")]
    InsufficientGas,
    #[error("invariant violated during two-phase apply: {0}")]
    InvariantViolation(String),
    #[error("unknown commit function `{0}`")]
    UnknownFunction(String),
    #[error("malformed commit JSON body: {0}")]
    MalformedBody(String),
}

#[derive(Debug, Error)]
pub enum IndexerError {
    #[error(transparent)]
    Payload(#[from] PayloadError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error(transparent)]
    Module(#[from] ModuleError),
    #[error(transparent)]
    Commit(#[from] CommitError),
    #[error(transparent)]
    Id(#[from] IdError),
    #[error("disabled ticker `{0}` (not in TICKS_ENABLED allow-list)")]
    DisabledTicker(String),
}

