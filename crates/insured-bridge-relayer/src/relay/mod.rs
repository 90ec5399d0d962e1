// Relay decision, dispute and settlement logic

pub mod batcher;
pub mod calls;
pub mod decision;
pub mod dispute;
pub mod finalizer;
pub mod matcher;
pub mod orchestrator;
pub mod report;
pub mod requirement;

pub use batcher::{BatchReport, CallOutcome, CallReport, TransactionBatcher};
pub use decision::{should_relay, RelayDecision};
pub use dispute::{DisputeEvaluator, DisputeReason, DisputeVerdict, RelayExpiry};
pub use finalizer::{CrossDomainFinalizer, FinalizationReport};
pub use matcher::DepositMatcher;
pub use orchestrator::{RelayableDeposit, RelayableDeposits, Relayer, RelayerSettings};
pub use report::{ItemFailure, PlannedAction, SkippedItem, Sweep, SweepReport};
pub use requirement::{relay_token_requirement, RelayTokenRequirement};
