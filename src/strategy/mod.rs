pub mod order;
pub mod rebalance;

pub use order::{build_order, build_order_at, build_signed_order, sign, RebalanceOrder};
pub use rebalance::{
    compute_rebalance, compute_rebalance_with, RebalanceDecision, RebalanceParams,
    DEFAULT_DUST_THRESHOLD, DEFAULT_SIZE_DECIMALS,
};
