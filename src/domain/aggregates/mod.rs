//! Aggregates module
pub mod member;
pub mod order;
pub mod cart;
pub mod profit_period;

pub use member::{Member, MemberId, MemberUpdate, Rank, RankRequirement, RankTable, Role, GENERATIONS};
pub use order::{Order, OrderError, OrderStatus, PaymentStatus, LineItem};
pub use cart::{Cart, CartError, CartItem};
pub use profit_period::{CommissionBreakdown, ExternalInputs, MemberProfit, PeriodError, PeriodId, PeriodStatus, PointsSnapshot, ProfitPeriod};
