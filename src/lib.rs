pub mod decimal;
pub mod effects;
pub mod errors;
pub mod events;
pub mod frequency;
pub mod recalc;
pub mod repository;
pub mod schedule;
pub mod types;
pub mod validate;

// re-export key types
pub use decimal::{Money, Rate};
pub use effects::apply_event;
pub use errors::{LoanError, Result};
pub use events::{EventId, EventKind, EventLog, LoanEvent};
pub use frequency::Frequency;
pub use recalc::recalculate;
pub use repository::{
    EventRepository, InMemoryStore, LoanRepository, ScheduleRepository,
};
pub use schedule::{
    calculate_payment, calculate_schedule, select_strategy, CalculationStrategy,
};
pub use types::{
    AdjustmentType, AppliedTo, LoanId, LoanSnapshot, RatePeriod, RatePeriodId,
    RecalculationDirective, ScheduleRow,
};
pub use validate::{validate_event, ValidationErrors};

// re-export external dependencies that users will need
pub use chrono;
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
