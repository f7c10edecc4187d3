//! Database entities and request/response types

pub mod movement;
pub mod reagent;
pub mod supplier;

pub use movement::{
    BatchSummary, Direction, ImportSummary, InboundRecorded, MovementPage, MovementWithReagent,
    OutboundRecorded, RecordInboundInput, RecordOutboundInput, StockMovement,
};
pub use reagent::{
    LowStockReagent, ReagentFilter, Reagent, ReceivingDefaults, RegisterReagentInput, StockLevel,
    UpdateReagentInput,
};
pub use supplier::{CreateSupplierInput, Supplier};
