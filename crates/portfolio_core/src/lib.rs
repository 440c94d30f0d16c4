//! Portfolio core: pure chat state machine, view-model helpers and the tile stock ledger.
mod effect;
mod msg;
mod project;
mod state;
mod stock;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::{ChatFailure, Msg};
pub use project::{default_projects, ProjectRecord};
pub use state::{AppState, Generation, Role, TranscriptEntry};
pub use stock::{
    boxes_to_sqm, sqm_per_box, sqm_to_sqft, ProductionRecord, StockError, StockLedger, StockLevel,
    SQM_TO_SQFT,
};
pub use update::update;
pub use view_model::{project_blocks, AppViewModel, ProjectBlockView, TranscriptEntryView};
