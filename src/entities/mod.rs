//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod cfp_info;
pub mod part;
pub mod parts_structure;
pub mod request_status;
pub mod trade;

// Re-export specific types to avoid conflicts
pub use cfp_info::{Column as CfpInfoColumn, Entity as CfpInfo, Model as CfpInfoModel};
pub use part::{Column as PartColumn, Entity as Part, Model as PartModel};
pub use parts_structure::{
    Column as PartsStructureColumn, Entity as PartsStructure, Model as PartsStructureModel,
};
pub use request_status::{
    Column as RequestStatusColumn, Entity as RequestStatus, Model as RequestStatusModel,
};
pub use trade::{Column as TradeColumn, Entity as Trade, Model as TradeModel};
