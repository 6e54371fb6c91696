pub mod assembler;
pub mod decision;
pub mod derating;
pub mod design_load;
pub mod rated_performance;
pub mod stage_resolver;
pub mod staging;
