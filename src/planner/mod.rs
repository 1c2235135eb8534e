pub mod logical_plan;
pub mod planner;

pub use logical_plan::MigrationPlan;
pub use planner::MigrationPlanner;
