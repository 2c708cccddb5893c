pub mod activity;
pub mod camp;
pub mod camp_participant;
pub mod camp_report;
pub mod camp_task;
pub mod custom_slot;
pub mod group;
pub mod group_participant;
pub mod group_task;
pub mod schedule_tracker;
pub mod system_stat;
pub mod user;

pub use activity::*;
pub use camp::*;
pub use camp_participant::*;
pub use camp_report::*;
pub use camp_task::*;
pub use custom_slot::*;
pub use group::*;
pub use group_participant::*;
pub use group_task::*;
pub use schedule_tracker::*;
pub use system_stat::*;
pub use user::*;
