pub mod admin;
pub mod camps;
pub mod dispatcher;
pub mod health;
pub mod maintenance;
pub mod messages;
pub mod motivation;
pub mod notifier;
pub mod participation;
pub mod reports;
pub mod scheduler;

pub use camps::CampService;
pub use dispatcher::{DispatchSummary, TaskDispatcher};
pub use health::DashboardService;
pub use notifier::{Notifier, TelegramNotifier};
pub use participation::ParticipationService;
pub use scheduler::SchedulerService;
