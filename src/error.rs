use thiserror::Error;

/// Why a join, completion or camp membership request was refused.
#[derive(Debug, Error)]
pub enum ParticipationError {
    #[error("task {0} not found")]
    TaskNotFound(i64),
    #[error("task has not been posted yet")]
    TaskNotSent,
    #[error("participation window has closed")]
    WindowClosed,
    #[error("already recorded")]
    AlreadyJoined,
    #[error("camp {0} not found")]
    CampNotFound(i64),
    #[error("camp is not active")]
    CampInactive,
    #[error("camp is full")]
    CampFull,
    #[error("not a member of this camp")]
    NotCampMember,
    #[error("'{0}' is not a task of this schedule")]
    UnknownScheduleTask(String),
    #[error("task belongs to another day")]
    NotToday,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl ParticipationError {
    /// Short text shown to the user in the callback answer or reply.
    pub fn user_message(&self) -> &'static str {
        match self {
            ParticipationError::TaskNotFound(_) => "❌ This task no longer exists",
            ParticipationError::TaskNotSent => "⏳ This task has not started yet",
            ParticipationError::WindowClosed => "⏰ Sorry, the deadline for this task has passed",
            ParticipationError::AlreadyJoined => "✅ You already completed this task",
            ParticipationError::CampNotFound(_) => "❌ Camp not found",
            ParticipationError::CampInactive => "❌ This camp is not active",
            ParticipationError::CampFull => "🚫 This camp has reached its participant limit",
            ParticipationError::NotCampMember => "ℹ️ You are not a member of this camp",
            ParticipationError::UnknownScheduleTask(_) => "❌ Unknown task for this schedule",
            ParticipationError::NotToday => "📅 This reminder is from another day",
            ParticipationError::Database(_) => "❌ Something went wrong, please try again",
        }
    }
}

/// Failures while creating camps or adding tasks to them.
#[derive(Debug, Error)]
pub enum CampError {
    #[error("invalid format: {0}")]
    InvalidFormat(String),
    #[error("{0}")]
    InvalidDate(String),
    #[error("the camp must end after it starts")]
    EndBeforeStart,
    #[error("the camp must start in the future")]
    StartInPast,
    #[error("task time must fall between the camp start and end")]
    OutsideCampWindow,
    #[error("task time must be in the future")]
    TimeInPast,
    #[error("camp {0} not found")]
    CampNotFound(i64),
    #[error("only the camp creator or a group admin can do that")]
    NotAuthorized,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Failure to deliver a message through the messaging backend.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("telegram request failed: {0}")]
    Request(#[from] teloxide::RequestError),
}

impl NotifyError {
    /// The user blocked the bot or can no longer be messaged privately.
    pub fn user_unreachable(&self) -> bool {
        use teloxide::ApiError;
        matches!(
            self,
            NotifyError::Request(teloxide::RequestError::Api(
                ApiError::BotBlocked | ApiError::UserDeactivated | ApiError::CantInitiateConversation
            ))
        )
    }

    /// The bot can no longer post to that chat at all.
    pub fn chat_unreachable(&self) -> bool {
        use teloxide::ApiError;
        matches!(
            self,
            NotifyError::Request(teloxide::RequestError::Api(
                ApiError::BotKicked
                    | ApiError::BotKickedFromSupergroup
                    | ApiError::ChatNotFound
                    | ApiError::GroupDeactivated
            ))
        )
    }
}
