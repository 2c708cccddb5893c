use tracing::{error, info, warn};

/// Logs command start with consistent format
pub fn log_command_start(command: &str, user: &str, user_id: i64, chat_id: i64, details: Option<&str>) {
    match details {
        Some(d) => info!("CMD_START: {} by {}({}) in chat {} - {}", command, user, user_id, chat_id, d),
        None => info!("CMD_START: {} by {}({}) in chat {}", command, user, user_id, chat_id),
    }
}

/// Logs command completion with consistent format
pub fn log_command_success(command: &str, user: &str, user_id: i64, chat_id: i64, details: Option<&str>) {
    match details {
        Some(d) => info!("CMD_SUCCESS: {} by {}({}) in chat {} - {}", command, user, user_id, chat_id, d),
        None => info!("CMD_SUCCESS: {} by {}({}) in chat {}", command, user, user_id, chat_id),
    }
}

pub fn log_command_error(command: &str, user: &str, user_id: i64, chat_id: i64, error: &str) {
    error!("CMD_ERROR: {} by {}({}) in chat {} - {}", command, user, user_id, chat_id, error);
}

pub fn log_validation_error(command: &str, value: &str, error: &str, user_id: i64, chat_id: i64) {
    warn!(
        "VALIDATION_ERROR: {} - '{}' rejected: {} - user {} in chat {}",
        command, value, error, user_id, chat_id
    );
}

/// Logs database errors with consistent format
pub fn log_database_error(operation: &str, table: &str, error: &str, details: Option<&str>) {
    match details {
        Some(d) => error!("DB_ERROR: {} on {} failed: {} - {}", operation, table, error, d),
        None => error!("DB_ERROR: {} on {} failed: {}", operation, table, error),
    }
}

/// Logs a scheduled message going out (or failing to).
pub fn log_dispatch(kind: &str, chat_id: i64, item: &str, outcome: Result<(), &str>) {
    match outcome {
        Ok(()) => info!("DISPATCH: {} '{}' sent to chat {}", kind, item, chat_id),
        Err(e) => warn!("DISPATCH: {} '{}' to chat {} failed: {}", kind, item, chat_id, e),
    }
}

pub fn log_system_event(event: &str, details: Option<&str>) {
    match details {
        Some(d) => info!("SYSTEM: {} - {}", event, d),
        None => info!("SYSTEM: {}", event),
    }
}
