use crate::errors::{AppError, AppResult};

pub(crate) const ENV_API_KEY: &str = "NOTION_API_KEY";
pub(crate) const ENV_DATABASE_ID: &str = "TARGET_DATABASE_ID";
pub(crate) const ENV_STORE_PATH: &str = "LOCAL_TASK_DB";

pub(crate) fn require_env(name: &str) -> AppResult<String> {
    std::env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| AppError::Config(format!("environment variable {name} is not set")))
}
