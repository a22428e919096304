use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::AppConfig;
use crate::marksheet::remarks::RemarkGenerator;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    /// Remark phrasing strategy used by the marksheet pipeline.
    pub remarks: Arc<dyn RemarkGenerator>,
}
