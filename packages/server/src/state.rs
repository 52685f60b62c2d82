use std::sync::Arc;

use common::delivery::Fanout;
use common::validation::NameValidator;
use mq::JobQueue;
use sea_orm::DatabaseConnection;

use crate::config::AppConfig;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub queue: Arc<dyn JobQueue>,
    pub fanout: Fanout,
    pub validator: Arc<NameValidator>,
    pub config: Arc<AppConfig>,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        queue: Arc<dyn JobQueue>,
        fanout: Fanout,
        config: AppConfig,
    ) -> Self {
        Self {
            validator: Arc::new(NameValidator::new(&config.validation.denylist)),
            db,
            queue,
            fanout,
            config: Arc::new(config),
        }
    }
}
