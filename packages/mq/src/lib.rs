pub mod error;
pub mod models;
pub mod queue;

pub use error::MqError;
pub use models::{BrokerMessage, BroccoliError, MqConfig, MqQueue, init_mq};
pub use queue::{JobQueue, enqueue_message};

pub type Mq = MqQueue;
