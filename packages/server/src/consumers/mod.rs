pub mod generation_dlq;

pub use generation_dlq::{DeadLetterOutcome, consume_generation_dlq, record_dead_letter};
