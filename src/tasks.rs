// File de tâches asynchrones (consommée par le worker Celery existant)

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::cache::KvStore;

pub const TASK_QUEUE: &str = "automate:tasks";

#[derive(Debug, Serialize)]
struct TaskMessage<'a> {
    id: String,
    task: &'a str,
    args: serde_json::Value,
    enqueued_at: i64,
}

#[derive(Clone)]
pub struct TaskQueue {
    store: Arc<dyn KvStore>,
}

impl TaskQueue {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Rattache un process à une sous-équipe, en différé.
    /// Fire-and-forget: un échec d'envoi est loggé, jamais remonté à l'appelant.
    pub async fn add_strategy_to_subteam(&self, strategy_id: i32, subteam_name: &str) {
        let message = TaskMessage {
            id: Uuid::new_v4().to_string(),
            task: "add_strategy_to_subteam",
            args: serde_json::json!([strategy_id, subteam_name]),
            enqueued_at: Utc::now().timestamp(),
        };

        let payload = match serde_json::to_string(&message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(strategy_id, "Failed to encode task: {}", e);
                return;
            }
        };

        match self.store.push(TASK_QUEUE, payload).await {
            Ok(()) => tracing::info!(strategy_id, subteam = subteam_name, task_id = %message.id, "Task enqueued"),
            Err(e) => tracing::warn!(strategy_id, subteam = subteam_name, "Failed to enqueue task: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::memory::MemoryStore;

    #[actix_web::test]
    async fn test_task_payload_pushed() {
        let store = Arc::new(MemoryStore::default());
        let queue = TaskQueue::new(store.clone());

        queue.add_strategy_to_subteam(42, "recon").await;

        let pushed = store.list(TASK_QUEUE);
        assert_eq!(pushed.len(), 1);
        let message: serde_json::Value = serde_json::from_str(&pushed[0]).unwrap();
        assert_eq!(message["task"], "add_strategy_to_subteam");
        assert_eq!(message["args"], serde_json::json!([42, "recon"]));
    }

    #[actix_web::test]
    async fn test_enqueue_failure_is_swallowed() {
        let queue = TaskQueue::new(Arc::new(MemoryStore::failing()));
        queue.add_strategy_to_subteam(1, "alpha").await;
    }
}
