use serde::Serialize;
use tracing::warn;

#[derive(Serialize)]
struct CreditBody<'a> {
    #[serde(rename = "userId")]
    user_id: &'a str,
    amount: u64,
}

/// Client for the external reward API. Credits are spawned and never awaited
/// by the round loop; a failed call is logged and dropped.
#[derive(Clone)]
pub struct RewardNotifier {
    client: reqwest::Client,
    endpoint: String,
}

impl RewardNotifier {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/api/game/reward", base_url.trim_end_matches('/')),
        }
    }

    /// Fire-and-forget credit for one winner. Single attempt, no retry.
    pub fn credit(&self, user_id: &str, amount: u64) {
        let client = self.client.clone();
        let endpoint = self.endpoint.clone();
        let user_id = user_id.to_string();
        tokio::spawn(async move {
            let body = CreditBody {
                user_id: &user_id,
                amount,
            };
            if let Err(err) = client.post(&endpoint).json(&body).send().await {
                warn!(%user_id, amount, %err, "reward call failed");
            }
        });
    }
}
