use serde::Deserialize;
use serde_json::Value;

/// Raw payload posted by the payment provider.
#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// Webhook events the service reacts to. Anything else is acknowledged and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    /// The user bought a premium membership
    UserUpgraded { user_id: i64 },

    /// The user's premium membership ended or was paused
    UserDowngraded { user_id: i64, pause: bool },

    Ignored,
}

#[derive(Debug, Deserialize)]
struct UpgradedData {
    user_id: i64,
}

#[derive(Debug, Deserialize)]
struct DowngradedData {
    user_id: i64,
    #[serde(default)]
    pause: bool,
}

impl TryFrom<WebhookPayload> for WebhookEvent {
    type Error = serde_json::Error;

    fn try_from(payload: WebhookPayload) -> Result<Self, Self::Error> {
        match payload.event.as_str() {
            "user.upgraded" => {
                let data: UpgradedData = serde_json::from_value(payload.data)?;
                Ok(Self::UserUpgraded { user_id: data.user_id })
            }
            "user.downgraded" => {
                let data: DowngradedData = serde_json::from_value(payload.data)?;
                Ok(Self::UserDowngraded {
                    user_id: data.user_id,
                    pause: data.pause,
                })
            }
            _ => Ok(Self::Ignored),
        }
    }
}
