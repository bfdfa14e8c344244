//! Presence channel members.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A member of a presence channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceChannelMember {
    pub user_id: String,
    #[serde(default)]
    pub user_info: Option<Value>,
}

impl PresenceChannelMember {
    pub fn new(user_id: impl Into<String>, user_info: Option<Value>) -> Self {
        Self {
            user_id: user_id.into(),
            user_info,
        }
    }
}

/// Members listed in the data of a presence `subscription_succeeded` event:
/// `{"presence": {"ids": [...], "hash": {id: info}, "count": n}}`.
pub(crate) fn members_from_subscription(data: &Value) -> Vec<PresenceChannelMember> {
    let Some(presence) = data.get("presence") else {
        return Vec::new();
    };
    let hash = presence.get("hash");
    presence
        .get("ids")
        .and_then(Value::as_array)
        .map(|ids| {
            ids.iter()
                .filter_map(|id| match id {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
                .map(|id| {
                    let info = hash
                        .and_then(|h| h.get(&id))
                        .filter(|v| !v.is_null())
                        .cloned();
                    PresenceChannelMember::new(id, info)
                })
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn members_from_subscription_data() {
        let data = json!({
            "presence": {
                "ids": ["u1", 2],
                "hash": {"u1": {"name": "Ann"}},
                "count": 2
            }
        });
        let members = members_from_subscription(&data);
        assert_eq!(members.len(), 2);
        assert_eq!(members[0].user_info, Some(json!({"name": "Ann"})));
        assert_eq!(members[1].user_id, "2");
        assert_eq!(members[1].user_info, None);
    }

    #[test]
    fn null_user_info_is_absent() {
        let data = json!({
            "presence": {"ids": ["u1"], "hash": {"u1": null}, "count": 1}
        });
        let members = members_from_subscription(&data);
        assert_eq!(members, vec![PresenceChannelMember::new("u1", None)]);
    }

    #[test]
    fn members_from_non_presence_data_is_empty() {
        assert!(members_from_subscription(&json!({})).is_empty());
    }
}
