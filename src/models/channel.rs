//! Channel types, naming conventions, and the client-side channel object.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

use crate::models::event::PusherEvent;
use crate::models::presence::PresenceChannelMember;

/// Channel type based on prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// Public channel: no auth required.
    Public,
    /// Private channel: requires auth token.
    Private,
    /// Presence channel: auth + track who is online.
    Presence,
}

impl ChannelType {
    /// Derive channel type from name. Pusher-style: `private-*`, `presence-*`.
    pub fn from_name(name: &str) -> Self {
        if name.starts_with("presence-") {
            ChannelType::Presence
        } else if name.starts_with("private-") {
            ChannelType::Private
        } else {
            ChannelType::Public
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, ChannelType::Private | ChannelType::Presence)
    }
}

/// Callback invoked for each event delivered on a channel.
pub type EventCallback = Arc<dyn Fn(&PusherEvent) + Send + Sync>;

/// Callback invoked when a presence member joins or leaves.
pub type MemberCallback = Arc<dyn Fn(&PresenceChannelMember) + Send + Sync>;

/// A channel as the client tracks it: name, type, subscription state, bound callbacks
/// and (for presence channels) the member list.
#[derive(Clone)]
pub struct Channel {
    name: String,
    channel_type: ChannelType,
    subscribed: bool,
    callbacks: HashMap<String, Vec<(String, EventCallback)>>,
    members: Vec<PresenceChannelMember>,
    on_member_added: Option<MemberCallback>,
    on_member_removed: Option<MemberCallback>,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let channel_type = ChannelType::from_name(&name);
        Self {
            name,
            channel_type,
            subscribed: false,
            callbacks: HashMap::new(),
            members: Vec::new(),
            on_member_added: None,
            on_member_removed: None,
        }
    }

    pub(crate) fn with_member_callbacks(
        mut self,
        on_member_added: Option<MemberCallback>,
        on_member_removed: Option<MemberCallback>,
    ) -> Self {
        self.on_member_added = on_member_added;
        self.on_member_removed = on_member_removed;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn channel_type(&self) -> ChannelType {
        self.channel_type
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub(crate) fn set_subscribed(&mut self, subscribed: bool) {
        self.subscribed = subscribed;
    }

    /// Current presence members (empty for non-presence channels).
    pub fn members(&self) -> &[PresenceChannelMember] {
        &self.members
    }

    /// Bind a callback to an event name. Returns an id usable with [`Channel::unbind`].
    pub fn bind(&mut self, event_name: &str, callback: EventCallback) -> String {
        let id = Uuid::new_v4().to_string();
        self.callbacks
            .entry(event_name.to_string())
            .or_default()
            .push((id.clone(), callback));
        id
    }

    /// Remove one callback. Returns whether anything was removed.
    pub fn unbind(&mut self, event_name: &str, callback_id: &str) -> bool {
        let Some(list) = self.callbacks.get_mut(event_name) else {
            return false;
        };
        let before = list.len();
        list.retain(|(id, _)| id != callback_id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.callbacks.remove(event_name);
        }
        removed
    }

    pub fn unbind_all(&mut self) {
        self.callbacks.clear();
    }

    /// Callbacks bound to `event_name`, cloned so they can run without holding a lock.
    pub(crate) fn callbacks_for(&self, event_name: &str) -> Vec<EventCallback> {
        self.callbacks
            .get(event_name)
            .map(|list| list.iter().map(|(_, cb)| cb.clone()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn set_members(&mut self, members: Vec<PresenceChannelMember>) {
        self.members = members;
    }

    /// Returns `false` if a member with the same user id is already present.
    pub(crate) fn add_member(&mut self, member: PresenceChannelMember) -> bool {
        if self.members.iter().any(|m| m.user_id == member.user_id) {
            return false;
        }
        self.members.push(member);
        true
    }

    pub(crate) fn remove_member(&mut self, user_id: &str) -> Option<PresenceChannelMember> {
        let pos = self.members.iter().position(|m| m.user_id == user_id)?;
        Some(self.members.remove(pos))
    }

    pub(crate) fn member_added_callback(&self) -> Option<MemberCallback> {
        self.on_member_added.clone()
    }

    pub(crate) fn member_removed_callback(&self) -> Option<MemberCallback> {
        self.on_member_removed.clone()
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("channel_type", &self.channel_type)
            .field("subscribed", &self.subscribed)
            .field("bound_events", &self.callbacks.keys().collect::<Vec<_>>())
            .field("members", &self.members)
            .finish()
    }
}

/// A channel named either by its full object or by its name alone.
#[derive(Debug, Clone, Copy)]
pub enum ChannelDescriptor<'a> {
    Channel(&'a Channel),
    Name(&'a str),
}

impl<'a> ChannelDescriptor<'a> {
    pub fn name(&self) -> &'a str {
        match *self {
            ChannelDescriptor::Channel(c) => c.name(),
            ChannelDescriptor::Name(n) => n,
        }
    }
}

impl<'a> From<&'a Channel> for ChannelDescriptor<'a> {
    fn from(channel: &'a Channel) -> Self {
        ChannelDescriptor::Channel(channel)
    }
}

impl<'a> From<&'a str> for ChannelDescriptor<'a> {
    fn from(name: &'a str) -> Self {
        ChannelDescriptor::Name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn channel_type_from_name_public() {
        assert_eq!(ChannelType::from_name("my-channel"), ChannelType::Public);
        assert_eq!(ChannelType::from_name("foo"), ChannelType::Public);
    }

    #[test]
    fn channel_type_from_name_private() {
        assert_eq!(
            ChannelType::from_name("private-user-1"),
            ChannelType::Private
        );
    }

    #[test]
    fn channel_type_from_name_presence() {
        assert_eq!(
            ChannelType::from_name("presence-chat"),
            ChannelType::Presence
        );
        assert!(ChannelType::Presence.is_private());
    }

    #[test]
    fn bind_and_unbind_callbacks() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut channel = Channel::new("my-channel");
        let h = hits.clone();
        let id = channel.bind(
            "test-event",
            Arc::new(move |_: &PusherEvent| {
                h.fetch_add(1, Ordering::SeqCst);
            }),
        );

        let event = PusherEvent::parse(r#"{"event":"test-event","channel":"my-channel","data":"x"}"#)
            .unwrap();
        for cb in channel.callbacks_for(event.event_name()) {
            cb(&event);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(channel.unbind("test-event", &id));
        assert!(!channel.unbind("test-event", &id));
        assert!(channel.callbacks_for("test-event").is_empty());
    }

    #[test]
    fn presence_members_added_once_and_removed() {
        let mut channel = Channel::new("presence-room");
        assert!(channel.add_member(PresenceChannelMember::new("u1", None)));
        assert!(!channel.add_member(PresenceChannelMember::new("u1", None)));
        assert_eq!(channel.members().len(), 1);

        assert_eq!(channel.remove_member("u1").map(|m| m.user_id), Some("u1".to_string()));
        assert!(channel.remove_member("u1").is_none());
        assert!(channel.members().is_empty());
    }

    #[test]
    fn descriptor_yields_same_name() {
        let channel = Channel::new("private-chat");
        assert_eq!(ChannelDescriptor::from(&channel).name(), "private-chat");
        assert_eq!(ChannelDescriptor::from("private-chat").name(), "private-chat");
    }
}
