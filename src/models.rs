/**
 * Built-in Root Entities
 *
 * The meeting-management entities shipped with the core: projectors,
 * projection defaults, tags, config entries, chat messages, projector
 * messages and countdowns. Each is an ordinary Element producer - the
 * cache itself only sees their JSON full_data.
 *
 * Field-level business validation lives with the (external) storage
 * layer; these types only define the wire shape and the per-collection
 * access rules registered at startup.
 */

use crate::access::filters::{FieldStripFilter, PermissionFilter, PublicFilter};
use crate::access::FilterRegistry;
use crate::element::{Element, FullData};
use crate::error::PlenumError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An entity that can be written into the element cache.
///
/// `root_element` names the aggregate this entity is grouped under for
/// change distribution: dependent sub-objects report their owner, root
/// entities report themselves.
pub trait CacheElement: Serialize {
    /// Stable collection string of this entity type.
    fn collection_string() -> &'static str
    where
        Self: Sized;

    /// The entity's id, unique within its collection.
    fn id(&self) -> i64;

    /// The (collection, id) of the aggregate this entity belongs to.
    fn root_element(&self) -> (&'static str, i64)
    where
        Self: Sized,
    {
        (Self::collection_string(), self.id())
    }

    /// Serialize this entity into cache full_data.
    fn full_data(&self) -> Result<FullData, PlenumError>
    where
        Self: Sized,
    {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(map) => Ok(map),
            _ => Err(PlenumError::validation(
                format!("{}:{}", Self::collection_string(), self.id()),
                "entity did not serialize to a JSON object",
            )),
        }
    }

    /// Produce the cache element for this entity's current state.
    fn to_element(&self) -> Result<Element, PlenumError>
    where
        Self: Sized,
    {
        Ok(Element::new(
            Self::collection_string(),
            self.id(),
            self.full_data()?,
        ))
    }
}

/// A projector and the slide elements it currently shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Projector {
    pub id: i64,
    pub name: String,
    /// Currently projected elements; every entry has at least a "name".
    pub elements: Vec<serde_json::Value>,
    pub scale: i32,
    pub scroll: i32,
    pub width: u32,
    pub height: u32,
    pub reference_projector_id: Option<i64>,
}

impl CacheElement for Projector {
    fn collection_string() -> &'static str {
        "core/projector"
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// Default projector assignment for a slide category (e.g. "motions" or
/// "list_of_speakers"). A dependent sub-object of its projector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionDefault {
    pub id: i64,
    pub name: String,
    pub display_name: String,
    pub projector_id: i64,
}

impl CacheElement for ProjectionDefault {
    fn collection_string() -> &'static str {
        "core/projection-default"
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn root_element(&self) -> (&'static str, i64) {
        (Projector::collection_string(), self.projector_id)
    }
}

/// Tags usable by other models (agenda items, motions, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

impl CacheElement for Tag {
    fn collection_string() -> &'static str {
        "core/tag"
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// One config variable. `access_data` carries management-only payloads
/// (stream keys and the like) and is stripped for regular users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigStore {
    pub id: i64,
    pub key: String,
    pub value: serde_json::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_data: Option<serde_json::Value>,
}

impl CacheElement for ConfigStore {
    fn collection_string() -> &'static str {
        "core/config"
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// A message in the global manager chat room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub message: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: i64,
}

impl CacheElement for ChatMessage {
    fn collection_string() -> &'static str {
        "core/chat-message"
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// Free-text message shown on a projector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectorMessage {
    pub id: i64,
    pub message: String,
}

impl CacheElement for ProjectorMessage {
    fn collection_string() -> &'static str {
        "core/projector-message"
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// Countdown control actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountdownAction {
    Start,
    Stop,
    Reset,
}

/// A speaker-time countdown.
///
/// While running, `countdown_time` holds the absolute Unix timestamp the
/// countdown ends at; while stopped it holds the remaining seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Countdown {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub running: bool,
    pub default_time: u32,
    pub countdown_time: f64,
}

impl Countdown {
    pub fn new(id: i64, title: impl Into<String>, default_time: u32) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            running: false,
            default_time,
            countdown_time: default_time as f64,
        }
    }

    /// Apply a control action at the given wall-clock time.
    ///
    /// Stopping an already-stopped countdown resets it to its default
    /// time.
    pub fn control(&mut self, action: CountdownAction, now: DateTime<Utc>) {
        let now_ts = now.timestamp() as f64;
        match action {
            CountdownAction::Start => {
                self.running = true;
                self.countdown_time = now_ts + self.default_time as f64;
            }
            CountdownAction::Stop if self.running => {
                self.running = false;
                self.countdown_time -= now_ts;
            }
            CountdownAction::Stop | CountdownAction::Reset => {
                self.running = false;
                self.countdown_time = self.default_time as f64;
            }
        }
    }
}

impl CacheElement for Countdown {
    fn collection_string() -> &'static str {
        "core/countdown"
    }

    fn id(&self) -> i64 {
        self.id
    }
}

/// Register the access filters for all built-in collections.
///
/// Resolved once at startup; collections not registered here stay hidden
/// for every non-superuser identity.
pub fn register_builtin_collections(registry: &mut FilterRegistry) {
    let projector_filter = Arc::new(PermissionFilter::new("core.can_see_projector"));
    registry
        .register(Projector::collection_string(), projector_filter.clone())
        .register(ProjectionDefault::collection_string(), projector_filter.clone())
        .register(ProjectorMessage::collection_string(), projector_filter.clone())
        .register(Countdown::collection_string(), projector_filter)
        .register(Tag::collection_string(), Arc::new(PublicFilter))
        .register(
            ConfigStore::collection_string(),
            Arc::new(FieldStripFilter::new("core.can_manage_config", ["access_data"])),
        )
        .register(
            ChatMessage::collection_string(),
            Arc::new(PermissionFilter::new("core.can_use_chat")),
        );
}
