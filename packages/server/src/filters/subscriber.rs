use common::payload::{value_as_i64, value_as_string};
use common::{AttributeModel, Payload, SubscriberStatus};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Select};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entity::list_subscriber::{Column, Entity};

/// Subscriber search shared by the list pages and the export processors.
///
/// Empty strings clear a field, so a sticky value can be removed by
/// submitting it blank.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriberSearch {
    pub list_id: Option<i32>,
    pub email: Option<String>,
    pub status: Option<SubscriberStatus>,
    pub ip_address: Option<String>,
    pub source: Option<String>,
}

const ATTRIBUTES: &[&str] = &["list_id", "email", "status", "ip_address", "source"];

impl AttributeModel for SubscriberSearch {
    fn attribute_names(&self) -> &'static [&'static str] {
        ATTRIBUTES
    }

    fn set_attribute(&mut self, name: &str, value: &Value) -> bool {
        if value.is_null() || value.as_str().is_some_and(|s| s.trim().is_empty()) {
            match name {
                "list_id" => self.list_id = None,
                "email" => self.email = None,
                "status" => self.status = None,
                "ip_address" => self.ip_address = None,
                "source" => self.source = None,
                _ => return false,
            }
            return true;
        }

        match name {
            "list_id" => match value_as_i64(value).and_then(|id| i32::try_from(id).ok()) {
                Some(id) => self.list_id = Some(id),
                None => return false,
            },
            "status" => match value.as_str().and_then(|s| s.parse().ok()) {
                Some(status) => self.status = Some(status),
                None => return false,
            },
            "email" | "ip_address" | "source" => {
                let Some(text) = value_as_string(value) else {
                    return false;
                };
                let text = Some(text.trim().to_string());
                match name {
                    "email" => self.email = text,
                    "ip_address" => self.ip_address = text,
                    _ => self.source = text,
                }
            }
            _ => return false,
        }
        true
    }
}

impl SubscriberSearch {
    /// Restrict a subscriber query to the matching rows.
    pub fn apply(&self, mut query: Select<Entity>) -> Select<Entity> {
        if let Some(list_id) = self.list_id {
            query = query.filter(Column::ListId.eq(list_id));
        }
        if let Some(email) = &self.email {
            query = query.filter(Column::Email.contains(email.as_str()));
        }
        if let Some(status) = self.status {
            query = query.filter(Column::Status.eq(status.as_str()));
        }
        if let Some(ip) = &self.ip_address {
            query = query.filter(Column::IpAddress.contains(ip.as_str()));
        }
        if let Some(source) = &self.source {
            query = query.filter(Column::Source.eq(source.as_str()));
        }
        query
    }

    /// Matching subscribers in id order.
    pub fn query(&self) -> Select<Entity> {
        self.apply(Entity::find()).order_by_asc(Column::Id)
    }

    /// The set fields, as carried by a queue message.
    pub fn to_payload(&self) -> Payload {
        let mut payload = Payload::new();
        if let Some(list_id) = self.list_id {
            payload.insert("list_id".into(), list_id.into());
        }
        if let Some(email) = &self.email {
            payload.insert("email".into(), email.as_str().into());
        }
        if let Some(status) = self.status {
            payload.insert("status".into(), status.as_str().into());
        }
        if let Some(ip) = &self.ip_address {
            payload.insert("ip_address".into(), ip.as_str().into());
        }
        if let Some(source) = &self.source {
            payload.insert("source".into(), source.as_str().into());
        }
        payload
    }

    pub fn from_payload(payload: &Payload) -> Self {
        let mut search = Self::default();
        common::merge_payload(&mut search, payload);
        search
    }
}
