use chrono::{DateTime, NaiveDate};
use diesel::{AsChangeset, Insertable};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};

use crate::models::todo::{TodoId, TodoStatus};
use crate::models::validation::FieldError;
use crate::repository::schema::todos;

/// Body of `POST /todos`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Insertable)]
#[diesel(table_name = todos)]
#[serde(rename_all = "camelCase")]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(deserialize_with = "due_date::deserialize")]
    pub due_date: NaiveDate,
    #[serde(default)]
    pub ordinal: i32,
    #[serde(default)]
    pub status: TodoStatus,
}

impl NewTodo {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        due_date: NaiveDate,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            due_date,
            ordinal: 0,
            status: TodoStatus::Pending,
        }
    }
}

/// Body of `PUT /todos/{id}`. Absent fields are left untouched.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, AsChangeset)]
#[diesel(table_name = todos)]
#[serde(rename_all = "camelCase")]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "due_date::deserialize_option"
    )]
    pub due_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TodoStatus>,
}

impl TodoPatch {
    pub fn status(status: TodoStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn ordinal(ordinal: i32) -> Self {
        Self {
            ordinal: Some(ordinal),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.due_date.is_none()
            && self.ordinal.is_none()
            && self.status.is_none()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrdinalUpdate {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: TodoId,
    pub ordinal: i32,
}

/// Body of `PUT /todos/ordinal`.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct OrdinalBatch {
    pub todos: Vec<OrdinalUpdate>,
}

/// Acknowledgement returned by `DELETE /todos/{id}`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deleted {
    pub id: TodoId,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<FieldError>>,
}

// Older clients send ids as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Number(TodoId),
    Text(String),
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<TodoId, D::Error>
where
    D: Deserializer<'de>,
{
    match IdRepr::deserialize(deserializer)? {
        IdRepr::Number(id) => Ok(id),
        IdRepr::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("invalid todo id `{text}`"))),
    }
}

/// Due dates arrive either as a plain date or as a full RFC 3339 timestamp.
pub(crate) mod due_date {
    use super::*;

    pub fn parse(value: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()
            .or_else(|| DateTime::parse_from_rfc3339(value).ok().map(|at| at.date_naive()))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<NaiveDate, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        parse(&value).ok_or_else(|| de::Error::custom(format!("invalid due date `{value}`")))
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(value) => parse(&value)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid due date `{value}`"))),
            None => Ok(None),
        }
    }
}
