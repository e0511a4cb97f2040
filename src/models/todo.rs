use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use diesel::backend::Backend;
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::serialize::{self, IsNull, Output, ToSql};
use diesel::sql_types::Text;
use diesel::sqlite::Sqlite;
use diesel::{Queryable, Selectable};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::dto::TodoPatch;

/// Server-assigned todo identifier. Provisional client-side records use
/// negative values until the server confirms them.
pub type TodoId = i32;

#[derive(
    Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default, AsExpression,
    FromSqlRow,
)]
#[diesel(sql_type = Text)]
#[serde(rename_all = "lowercase")]
pub enum TodoStatus {
    #[default]
    Pending,
    Completed,
}

impl TodoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoStatus::Pending => "pending",
            TodoStatus::Completed => "completed",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            TodoStatus::Pending => TodoStatus::Completed,
            TodoStatus::Completed => TodoStatus::Pending,
        }
    }
}

#[derive(Debug, Error)]
#[error("unknown todo status `{0}`")]
pub struct ParseStatusError(String);

impl FromStr for TodoStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TodoStatus::Pending),
            "completed" => Ok(TodoStatus::Completed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

impl fmt::Display for TodoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql<Text, Sqlite> for TodoStatus {
    fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
        out.set_value(self.as_str());
        Ok(IsNull::No)
    }
}

impl FromSql<Text, Sqlite> for TodoStatus {
    fn from_sql(bytes: <Sqlite as Backend>::RawValue<'_>) -> deserialize::Result<Self> {
        let value = <String as FromSql<Text, Sqlite>>::from_sql(bytes)?;
        Ok(value.parse()?)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Queryable, Selectable)]
#[diesel(table_name = crate::repository::schema::todos)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    pub id: TodoId,
    pub title: String,
    pub description: String,
    pub due_date: NaiveDate,
    pub ordinal: i32,
    pub status: TodoStatus,
}

impl Todo {
    /// Writes every field present in `patch` onto this record.
    pub fn apply(&mut self, patch: &TodoPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(due_date) = patch.due_date {
            self.due_date = due_date;
        }
        if let Some(ordinal) = patch.ordinal {
            self.ordinal = ordinal;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
    }

    /// Returns a patch holding the current values of exactly the fields
    /// `patch` touches. Applying it afterwards undoes `patch`.
    pub fn capture(&self, patch: &TodoPatch) -> TodoPatch {
        TodoPatch {
            title: patch.title.as_ref().map(|_| self.title.clone()),
            description: patch.description.as_ref().map(|_| self.description.clone()),
            due_date: patch.due_date.map(|_| self.due_date),
            ordinal: patch.ordinal.map(|_| self.ordinal),
            status: patch.status.map(|_| self.status),
        }
    }
}
