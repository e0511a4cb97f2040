use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::r2d2::{self, ConnectionManager, CustomizeConnection};
use tracing::{info, instrument};

use crate::models::{NewTodo, OrdinalUpdate, Todo, TodoId, TodoPatch};
use crate::repository::schema::todos;
use crate::repository::{StoreError, TodoRepository};

type DBPool = r2d2::Pool<ConnectionManager<SqliteConnection>>;

const BUSY_TIMEOUT_MS: u32 = 5_000;

// AUTOINCREMENT keeps deleted ids from ever being handed out again.
const BOOTSTRAP: &str = "
    CREATE TABLE IF NOT EXISTS todos (
        id INTEGER PRIMARY KEY AUTOINCREMENT NOT NULL,
        title TEXT NOT NULL,
        description TEXT NOT NULL DEFAULT '',
        due_date DATE NOT NULL,
        ordinal INTEGER NOT NULL DEFAULT 0,
        status TEXT NOT NULL DEFAULT 'pending' CHECK (status IN ('pending', 'completed'))
    );
";

#[derive(Debug)]
struct ConnectionOptions {
    busy_timeout_ms: u32,
}

impl CustomizeConnection<SqliteConnection, r2d2::Error> for ConnectionOptions {
    fn on_acquire(&self, conn: &mut SqliteConnection) -> Result<(), r2d2::Error> {
        conn.batch_execute(&format!("PRAGMA busy_timeout = {};", self.busy_timeout_ms))
            .map_err(r2d2::Error::QueryError)
    }
}

// `:memory:`, `file::memory:` and `file:name?mode=memory` each open a database
// private to the connection.
fn is_in_memory(database_url: &str) -> bool {
    database_url.contains(":memory:") || database_url.contains("mode=memory")
}

#[derive(Debug, Clone)]
pub struct Database {
    pool: DBPool,
}

impl Database {
    /// Opens (or creates) the SQLite database and bootstraps the schema.
    ///
    /// In-memory databases live and die with their connection, so the pool is
    /// pinned to a single connection that is never recycled.
    pub fn new(database_url: &str, pool_size: u32) -> Result<Self, StoreError> {
        let manager = ConnectionManager::<SqliteConnection>::new(database_url);
        let options = ConnectionOptions {
            busy_timeout_ms: BUSY_TIMEOUT_MS,
        };
        let mut builder = DBPool::builder().connection_customizer(Box::new(options));
        builder = if is_in_memory(database_url) {
            builder.max_size(1).max_lifetime(None).idle_timeout(None)
        } else {
            builder.max_size(pool_size.max(1))
        };
        let pool: DBPool = builder.build(manager)?;
        pool.get()?.batch_execute(BOOTSTRAP)?;
        info!(database_url, "todo store ready");
        Ok(Database { pool })
    }

    fn fetch(conn: &mut SqliteConnection, todo_id: TodoId) -> Result<Todo, StoreError> {
        todos::table
            .find(todo_id)
            .select(Todo::as_select())
            .first(conn)
            .optional()?
            .ok_or(StoreError::NotFound(todo_id))
    }

    fn load_all(conn: &mut SqliteConnection) -> Result<Vec<Todo>, StoreError> {
        Ok(todos::table
            .order(todos::id.asc())
            .select(Todo::as_select())
            .load(conn)?)
    }
}

impl TodoRepository for Database {
    #[instrument(skip(self))]
    fn list(&self) -> Result<Vec<Todo>, StoreError> {
        let mut pooled = self.pool.get()?;
        Self::load_all(&mut pooled)
    }

    #[instrument(skip(self))]
    fn get_by_id(&self, todo_id: TodoId) -> Result<Todo, StoreError> {
        let mut pooled = self.pool.get()?;
        Self::fetch(&mut pooled, todo_id)
    }

    #[instrument(skip(self, new_todo), fields(title = %new_todo.title))]
    fn create(&self, new_todo: NewTodo) -> Result<Todo, StoreError> {
        let mut pooled = self.pool.get()?;
        let conn: &mut SqliteConnection = &mut pooled;
        let todo = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::insert_into(todos::table).values(&new_todo).execute(conn)?;
            todos::table
                .order(todos::id.desc())
                .select(Todo::as_select())
                .first::<Todo>(conn)
        })?;
        info!(todo_id = todo.id, "todo created");
        Ok(todo)
    }

    #[instrument(skip(self, patch))]
    fn update(&self, todo_id: TodoId, patch: TodoPatch) -> Result<Todo, StoreError> {
        let mut pooled = self.pool.get()?;
        let conn: &mut SqliteConnection = &mut pooled;
        conn.transaction(|conn| {
            // diesel refuses an empty changeset; an empty patch is a plain read.
            if !patch.is_empty() {
                let count = diesel::update(todos::table.find(todo_id))
                    .set(&patch)
                    .execute(conn)?;
                if count == 0 {
                    return Err(StoreError::NotFound(todo_id));
                }
            }
            Self::fetch(conn, todo_id)
        })
    }

    #[instrument(skip(self))]
    fn delete(&self, todo_id: TodoId) -> Result<TodoId, StoreError> {
        let mut pooled = self.pool.get()?;
        let conn: &mut SqliteConnection = &mut pooled;
        let count = diesel::delete(todos::table.find(todo_id)).execute(conn)?;
        if count == 0 {
            return Err(StoreError::NotFound(todo_id));
        }
        info!(todo_id, "todo deleted");
        Ok(todo_id)
    }

    #[instrument(skip(self, updates), fields(count = updates.len()))]
    fn batch_update_ordinals(
        &self,
        updates: &[OrdinalUpdate],
    ) -> Result<Vec<Todo>, StoreError> {
        let mut pooled = self.pool.get()?;
        let conn: &mut SqliteConnection = &mut pooled;
        conn.transaction(|conn| {
            let mut missing = Vec::new();
            for update in updates {
                let count = diesel::update(todos::table.find(update.id))
                    .set(todos::ordinal.eq(update.ordinal))
                    .execute(conn)?;
                if count == 0 {
                    missing.push(update.id);
                }
            }
            if !missing.is_empty() {
                return Err(StoreError::BatchFailed { missing });
            }
            Self::load_all(conn)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TodoStatus;
    use chrono::NaiveDate;

    fn store() -> Database {
        Database::new(":memory:", 4).unwrap()
    }

    fn new_todo(title: &str) -> NewTodo {
        NewTodo::new(title, "2%", NaiveDate::from_ymd_opt(2024, 1, 1).unwrap())
    }

    #[test]
    fn create_then_get_round_trips() {
        let db = store();
        let created = db.create(new_todo("Buy milk")).unwrap();
        let fetched = db.get_by_id(created.id).unwrap();

        assert_eq!(fetched, created);
        assert_eq!(fetched.title, "Buy milk");
        assert_eq!(fetched.description, "2%");
        assert_eq!(fetched.status, TodoStatus::Pending);
        assert_eq!(fetched.ordinal, 0);
    }

    #[test]
    fn ids_are_never_reused() {
        let db = store();
        let first = db.create(new_todo("first")).unwrap();
        let second = db.create(new_todo("second")).unwrap();
        db.delete(second.id).unwrap();
        let third = db.create(new_todo("third")).unwrap();

        assert_ne!(first.id, second.id);
        assert!(third.id > second.id);
    }

    #[test]
    fn update_returns_post_update_state() {
        let db = store();
        let created = db.create(new_todo("Buy milk")).unwrap();

        let updated = db
            .update(created.id, TodoPatch::status(TodoStatus::Completed))
            .unwrap();
        assert_eq!(updated.status, TodoStatus::Completed);
        assert_eq!(updated.title, created.title);
        assert_eq!(updated.due_date, created.due_date);

        assert_eq!(db.update(created.id, TodoPatch::default()).unwrap(), updated);
        assert!(matches!(
            db.update(999, TodoPatch::ordinal(1)),
            Err(StoreError::NotFound(999))
        ));
    }

    #[test]
    fn second_delete_reports_not_found() {
        let db = store();
        let keep = db.create(new_todo("keep")).unwrap();
        let gone = db.create(new_todo("gone")).unwrap();

        assert_eq!(db.delete(gone.id).unwrap(), gone.id);
        assert!(matches!(db.delete(gone.id), Err(StoreError::NotFound(_))));
        assert_eq!(db.list().unwrap(), vec![keep]);
    }

    #[test]
    fn in_memory_urls_share_one_connection() {
        for url in [":memory:", "file::memory:", "file:todos?mode=memory"] {
            assert!(is_in_memory(url), "{url}");
        }
        assert!(!is_in_memory("todos.db"));

        let db = Database::new("file::memory:", 4).unwrap();
        let created = db.create(new_todo("Buy milk")).unwrap();
        assert_eq!(db.list().unwrap(), vec![created]);
    }

    #[test]
    fn batch_reorder_is_all_or_nothing() {
        let db = store();
        let a = db.create(new_todo("a")).unwrap();
        let b = db.create(new_todo("b")).unwrap();

        let err = db
            .batch_update_ordinals(&[
                OrdinalUpdate { id: a.id, ordinal: 5 },
                OrdinalUpdate { id: 404, ordinal: 1 },
            ])
            .unwrap_err();
        assert!(matches!(err, StoreError::BatchFailed { ref missing } if missing == &[404]));
        assert_eq!(db.get_by_id(a.id).unwrap().ordinal, 0);

        let list = db
            .batch_update_ordinals(&[
                OrdinalUpdate { id: a.id, ordinal: 1 },
                OrdinalUpdate { id: b.id, ordinal: 0 },
            ])
            .unwrap();
        let ordinals: Vec<_> = list.iter().map(|todo| (todo.id, todo.ordinal)).collect();
        assert_eq!(ordinals, vec![(a.id, 1), (b.id, 0)]);
    }
}
