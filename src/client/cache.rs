//! Optimistic todo cache.
//!
//! Every mutation patches the cached list before its request is sent and
//! keeps an undo for exactly the keys it touched. A confirmed mutation drops
//! its undo; a failed one applies it, leaving other in-flight mutations alone.

use std::collections::{HashMap, VecDeque};

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::client::ordering::{self, Anchor, ReorderStrategy};
use crate::client::{ClientError, TodoApi};
use crate::models::{NewTodo, OrdinalBatch, OrdinalUpdate, Todo, TodoId, TodoPatch, TodoStatus};

const MAX_NOTICES: usize = 32;
const MAX_SETTLED: usize = 64;

pub type MutationId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Create,
    Edit,
    SetStatus,
    Delete,
    Reorder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationPhase {
    Idle,
    OptimisticallyApplied,
    Confirmed,
    RolledBack,
}

/// A failed mutation, for the UI to show as a transient message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub mutation: MutationId,
    pub kind: MutationKind,
    pub message: String,
}

/// Handle to an optimistically applied mutation.
#[derive(Debug)]
#[must_use = "an applied mutation must be confirmed or rolled back"]
pub struct Mutation {
    id: MutationId,
    kind: MutationKind,
}

impl Mutation {
    pub fn id(&self) -> MutationId {
        self.id
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }
}

#[derive(Debug)]
enum Undo {
    RemovePlaceholder { id: TodoId },
    Reinsert {
        anchor: Anchor,
        todo: Todo,
    },
    Restore {
        id: TodoId,
        prior: TodoPatch,
    },
    Reorder {
        moved: TodoId,
        anchor: Anchor,
        prior: Vec<OrdinalUpdate>,
    },
}

#[derive(Debug)]
struct CacheState {
    todos: Vec<Todo>,
    next_mutation: MutationId,
    next_placeholder: TodoId,
    in_flight: HashMap<MutationId, Undo>,
    settled: VecDeque<(MutationId, MutationPhase)>,
    notices: VecDeque<Notice>,
}

impl Default for CacheState {
    fn default() -> Self {
        Self {
            todos: Vec::new(),
            next_mutation: 1,
            next_placeholder: -1,
            in_flight: HashMap::new(),
            settled: VecDeque::new(),
            notices: VecDeque::new(),
        }
    }
}

impl CacheState {
    fn position(&self, id: TodoId) -> Result<usize, ClientError> {
        self.todos
            .iter()
            .position(|todo| todo.id == id)
            .ok_or(ClientError::NotCached(id))
    }

    fn ids(&self) -> Vec<TodoId> {
        self.todos.iter().map(|todo| todo.id).collect()
    }

    fn find_mut(&mut self, id: TodoId) -> Option<&mut Todo> {
        self.todos.iter_mut().find(|todo| todo.id == id)
    }

    fn partition(&self, status: TodoStatus) -> Vec<Todo> {
        self.todos
            .iter()
            .filter(|todo| todo.status == status)
            .cloned()
            .collect()
    }

    fn record(&mut self, kind: MutationKind, undo: Undo) -> Mutation {
        let id = self.next_mutation;
        self.next_mutation += 1;
        self.in_flight.insert(id, undo);
        Mutation { id, kind }
    }

    fn settle(&mut self, id: MutationId, phase: MutationPhase) -> Option<Undo> {
        if self.settled.len() == MAX_SETTLED {
            self.settled.pop_front();
        }
        self.settled.push_back((id, phase));
        self.in_flight.remove(&id)
    }

    fn undo(&mut self, undo: Undo) {
        match undo {
            Undo::RemovePlaceholder { id } => self.todos.retain(|todo| todo.id != id),
            Undo::Reinsert { anchor, todo } => {
                if self.position(todo.id).is_err() {
                    let index = anchor.resolve(&self.ids());
                    self.todos.insert(index, todo);
                }
            }
            Undo::Restore { id, prior } => {
                if let Some(todo) = self.find_mut(id) {
                    todo.apply(&prior);
                }
            }
            Undo::Reorder {
                moved,
                anchor,
                prior,
            } => {
                let mut order: Vec<TodoId> = self
                    .partition(TodoStatus::Pending)
                    .iter()
                    .map(|todo| todo.id)
                    .collect();
                ordering::move_to(&mut order, moved, &anchor);
                ordering::arrange_partition(&mut self.todos, TodoStatus::Pending, &order);
                for update in prior {
                    if let Some(todo) = self.find_mut(update.id) {
                        todo.ordinal = update.ordinal;
                    }
                }
            }
        }
    }
}

fn ensure_saved(id: TodoId) -> Result<(), ClientError> {
    if id < 0 {
        Err(ClientError::Provisional(id))
    } else {
        Ok(())
    }
}

/// Client-side copy of the todo list.
///
/// Create one per application and hand it to whatever renders the list; it
/// has no global state of its own.
pub struct TodoCache<A> {
    api: A,
    strategy: ReorderStrategy,
    state: Mutex<CacheState>,
}

impl<A: TodoApi> TodoCache<A> {
    pub fn new(api: A) -> Self {
        Self::with_strategy(api, ReorderStrategy::default())
    }

    pub fn with_strategy(api: A, strategy: ReorderStrategy) -> Self {
        Self {
            api,
            strategy,
            state: Mutex::new(CacheState::default()),
        }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Full refetch. Replaces the cached list with the server's, in display order.
    pub async fn load(&self) -> Result<(), ClientError> {
        let mut todos = self.api.list().await?;
        ordering::sort_for_display(&mut todos);
        debug!(count = todos.len(), "todo cache loaded");
        self.state.lock().todos = todos;
        Ok(())
    }

    pub fn snapshot(&self) -> Vec<Todo> {
        self.state.lock().todos.clone()
    }

    pub fn active(&self) -> Vec<Todo> {
        self.state.lock().partition(TodoStatus::Pending)
    }

    pub fn completed(&self) -> Vec<Todo> {
        self.state.lock().partition(TodoStatus::Completed)
    }

    pub fn get(&self, id: TodoId) -> Option<Todo> {
        self.state.lock().todos.iter().find(|todo| todo.id == id).cloned()
    }

    pub fn in_flight(&self) -> usize {
        self.state.lock().in_flight.len()
    }

    pub fn phase(&self, id: MutationId) -> MutationPhase {
        let state = self.state.lock();
        if state.in_flight.contains_key(&id) {
            return MutationPhase::OptimisticallyApplied;
        }
        state
            .settled
            .iter()
            .rev()
            .find(|(settled, _)| *settled == id)
            .map(|(_, phase)| *phase)
            .unwrap_or(MutationPhase::Idle)
    }

    pub fn take_notices(&self) -> Vec<Notice> {
        self.state.lock().notices.drain(..).collect()
    }

    /// Appends a provisional record (negative id) for `new_todo`.
    pub fn begin_create(&self, new_todo: &NewTodo) -> Result<(Mutation, TodoId), ClientError> {
        new_todo.validate().map_err(ClientError::Validation)?;
        let mut state = self.state.lock();
        let id = state.next_placeholder;
        state.next_placeholder -= 1;
        state.todos.push(Todo {
            id,
            title: new_todo.title.clone(),
            description: new_todo.description.clone(),
            due_date: new_todo.due_date,
            ordinal: new_todo.ordinal,
            status: new_todo.status,
        });
        let mutation = state.record(MutationKind::Create, Undo::RemovePlaceholder { id });
        debug!(mutation = mutation.id, placeholder = id, "optimistic create");
        Ok((mutation, id))
    }

    pub fn begin_edit(&self, id: TodoId, patch: &TodoPatch) -> Result<Mutation, ClientError> {
        patch.validate().map_err(ClientError::Validation)?;
        self.begin_patch(MutationKind::Edit, id, patch)
    }

    pub fn begin_set_status(
        &self,
        id: TodoId,
        status: TodoStatus,
    ) -> Result<Mutation, ClientError> {
        self.begin_patch(MutationKind::SetStatus, id, &TodoPatch::status(status))
    }

    fn begin_patch(
        &self,
        kind: MutationKind,
        id: TodoId,
        patch: &TodoPatch,
    ) -> Result<Mutation, ClientError> {
        ensure_saved(id)?;
        let mut state = self.state.lock();
        let index = state.position(id)?;
        let todo = &mut state.todos[index];
        let prior = todo.capture(patch);
        todo.apply(patch);
        let mutation = state.record(kind, Undo::Restore { id, prior });
        debug!(mutation = mutation.id, todo_id = id, ?kind, "optimistic patch");
        Ok(mutation)
    }

    pub fn begin_delete(&self, id: TodoId) -> Result<Mutation, ClientError> {
        ensure_saved(id)?;
        let mut state = self.state.lock();
        let index = state.position(id)?;
        let anchor = Anchor::of(&state.ids(), index);
        let todo = state.todos.remove(index);
        let mutation = state.record(MutationKind::Delete, Undo::Reinsert { anchor, todo });
        debug!(mutation = mutation.id, todo_id = id, "optimistic delete");
        Ok(mutation)
    }

    /// Moves the active todo at `from` to `to` and returns the ordinal batch
    /// to send. `None` when the move changes nothing.
    pub fn begin_reorder(
        &self,
        from: usize,
        to: usize,
    ) -> Result<Option<(Mutation, OrdinalBatch)>, ClientError> {
        let mut state = self.state.lock();
        let active = state.partition(TodoStatus::Pending);
        let plan = ordering::plan_reorder(&active, from, to, self.strategy).ok_or(
            ClientError::InvalidMove {
                from,
                to,
                len: active.len(),
            },
        )?;
        if plan.updates.is_empty() {
            return Ok(None);
        }
        for update in &plan.updates {
            ensure_saved(update.id)?;
        }

        let prior = plan
            .updates
            .iter()
            .filter_map(|update| {
                active
                    .iter()
                    .find(|todo| todo.id == update.id)
                    .map(|todo| OrdinalUpdate {
                        id: todo.id,
                        ordinal: todo.ordinal,
                    })
            })
            .collect();
        ordering::arrange_partition(&mut state.todos, TodoStatus::Pending, &plan.order);
        for update in &plan.updates {
            if let Some(todo) = state.find_mut(update.id) {
                todo.ordinal = update.ordinal;
            }
        }

        let active_ids: Vec<TodoId> = active.iter().map(|todo| todo.id).collect();
        let undo = Undo::Reorder {
            moved: active_ids[from],
            anchor: Anchor::of(&active_ids, from),
            prior,
        };
        let mutation = state.record(MutationKind::Reorder, undo);
        debug!(
            mutation = mutation.id,
            from,
            to,
            writes = plan.updates.len(),
            "optimistic reorder"
        );
        Ok(Some((mutation, OrdinalBatch { todos: plan.updates })))
    }

    /// Keeps the optimistic state and forgets the undo.
    pub fn confirm(&self, mutation: Mutation) {
        self.state.lock().settle(mutation.id, MutationPhase::Confirmed);
    }

    /// Swaps the provisional record of a create for the server's record.
    pub fn confirm_create(&self, mutation: Mutation, created: Todo) {
        let mut state = self.state.lock();
        let settled = state.settle(mutation.id, MutationPhase::Confirmed);
        if let Some(Undo::RemovePlaceholder { id }) = settled {
            if let Some(todo) = state.find_mut(id) {
                *todo = created;
            }
        }
    }

    /// Reverts exactly what `mutation` changed and queues a notice.
    pub fn rollback(&self, mutation: Mutation, error: &ClientError) {
        let mut state = self.state.lock();
        if let Some(undo) = state.settle(mutation.id, MutationPhase::RolledBack) {
            state.undo(undo);
        }
        warn!(mutation = mutation.id, kind = ?mutation.kind, %error, "mutation rolled back");
        if state.notices.len() == MAX_NOTICES {
            state.notices.pop_front();
        }
        state.notices.push_back(Notice {
            mutation: mutation.id,
            kind: mutation.kind,
            message: error.to_string(),
        });
    }

    fn finish<T>(
        &self,
        mutation: Mutation,
        result: Result<T, ClientError>,
    ) -> Result<T, ClientError> {
        match result {
            Ok(value) => {
                self.confirm(mutation);
                Ok(value)
            }
            Err(err) => {
                self.rollback(mutation, &err);
                Err(err)
            }
        }
    }

    pub async fn create(&self, new_todo: NewTodo) -> Result<Todo, ClientError> {
        let (mutation, _) = self.begin_create(&new_todo)?;
        match self.api.create(&new_todo).await {
            Ok(created) => {
                self.confirm_create(mutation, created.clone());
                Ok(created)
            }
            Err(err) => {
                self.rollback(mutation, &err);
                Err(err)
            }
        }
    }

    pub async fn edit(&self, id: TodoId, patch: TodoPatch) -> Result<Todo, ClientError> {
        let mutation = self.begin_edit(id, &patch)?;
        let result = self.api.update(id, &patch).await;
        self.finish(mutation, result)
    }

    pub async fn set_status(&self, id: TodoId, status: TodoStatus) -> Result<Todo, ClientError> {
        let mutation = self.begin_set_status(id, status)?;
        let result = self.api.update(id, &TodoPatch::status(status)).await;
        self.finish(mutation, result)
    }

    pub async fn toggle_status(&self, id: TodoId) -> Result<Todo, ClientError> {
        let status = self.get(id).ok_or(ClientError::NotCached(id))?.status;
        self.set_status(id, status.toggled()).await
    }

    pub async fn delete(&self, id: TodoId) -> Result<(), ClientError> {
        let mutation = self.begin_delete(id)?;
        let result = self.api.delete(id).await;
        self.finish(mutation, result).map(|_| ())
    }

    pub async fn reorder(&self, from: usize, to: usize) -> Result<(), ClientError> {
        let Some((mutation, batch)) = self.begin_reorder(from, to)? else {
            return Ok(());
        };
        let result = self.api.update_ordinals(&batch).await;
        self.finish(mutation, result).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use async_trait::async_trait;
    use chrono::NaiveDate;

    use super::*;

    fn due() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    fn todo(id: TodoId, title: &str, ordinal: i32) -> Todo {
        Todo {
            id,
            title: title.to_string(),
            description: String::new(),
            due_date: due(),
            ordinal,
            status: TodoStatus::Pending,
        }
    }

    /// In-process stand-in for the server. Methods named in `failing` answer
    /// with a 500; `slow` methods yield a few times before answering.
    #[derive(Default)]
    struct ScriptedApi {
        todos: Mutex<Vec<Todo>>,
        failing: Mutex<HashSet<&'static str>>,
        slow: Mutex<HashSet<&'static str>>,
        batches: Mutex<Vec<OrdinalBatch>>,
        calls: Mutex<Vec<&'static str>>,
    }

    impl ScriptedApi {
        fn with(todos: Vec<Todo>) -> Self {
            Self {
                todos: Mutex::new(todos),
                ..Default::default()
            }
        }

        fn fail(self, method: &'static str) -> Self {
            self.failing.lock().insert(method);
            self
        }

        fn slow(self, method: &'static str) -> Self {
            self.slow.lock().insert(method);
            self
        }

        async fn answer(&self, method: &'static str) -> Result<(), ClientError> {
            self.calls.lock().push(method);
            let rounds = if self.slow.lock().contains(method) { 5 } else { 1 };
            for _ in 0..rounds {
                tokio::task::yield_now().await;
            }
            if self.failing.lock().contains(method) {
                return Err(ClientError::Server {
                    status: 500,
                    message: format!("{method} failed"),
                });
            }
            Ok(())
        }

        fn find(&self, id: TodoId) -> Result<Todo, ClientError> {
            self.todos
                .lock()
                .iter()
                .find(|todo| todo.id == id)
                .cloned()
                .ok_or_else(|| ClientError::NotFound(format!("Todo {id} not found")))
        }
    }

    #[async_trait]
    impl TodoApi for ScriptedApi {
        async fn list(&self) -> Result<Vec<Todo>, ClientError> {
            self.answer("list").await?;
            Ok(self.todos.lock().clone())
        }

        async fn get(&self, id: TodoId) -> Result<Todo, ClientError> {
            self.answer("get").await?;
            self.find(id)
        }

        async fn create(&self, new_todo: &NewTodo) -> Result<Todo, ClientError> {
            self.answer("create").await?;
            let mut todos = self.todos.lock();
            let id = todos.iter().map(|todo| todo.id).max().unwrap_or(0) + 1;
            let created = Todo {
                id,
                title: new_todo.title.clone(),
                description: new_todo.description.clone(),
                due_date: new_todo.due_date,
                ordinal: new_todo.ordinal,
                status: new_todo.status,
            };
            todos.push(created.clone());
            Ok(created)
        }

        async fn update(&self, id: TodoId, patch: &TodoPatch) -> Result<Todo, ClientError> {
            self.answer("update").await?;
            let mut todo = self.find(id)?;
            todo.apply(patch);
            for stored in self.todos.lock().iter_mut().filter(|stored| stored.id == id) {
                *stored = todo.clone();
            }
            Ok(todo)
        }

        async fn delete(&self, id: TodoId) -> Result<TodoId, ClientError> {
            self.answer("delete").await?;
            self.find(id)?;
            self.todos.lock().retain(|todo| todo.id != id);
            Ok(id)
        }

        async fn update_ordinals(&self, batch: &OrdinalBatch) -> Result<Vec<Todo>, ClientError> {
            self.answer("update_ordinals").await?;
            self.batches.lock().push(batch.clone());
            let mut todos = self.todos.lock();
            for update in &batch.todos {
                if let Some(todo) = todos.iter_mut().find(|todo| todo.id == update.id) {
                    todo.ordinal = update.ordinal;
                }
            }
            Ok(todos.clone())
        }
    }

    fn abc() -> Vec<Todo> {
        vec![todo(1, "A", 0), todo(2, "B", 1), todo(3, "C", 2)]
    }

    fn abcd() -> Vec<Todo> {
        let mut todos = abc();
        todos.push(todo(4, "D", 3));
        todos
    }

    fn ids(todos: &[Todo]) -> Vec<TodoId> {
        todos.iter().map(|todo| todo.id).collect()
    }

    fn ordinals(todos: &[Todo]) -> Vec<i32> {
        todos.iter().map(|todo| todo.ordinal).collect()
    }

    fn server_error() -> ClientError {
        ClientError::Server {
            status: 500,
            message: "rejected".to_string(),
        }
    }

    #[tokio::test]
    async fn load_sorts_by_ordinal_then_id() {
        let api = ScriptedApi::with(vec![todo(1, "A", 2), todo(2, "B", 0), todo(3, "C", 0)]);
        let cache = TodoCache::new(api);
        cache.load().await.unwrap();
        assert_eq!(ids(&cache.snapshot()), vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn drag_to_end_swaps_with_displaced_neighbor() {
        let cache = TodoCache::new(ScriptedApi::with(abc()));
        cache.load().await.unwrap();

        let (mutation, batch) = cache.begin_reorder(0, 2).unwrap().unwrap();
        assert_eq!(
            batch.todos,
            vec![OrdinalUpdate { id: 1, ordinal: 2 }, OrdinalUpdate { id: 3, ordinal: 0 }]
        );
        assert_eq!(ids(&cache.active()), vec![2, 3, 1]);
        assert_eq!(cache.phase(mutation.id()), MutationPhase::OptimisticallyApplied);

        let id = mutation.id();
        cache.confirm(mutation);
        assert_eq!(cache.phase(id), MutationPhase::Confirmed);
        assert_eq!(cache.in_flight(), 0);
        assert_eq!(ids(&cache.active()), vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn reorder_sends_one_batch() {
        let cache = TodoCache::with_strategy(ScriptedApi::with(abc()), ReorderStrategy::Renumber);
        cache.load().await.unwrap();

        cache.reorder(2, 0).await.unwrap();
        assert_eq!(ids(&cache.active()), vec![3, 1, 2]);
        let ordinals: Vec<_> = cache.active().iter().map(|todo| todo.ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2]);

        let batches = cache.api().batches.lock().clone();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].todos.len(), 3);

        cache.reorder(1, 1).await.unwrap();
        assert_eq!(cache.api().batches.lock().len(), 1);
    }

    #[tokio::test]
    async fn completed_todos_keep_their_slots_during_reorder() {
        let mut todos = abc();
        todos[1].status = TodoStatus::Completed;
        let cache = TodoCache::new(ScriptedApi::with(todos));
        cache.load().await.unwrap();

        cache.reorder(0, 1).await.unwrap();
        assert_eq!(ids(&cache.snapshot()), vec![3, 2, 1]);
        assert_eq!(ids(&cache.completed()), vec![2]);
    }

    #[tokio::test]
    async fn failed_mutations_restore_the_exact_prior_list() {
        for method in ["create", "update", "delete", "update_ordinals"] {
            let api = ScriptedApi::with(abc()).fail(method);
            let cache = TodoCache::new(api);
            cache.load().await.unwrap();
            let before = cache.snapshot();

            let result = match method {
                "create" => cache.create(NewTodo::new("Buy milk", "2%", due())).await.map(|_| ()),
                "update" => cache.set_status(2, TodoStatus::Completed).await.map(|_| ()),
                "delete" => cache.delete(2).await,
                _ => cache.reorder(0, 2).await,
            };

            assert!(matches!(result, Err(ClientError::Server { status: 500, .. })), "{method}");
            assert_eq!(cache.snapshot(), before, "{method}");
            assert_eq!(cache.in_flight(), 0);
            assert_eq!(cache.take_notices().len(), 1);
        }
    }

    #[tokio::test]
    async fn renumbered_reorder_rolls_back_exactly() {
        let api = ScriptedApi::with(abcd()).fail("update_ordinals");
        let cache = TodoCache::with_strategy(api, ReorderStrategy::Renumber);
        cache.load().await.unwrap();
        let before = cache.snapshot();

        let (mutation, batch) = cache.begin_reorder(3, 1).unwrap().unwrap();
        assert_eq!(batch.todos.len(), 3);
        assert_eq!(ids(&cache.active()), vec![1, 4, 2, 3]);

        let err = cache.api().update_ordinals(&batch).await.unwrap_err();
        let id = mutation.id();
        cache.rollback(mutation, &err);
        assert_eq!(cache.snapshot(), before);
        assert_eq!(cache.phase(id), MutationPhase::RolledBack);
    }

    #[tokio::test]
    async fn concurrent_mutations_roll_back_independently() {
        let api = ScriptedApi::with(abc()).fail("delete").slow("delete");
        let cache = TodoCache::new(api);
        cache.load().await.unwrap();

        let rename = TodoPatch {
            title: Some("B, renamed".to_string()),
            ..Default::default()
        };
        let (deleted, edited) = tokio::join!(cache.delete(1), cache.edit(2, rename));

        assert!(deleted.is_err());
        assert_eq!(edited.unwrap().title, "B, renamed");
        assert_eq!(ids(&cache.snapshot()), vec![1, 2, 3]);
        assert_eq!(cache.get(2).unwrap().title, "B, renamed");

        let notices = cache.take_notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, MutationKind::Delete);
        assert!(cache.take_notices().is_empty());
    }

    #[tokio::test]
    async fn interleaved_deletes_reinsert_beside_their_neighbours() {
        let cache = TodoCache::new(ScriptedApi::with(abc()));
        cache.load().await.unwrap();

        let first = cache.begin_delete(2).unwrap();
        let second = cache.begin_delete(1).unwrap();
        cache.confirm(second);
        cache.rollback(first, &server_error());
        assert_eq!(ids(&cache.snapshot()), vec![2, 3]);

        let cache = TodoCache::new(ScriptedApi::with(abc()));
        cache.load().await.unwrap();
        let before = cache.snapshot();

        let first = cache.begin_delete(1).unwrap();
        let second = cache.begin_delete(2).unwrap();
        cache.rollback(first, &server_error());
        assert_eq!(ids(&cache.snapshot()), vec![1, 3]);
        cache.rollback(second, &server_error());
        assert_eq!(cache.snapshot(), before);
    }

    #[tokio::test]
    async fn reorder_rolls_back_around_a_confirmed_delete() {
        let cache = TodoCache::new(ScriptedApi::with(abcd()));
        cache.load().await.unwrap();

        let (reorder, _) = cache.begin_reorder(2, 3).unwrap().unwrap();
        assert_eq!(ids(&cache.active()), vec![1, 2, 4, 3]);
        let delete = cache.begin_delete(1).unwrap();
        cache.confirm(delete);

        cache.rollback(reorder, &server_error());
        assert_eq!(ids(&cache.active()), vec![2, 3, 4]);
        assert_eq!(ordinals(&cache.active()), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn overlapping_reorders_roll_back_independently() {
        let cache = TodoCache::new(ScriptedApi::with(abcd()));
        cache.load().await.unwrap();
        let before = cache.snapshot();

        let (first, _) = cache.begin_reorder(0, 1).unwrap().unwrap();
        let (second, _) = cache.begin_reorder(2, 3).unwrap().unwrap();
        assert_eq!(ids(&cache.active()), vec![2, 1, 4, 3]);

        cache.rollback(first, &server_error());
        let mut view = cache.snapshot();
        assert_eq!(ids(&view), vec![1, 2, 4, 3]);
        assert_eq!(ordinals(&view), vec![0, 1, 2, 3]);
        ordering::sort_for_display(&mut view);
        assert_eq!(view, cache.snapshot());

        cache.rollback(second, &server_error());
        assert_eq!(cache.snapshot(), before);
        assert_eq!(cache.in_flight(), 0);
    }

    #[tokio::test]
    async fn tied_ordinals_reorder_survives_a_refetch() {
        let api = ScriptedApi::with(vec![todo(1, "A", 0), todo(2, "B", 0), todo(3, "C", 0)]);
        let cache = TodoCache::new(api);
        cache.load().await.unwrap();

        cache.reorder(0, 2).await.unwrap();
        assert_eq!(ids(&cache.active()), vec![2, 3, 1]);

        cache.load().await.unwrap();
        assert_eq!(ids(&cache.active()), vec![2, 3, 1]);
    }

    #[tokio::test]
    async fn create_swaps_placeholder_for_server_record() {
        let cache = TodoCache::new(ScriptedApi::with(abc()));
        cache.load().await.unwrap();

        let new_todo = NewTodo::new("Buy milk", "2%", due());
        let (mutation, placeholder) = cache.begin_create(&new_todo).unwrap();
        assert!(placeholder < 0);
        assert_eq!(cache.get(placeholder).unwrap().title, "Buy milk");
        assert!(matches!(
            cache.begin_delete(placeholder),
            Err(ClientError::Provisional(id)) if id == placeholder
        ));

        let created = cache.api().create(&NewTodo::new("Buy milk", "2%", due())).await.unwrap();
        cache.confirm_create(mutation, created.clone());
        assert!(cache.get(placeholder).is_none());
        assert_eq!(cache.get(created.id), Some(created));
        assert_eq!(cache.snapshot().len(), 4);
    }

    #[tokio::test]
    async fn invalid_input_never_reaches_the_server() {
        let cache = TodoCache::new(ScriptedApi::with(abc()));
        cache.load().await.unwrap();
        let before = cache.snapshot();

        let err = cache.create(NewTodo::new("x", "", due())).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(ref fields) if fields[0].field == "title"));
        assert!(!err.is_remote());

        let err = cache.reorder(0, 3).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidMove { from: 0, to: 3, len: 3 }));

        assert!(matches!(cache.delete(42).await, Err(ClientError::NotCached(42))));
        assert_eq!(cache.snapshot(), before);
        assert_eq!(*cache.api().calls.lock(), vec!["list"]);
    }

    #[tokio::test]
    async fn toggle_flips_between_partitions() {
        let cache = TodoCache::new(ScriptedApi::with(abc()));
        cache.load().await.unwrap();

        cache.toggle_status(1).await.unwrap();
        assert_eq!(ids(&cache.active()), vec![2, 3]);
        assert_eq!(ids(&cache.completed()), vec![1]);

        cache.toggle_status(1).await.unwrap();
        assert_eq!(ids(&cache.active()), vec![1, 2, 3]);
    }
}
