//! Display order and drag-and-drop reordering.
//!
//! Todos are shown sorted by `(ordinal, id)` within their status partition.
//! A reorder moves one todo from `from` to `to` inside the active partition
//! and yields the ordinal writes that make the server agree.

use crate::models::{OrdinalUpdate, Todo, TodoId, TodoStatus};

/// How ordinals are rewritten after a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReorderStrategy {
    /// Swap ordinals between the moved todo and the one it displaced.
    /// Exactly two writes, but only order-preserving for adjacent moves.
    /// When the two ordinals are equal the swap would write nothing useful,
    /// so the move is renumbered instead.
    #[default]
    PairwiseSwap,
    /// Give every active todo its new index as ordinal, writing only the
    /// ones that change. Correct for any distance and repairs duplicates.
    Renumber,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReorderPlan {
    /// Active todo ids in their new display order.
    pub order: Vec<TodoId>,
    pub updates: Vec<OrdinalUpdate>,
}

/// Stable sort by ordinal; equal ordinals fall back to id so the result
/// never depends on fetch order.
pub fn sort_for_display(todos: &mut [Todo]) {
    todos.sort_by_key(|todo| (todo.ordinal, todo.id));
}

/// Indices into `todos` of the records with `status`, in list order.
pub fn partition_positions(todos: &[Todo], status: TodoStatus) -> Vec<usize> {
    todos
        .iter()
        .enumerate()
        .filter(|(_, todo)| todo.status == status)
        .map(|(index, _)| index)
        .collect()
}

/// Plans moving `active[from]` to position `to`. `None` when either index is
/// outside the view.
pub fn plan_reorder(
    active: &[Todo],
    from: usize,
    to: usize,
    strategy: ReorderStrategy,
) -> Option<ReorderPlan> {
    if from >= active.len() || to >= active.len() {
        return None;
    }

    let mut reordered: Vec<&Todo> = active.iter().collect();
    let moved = reordered.remove(from);
    reordered.insert(to, moved);
    let order = reordered.iter().map(|todo| todo.id).collect();

    let updates = if from == to {
        Vec::new()
    } else if strategy == ReorderStrategy::PairwiseSwap
        && active[from].ordinal != active[to].ordinal
    {
        vec![
            OrdinalUpdate {
                id: active[from].id,
                ordinal: active[to].ordinal,
            },
            OrdinalUpdate {
                id: active[to].id,
                ordinal: active[from].ordinal,
            },
        ]
    } else {
        renumber(&reordered)
    };

    Some(ReorderPlan { order, updates })
}

fn renumber(reordered: &[&Todo]) -> Vec<OrdinalUpdate> {
    reordered
        .iter()
        .enumerate()
        .filter(|(index, todo)| todo.ordinal != *index as i32)
        .map(|(index, todo)| OrdinalUpdate {
            id: todo.id,
            ordinal: index as i32,
        })
        .collect()
}

/// A position remembered by the ids around it, so it can be found again
/// after other records were inserted or removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    prev: Option<TodoId>,
    next: Option<TodoId>,
    index: usize,
}

impl Anchor {
    /// The position of `ids[index]`, described by its neighbours.
    pub fn of(ids: &[TodoId], index: usize) -> Self {
        Self {
            prev: index.checked_sub(1).and_then(|prev| ids.get(prev)).copied(),
            next: ids.get(index + 1).copied(),
            index,
        }
    }

    /// Insertion index in `ids` (which no longer holds the anchored record):
    /// before the old successor, else after the old predecessor, else the old
    /// index clamped to the list.
    pub fn resolve(&self, ids: &[TodoId]) -> usize {
        let find = |id: TodoId| ids.iter().position(|candidate| *candidate == id);
        if let Some(next) = self.next.and_then(find) {
            return next;
        }
        if let Some(prev) = self.prev.and_then(find) {
            return prev + 1;
        }
        self.index.min(ids.len())
    }
}

/// Rewrites the slots held by the `status` partition so its records follow
/// `order`. Records of other partitions stay where they are; partition
/// members missing from `order` keep their relative order at the end.
pub fn arrange_partition(todos: &mut [Todo], status: TodoStatus, order: &[TodoId]) {
    let slots = partition_positions(todos, status);
    let rank = |id: TodoId| {
        order
            .iter()
            .position(|candidate| *candidate == id)
            .unwrap_or(usize::MAX)
    };

    let mut records: Vec<Todo> = slots.iter().map(|&slot| todos[slot].clone()).collect();
    records.sort_by_key(|todo| rank(todo.id));
    for (slot, record) in slots.into_iter().zip(records) {
        todos[slot] = record;
    }
}

/// Moves `id` back to the position `anchor` describes within `order`.
pub fn move_to(order: &mut Vec<TodoId>, id: TodoId, anchor: &Anchor) {
    if let Some(current) = order.iter().position(|candidate| *candidate == id) {
        order.remove(current);
        let to = anchor.resolve(order);
        order.insert(to, id);
    }
}
