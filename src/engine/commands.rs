//! Deferred scene mutations
//!
//! `move_entity`, `delete`, `camera` and `light` accept a delay. Delayed calls
//! become [`Command`]s in a [`CommandQueue`] and are applied at the top of the
//! first frame whose timestamp reaches their due time. Commands due at the same
//! time apply in the order they were scheduled.

use crate::gfx::scene::{EntityKind, Props};

/// A scene mutation waiting for its due time
#[derive(Debug, Clone)]
pub enum Command {
    /// Merge props into an entity, creating it as `kind` when given
    Update {
        props: Props,
        kind: Option<EntityKind>,
    },
    Delete(String),
}

#[derive(Debug)]
struct Scheduled {
    due: f64,
    seq: u64,
    command: Command,
}

#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: Vec<Scheduled>,
    seq: u64,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, due: f64, command: Command) {
        self.pending.push(Scheduled {
            due,
            seq: self.seq,
            command,
        });
        self.seq += 1;
    }

    /// Removes and returns every command due at or before `now`, in apply order
    pub fn drain_due(&mut self, now: f64) -> Vec<Command> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            self.pending.drain(..).partition(|s| s.due <= now);
        self.pending = pending;

        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.seq.cmp(&b.seq)));
        due.into_iter().map(|s| s.command).collect()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deleted(commands: &[Command]) -> Vec<&str> {
        commands
            .iter()
            .map(|c| match c {
                Command::Delete(name) => name.as_str(),
                Command::Update { .. } => "update",
            })
            .collect()
    }

    #[test]
    fn drains_only_due_commands() {
        let mut queue = CommandQueue::new();
        queue.push(10.0, Command::Delete("a".into()));
        queue.push(30.0, Command::Delete("b".into()));

        assert!(queue.drain_due(5.0).is_empty());
        assert_eq!(deleted(&queue.drain_due(10.0)), vec!["a"]);
        assert_eq!(queue.len(), 1);
        assert_eq!(deleted(&queue.drain_due(100.0)), vec!["b"]);
        assert!(queue.is_empty());
    }

    #[test]
    fn orders_by_due_time_then_schedule_order() {
        let mut queue = CommandQueue::new();
        queue.push(20.0, Command::Delete("late".into()));
        queue.push(10.0, Command::Delete("first".into()));
        queue.push(10.0, Command::Delete("second".into()));

        assert_eq!(
            deleted(&queue.drain_due(20.0)),
            vec!["first", "second", "late"]
        );
    }
}
