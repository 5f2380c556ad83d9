/*
 * SPDX-FileCopyrightText: 2026 Nivriti Project
 * SPDX-License-Identifier: AGPL-3.0-only
 */

use crate::db::{new_id, now_ms, StoryDb};
use crate::error::{Error, Result};
use crate::model::{Actor, Todo, TodoPatch};
use crate::stories::clean_title;
use rusqlite::{params, Connection, OptionalExtension, Row};

const MAX_DESCRIPTION_LEN: usize = 2_000;

const TODO_COLUMNS: &str = "id, user_id, title, description, completed, created_at_ms, updated_at_ms";

fn map_todo(r: &Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: r.get(0)?,
        user_id: r.get(1)?,
        title: r.get(2)?,
        description: r.get(3)?,
        completed: r.get(4)?,
        created_at_ms: r.get(5)?,
        updated_at_ms: r.get(6)?,
    })
}

fn clean_description(description: Option<&str>) -> Result<Option<String>> {
    let description = description.map(str::trim).filter(|s| !s.is_empty());
    if description.is_some_and(|d| d.chars().count() > MAX_DESCRIPTION_LEN) {
        return Err(Error::validation("Description is too long"));
    }
    Ok(description.map(str::to_string))
}

fn owned_todo(conn: &Connection, actor: &Actor, id: &str) -> Result<Todo> {
    conn.query_row(
        &format!("SELECT {TODO_COLUMNS} FROM todos WHERE id = ?1 AND user_id = ?2"),
        params![id, actor.id],
        map_todo,
    )
    .optional()?
    .ok_or_else(|| Error::not_found("Todo not found"))
}

impl StoryDb {
    pub fn list_todos(&self, actor: &Actor) -> Result<Vec<Todo>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {TODO_COLUMNS} FROM todos WHERE user_id = ?1 ORDER BY created_at_ms DESC, id"
        ))?;
        let rows = stmt
            .query_map(params![actor.id], map_todo)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn create_todo(&self, actor: &Actor, title: &str, description: Option<&str>) -> Result<Todo> {
        let title = clean_title(title)?;
        let description = clean_description(description)?;
        let id = new_id();
        let now = now_ms();
        self.write(|tx| {
            tx.execute(
                r#"
                INSERT INTO todos(id, user_id, title, description, completed, created_at_ms, updated_at_ms)
                VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
                "#,
                params![id, actor.id, title, description, now],
            )?;
            owned_todo(tx, actor, &id)
        })
    }

    pub fn update_todo(&self, actor: &Actor, id: &str, patch: TodoPatch) -> Result<Todo> {
        let title = patch.title.as_deref().map(clean_title).transpose()?;
        let description = match patch.description {
            Some(d) => Some(clean_description(d.as_deref())?),
            None => None,
        };
        self.write(|tx| {
            let mut todo = owned_todo(tx, actor, id)?;
            if let Some(title) = title {
                todo.title = title;
            }
            if let Some(description) = description {
                todo.description = description;
            }
            if let Some(completed) = patch.completed {
                todo.completed = completed;
            }
            todo.updated_at_ms = now_ms();
            tx.execute(
                "UPDATE todos SET title = ?2, description = ?3, completed = ?4, updated_at_ms = ?5 WHERE id = ?1",
                params![todo.id, todo.title, todo.description, todo.completed, todo.updated_at_ms],
            )?;
            Ok(todo)
        })
    }

    pub fn delete_todo(&self, actor: &Actor, id: &str) -> Result<()> {
        self.write(|tx| {
            let n = tx.execute(
                "DELETE FROM todos WHERE id = ?1 AND user_id = ?2",
                params![id, actor.id],
            )?;
            if n == 0 {
                return Err(Error::not_found("Todo not found"));
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::db::test_support::{temp_db, user};
    use crate::error::Error;
    use crate::model::TodoPatch;

    #[test]
    fn todo_lifecycle_is_scoped_to_owner() {
        let (_dir, db) = temp_db();
        let alice = user(&db, "alice");
        let bob = user(&db, "bob");

        let todo = db.create_todo(&alice, "Outline chapter 3", Some("  villain arc ")).unwrap();
        assert_eq!(todo.description.as_deref(), Some("villain arc"));
        assert!(!todo.completed);
        assert_eq!(db.list_todos(&alice).unwrap().len(), 1);
        assert!(db.list_todos(&bob).unwrap().is_empty());

        let patch = TodoPatch {
            completed: Some(true),
            description: Some(None),
            ..Default::default()
        };
        assert!(matches!(db.update_todo(&bob, &todo.id, patch.clone()), Err(Error::NotFound(_))));
        let updated = db.update_todo(&alice, &todo.id, patch).unwrap();
        assert!(updated.completed);
        assert_eq!(updated.description, None);
        assert_eq!(updated.title, "Outline chapter 3");

        assert!(matches!(db.delete_todo(&bob, &todo.id), Err(Error::NotFound(_))));
        db.delete_todo(&alice, &todo.id).unwrap();
        assert!(db.list_todos(&alice).unwrap().is_empty());
    }

    #[test]
    fn todo_title_is_required() {
        let (_dir, db) = temp_db();
        let alice = user(&db, "alice");
        assert!(matches!(db.create_todo(&alice, "", None), Err(Error::Validation(_))));
        let todo = db.create_todo(&alice, "ok", None).unwrap();
        let patch = TodoPatch {
            title: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(db.update_todo(&alice, &todo.id, patch), Err(Error::Validation(_))));
    }
}
